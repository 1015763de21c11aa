use indexmap::IndexSet;
use shared::{EntityKey, MeshId};

use crate::registry::EntityRegistry;
use crate::scene::SceneView;

use super::highlight::{HighlightLayer, Highlighter};

/// Emitted once per mutating call, carrying the full resulting set
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionChanged {
    /// Selected entities in selection order
    pub selected: Vec<EntityKey>,
    /// Monotonic counter, one per emitted event
    pub revision: u64,
}

/// Entity selection state (supports multi-select).
///
/// Operations taking a `MeshId` resolve it through the registry; an
/// unregistered mesh resolves to nothing and is dropped.
#[derive(Default, Debug)]
pub struct SelectionEngine {
    /// Selected entities (in order of selection)
    selected: IndexSet<EntityKey>,
    /// Pending change events, drained by the document
    events: Vec<SelectionChanged>,
    revision: u64,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary (first) selected entity
    pub fn primary(&self) -> Option<&EntityKey> {
        self.selected.first()
    }

    /// All selected entities
    pub fn all(&self) -> Vec<EntityKey> {
        self.selected.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityKey> {
        self.selected.iter()
    }

    pub fn is_selected(&self, key: &EntityKey) -> bool {
        self.selected.contains(key)
    }

    /// Number of selected entities
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drain pending change events
    pub fn take_events(&mut self) -> Vec<SelectionChanged> {
        std::mem::take(&mut self.events)
    }

    /// Install a new set; emits one event if it differs from the current one
    fn commit(&mut self, next: IndexSet<EntityKey>) -> bool {
        if next.len() == self.selected.len()
            && next.iter().zip(&self.selected).all(|(a, b)| a == b)
        {
            return false;
        }
        self.selected = next;
        self.revision += 1;
        self.events.push(SelectionChanged {
            selected: self.all(),
            revision: self.revision,
        });
        tracing::debug!("Selection changed ({} selected)", self.selected.len());
        true
    }

    fn resolve(registry: &EntityRegistry, mesh: MeshId) -> Option<EntityKey> {
        let key = registry.key_for_mesh(mesh).cloned();
        if key.is_none() {
            tracing::debug!("{mesh} is not registered; dropping from selection");
        }
        key
    }

    /// Select the entity owning `mesh`; replaces the selection unless `additive`
    pub fn select(&mut self, registry: &EntityRegistry, mesh: MeshId, additive: bool) -> bool {
        match Self::resolve(registry, mesh) {
            Some(key) => self.select_entities([key], additive),
            None => false,
        }
    }

    /// Select the entities owning `meshes` as a single change
    pub fn select_multiple(
        &mut self,
        registry: &EntityRegistry,
        meshes: impl IntoIterator<Item = MeshId>,
        additive: bool,
    ) -> bool {
        let keys: Vec<EntityKey> = meshes
            .into_iter()
            .filter_map(|m| Self::resolve(registry, m))
            .collect();
        self.select_entities(keys, additive)
    }

    /// Select entities by key as a single change
    pub fn select_entities(
        &mut self,
        keys: impl IntoIterator<Item = EntityKey>,
        additive: bool,
    ) -> bool {
        let mut next = if additive {
            self.selected.clone()
        } else {
            IndexSet::new()
        };
        next.extend(keys);
        self.commit(next)
    }

    /// Shift-click semantics: selected → removed, otherwise added
    pub fn toggle(&mut self, registry: &EntityRegistry, mesh: MeshId) -> bool {
        let Some(key) = Self::resolve(registry, mesh) else {
            return false;
        };
        let mut next = self.selected.clone();
        if !next.shift_remove(&key) {
            next.insert(key);
        }
        self.commit(next)
    }

    /// Select every registered entity
    pub fn select_all(&mut self, registry: &EntityRegistry) -> bool {
        self.commit(registry.keys().cloned().collect())
    }

    /// Clear all selection
    pub fn deselect_all(&mut self) -> bool {
        self.commit(IndexSet::new())
    }

    /// Drop entries whose entity vanished from the registry (after a rebuild).
    /// Returns the dropped keys.
    pub fn retain_registered(&mut self, registry: &EntityRegistry) -> Vec<EntityKey> {
        let (kept, dropped): (Vec<EntityKey>, Vec<EntityKey>) = self
            .selected
            .iter()
            .cloned()
            .partition(|k| registry.contains_entity(k));
        if !dropped.is_empty() {
            for key in &dropped {
                tracing::warn!("Selected entity {key} no longer exists; dropping it");
            }
            self.commit(kept.into_iter().collect());
        }
        dropped
    }

    /// Sync the selection highlight layer with the current set
    pub fn apply_highlights(
        &self,
        registry: &EntityRegistry,
        scene: &impl SceneView,
        highlighter: &mut Highlighter,
    ) {
        let ratio = highlighter.settings().flat_ratio;
        let meshes: Vec<(MeshId, bool)> = self
            .selected
            .iter()
            .flat_map(|key| registry.meshes_of(key).iter().copied())
            .map(|m| (m, scene.bounds_of(m).is_some_and(|b| b.is_flat(ratio))))
            .collect();
        highlighter.set_layer(HighlightLayer::Selection, meshes);
    }
}
