//! Entity ↔ mesh registry
//!
//! Two independent indices owned by the registry: `EntityKey → [MeshId]`
//! (with the entity record and its source range) and `MeshId → EntityKey`.
//! Entries are rebuilt wholesale from the renderer after every successful parse.

use std::collections::HashMap;

use indexmap::IndexMap;
use shared::{Entity, EntityKey, EntityType, FloorBatch, MeshId, SourceRange};

use crate::scene::SceneView;

#[derive(Clone, Debug)]
struct EntityRecord {
    entity: Entity,
    meshes: Vec<MeshId>,
}

/// Bidirectional map between semantic entities and renderable meshes
#[derive(Default, Clone, Debug)]
pub struct EntityRegistry {
    entities: IndexMap<EntityKey, EntityRecord>,
    mesh_index: HashMap<MeshId, EntityKey>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh for an entity.
    ///
    /// Additive and idempotent per mesh. A mesh already registered to another
    /// entity is moved. A provided source range replaces the stored one.
    pub fn register(
        &mut self,
        mesh: MeshId,
        entity_type: EntityType,
        entity_id: &str,
        floor_id: &str,
        source_range: Option<SourceRange>,
    ) {
        let key = EntityKey::new(floor_id, entity_type, entity_id);

        if let Some(existing) = self.mesh_index.get(&mesh) {
            if *existing != key {
                tracing::debug!("Moving {mesh} from {existing} to {key}");
                self.unregister(mesh);
            }
        }

        let record = self
            .entities
            .entry(key.clone())
            .or_insert_with(|| EntityRecord {
                entity: Entity {
                    entity_type,
                    entity_id: entity_id.to_string(),
                    floor_id: floor_id.to_string(),
                    source_range: None,
                },
                meshes: Vec::new(),
            });

        if !record.meshes.contains(&mesh) {
            record.meshes.push(mesh);
        }
        if source_range.is_some() {
            record.entity.source_range = source_range;
        }

        self.mesh_index.insert(mesh, key);
    }

    /// Remove exactly this mesh. The entity disappears with its last mesh.
    pub fn unregister(&mut self, mesh: MeshId) -> Option<EntityKey> {
        let key = self.mesh_index.remove(&mesh)?;
        if let Some(record) = self.entities.get_mut(&key) {
            record.meshes.retain(|m| *m != mesh);
            if record.meshes.is_empty() {
                self.entities.shift_remove(&key);
            }
        }
        Some(key)
    }

    pub fn entity_for_mesh(&self, mesh: MeshId) -> Option<&Entity> {
        let key = self.mesh_index.get(&mesh)?;
        self.entities.get(key).map(|r| &r.entity)
    }

    pub fn key_for_mesh(&self, mesh: MeshId) -> Option<&EntityKey> {
        self.mesh_index.get(&mesh)
    }

    pub fn meshes_for_entity(
        &self,
        floor_id: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> &[MeshId] {
        self.meshes_of(&EntityKey::new(floor_id, entity_type, entity_id))
    }

    pub fn meshes_of(&self, key: &EntityKey) -> &[MeshId] {
        self.entities
            .get(key)
            .map(|r| r.meshes.as_slice())
            .unwrap_or(&[])
    }

    pub fn entity(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key).map(|r| &r.entity)
    }

    pub fn contains_entity(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn is_registered(&self, mesh: MeshId) -> bool {
        self.mesh_index.contains_key(&mesh)
    }

    /// Walk mesh → parent → … and return the first registered node.
    pub fn find_selectable_ancestor(&self, mesh: MeshId, scene: &impl SceneView) -> Option<MeshId> {
        let mut cursor = Some(mesh);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if self.is_registered(current) {
                return Some(current);
            }
            steps += 1;
            // Guards against a malformed (cyclic) hierarchy from the renderer
            if steps > 1024 {
                tracing::warn!("Containment hierarchy above {mesh} looks cyclic");
                return None;
            }
            cursor = scene.parent_of(current);
        }
        None
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entities.clear();
        self.mesh_index.clear();
    }

    /// Remove all entities and meshes tagged with `floor_id`. Returns the removed meshes.
    pub fn clear_floor(&mut self, floor_id: &str) -> Vec<MeshId> {
        let mut removed = Vec::new();
        self.entities.retain(|key, record| {
            if key.floor_id == floor_id {
                removed.extend(record.meshes.iter().copied());
                false
            } else {
                true
            }
        });
        for mesh in &removed {
            self.mesh_index.remove(mesh);
        }
        removed
    }

    /// Register every tagged mesh of one floor
    pub fn register_floor(&mut self, batch: &FloorBatch) {
        for tagged in &batch.meshes {
            self.register(
                tagged.mesh,
                tagged.entity_type,
                &tagged.entity_id,
                &batch.floor_id,
                tagged.source_range,
            );
        }
    }

    /// Wholesale rebuild from the renderer's per-floor batches
    pub fn rebuild(&mut self, batches: &[FloorBatch]) {
        self.clear();
        for batch in batches {
            self.register_floor(batch);
        }
        tracing::debug!(
            "Registry rebuilt: {} entities, {} meshes",
            self.entities.len(),
            self.mesh_index.len()
        );
    }

    /// All entities in registration order
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().map(|r| &r.entity)
    }

    pub fn entities_by_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.all_entities()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    /// All entity keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    /// (key, meshes) pairs in registration order
    pub fn entries(&self) -> impl Iterator<Item = (&EntityKey, &[MeshId])> {
        self.entities.iter().map(|(k, r)| (k, r.meshes.as_slice()))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
