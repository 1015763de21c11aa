//! Editor ↔ scene synchronization
//!
//! Scene → editor runs on every selection change; editor → scene runs when
//! the cursor debounce fires. A shared [`SyncLock`] keeps each direction from
//! reacting to the echo of the other.

pub mod editor;
pub mod lock;
pub mod timer;

use std::time::{Duration, Instant};

use indexmap::IndexSet;
use serde::Serialize;
use shared::{EntityKey, MeshId, SourcePosition};

use crate::registry::EntityRegistry;
use crate::scene::SceneView;
use crate::state::highlight::{HighlightLayer, Highlighter};
use crate::state::selection::{SelectionChanged, SelectionEngine};
use crate::state::settings::SyncSettings;

use editor::{EditorRange, TextEditor};
pub use lock::{SyncDirection, SyncLock};
use timer::DebounceTimer;

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Scene → editor updates performed
    pub editor_updates: u64,
    /// Editor → scene selection updates performed
    pub scene_updates: u64,
    /// Highlight previews applied from text selections
    pub previews: u64,
    /// Updates skipped because the inverse direction held the lock
    pub suppressed: u64,
}

/// What a fired cursor debounce did
#[derive(Debug, Clone, PartialEq)]
pub enum EditorSyncOutcome {
    /// Debounce not due
    Idle,
    /// Suppressed by the scene → editor lock
    Suppressed,
    /// Collapsed cursors resolved to these entities (possibly none)
    Selected(Vec<EntityKey>),
    /// Text selection previewed these entities
    Previewed(Vec<EntityKey>),
}

/// Loop-safe bidirectional translation between text positions and entities
#[derive(Debug, Clone)]
pub struct SyncProtocol {
    lock: SyncLock,
    debounce: DebounceTimer,
    preview: Vec<EntityKey>,
    stats: SyncStats,
}

impl SyncProtocol {
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            lock: SyncLock::new(Duration::from_millis(settings.lock_ttl_ms())),
            debounce: DebounceTimer::new(Duration::from_millis(settings.debounce_ms)),
            preview: Vec::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn lock_direction(&self, now: Instant) -> SyncDirection {
        self.lock.direction(now)
    }

    /// Entities currently previewed by a text selection
    pub fn preview(&self) -> &[EntityKey] {
        &self.preview
    }

    // ── Scene → editor ─────────────────────────────────────────

    /// Reflect a selection change into the editor.
    /// Returns false when skipped because editor → scene holds the lock.
    pub fn on_selection_changed(
        &mut self,
        event: &SelectionChanged,
        registry: &EntityRegistry,
        editor: &mut impl TextEditor,
        now: Instant,
    ) -> bool {
        if self.lock.is_held(SyncDirection::EditorToScene, now) {
            self.stats.suppressed += 1;
            tracing::debug!("Scene → editor skipped: echo of editor → scene");
            return false;
        }
        self.lock.acquire(SyncDirection::SceneToEditor, now);

        let ranges: Vec<EditorRange> = event
            .selected
            .iter()
            .filter_map(|key| match registry.entity(key) {
                Some(entity) => entity.source_range.as_ref().map(EditorRange::from_source),
                None => {
                    tracing::warn!("Selected entity {key} missing from registry");
                    None
                }
            })
            .collect();

        let Some((first, rest)) = ranges.split_first() else {
            editor.clear_decorations();
            return true;
        };

        editor.reveal_line_in_center(first.start.line);
        editor.set_selection(*first);
        if rest.is_empty() {
            editor.clear_decorations();
        } else {
            editor.set_decorations(rest);
        }
        self.stats.editor_updates += 1;
        tracing::debug!(
            "Scene → editor: {} range(s), primary at line {}",
            ranges.len(),
            first.start.line
        );
        true
    }

    // ── Editor → scene ─────────────────────────────────────────

    /// A cursor or selection change arrived from the editor.
    ///
    /// Restarts the debounce. A collapsed selection drops any preview right
    /// away instead of waiting for the debounce.
    pub fn on_editor_event(
        &mut self,
        editor: &impl TextEditor,
        highlighter: &mut Highlighter,
        now: Instant,
    ) {
        let collapsed = editor.selections().iter().all(|s| s.is_collapsed());
        if collapsed {
            self.clear_preview(highlighter);
        }
        self.debounce.schedule(now);
    }

    /// Drop the text-selection preview
    pub fn clear_preview(&mut self, highlighter: &mut Highlighter) {
        if !self.preview.is_empty() || highlighter.layer_len(HighlightLayer::Preview) > 0 {
            self.preview.clear();
            highlighter.clear_layer(HighlightLayer::Preview);
        }
    }

    /// Poll the cursor debounce; when it fires, translate the editor state
    /// into a selection (collapsed cursors) or a preview (text selections).
    pub fn tick(
        &mut self,
        now: Instant,
        editor: &impl TextEditor,
        registry: &EntityRegistry,
        scene: &impl SceneView,
        selection: &mut SelectionEngine,
        highlighter: &mut Highlighter,
    ) -> EditorSyncOutcome {
        let Some(fired_at) = self.debounce.fire_if_due(now) else {
            return EditorSyncOutcome::Idle;
        };
        // Judged at the deadline, not the poll: a late frame must not let the
        // echo of a scene → editor update through after the lock expired.
        if self.lock.is_held(SyncDirection::SceneToEditor, fired_at) {
            self.stats.suppressed += 1;
            tracing::debug!("Editor → scene skipped: echo of scene → editor");
            return EditorSyncOutcome::Suppressed;
        }

        let selections = editor.selections();
        let ranges: Vec<EditorRange> = selections
            .iter()
            .filter(|s| !s.is_collapsed())
            .map(|s| s.as_range())
            .collect();

        if !ranges.is_empty() {
            let keys = entities_overlapping(registry, &ranges);
            self.apply_preview(&keys, registry, scene, highlighter);
            self.stats.previews += 1;
            return EditorSyncOutcome::Previewed(keys);
        }

        self.clear_preview(highlighter);
        let mut keys: IndexSet<EntityKey> = IndexSet::new();
        for sel in &selections {
            if let Some(key) = entity_at(registry, sel.active.to_source()) {
                keys.insert(key);
            }
        }
        let keys: Vec<EntityKey> = keys.into_iter().collect();

        self.lock.acquire(SyncDirection::EditorToScene, now);
        if keys.is_empty() {
            selection.deselect_all();
        } else {
            selection.select_entities(keys.clone(), false);
        }
        self.stats.scene_updates += 1;
        tracing::debug!("Editor → scene: {} entit(ies) under cursor", keys.len());
        EditorSyncOutcome::Selected(keys)
    }

    fn apply_preview(
        &mut self,
        keys: &[EntityKey],
        registry: &EntityRegistry,
        scene: &impl SceneView,
        highlighter: &mut Highlighter,
    ) {
        let ratio = highlighter.settings().flat_ratio;
        let meshes: Vec<(MeshId, bool)> = keys
            .iter()
            .flat_map(|k| registry.meshes_of(k).iter().copied())
            .map(|m| (m, scene.bounds_of(m).is_some_and(|b| b.is_flat(ratio))))
            .collect();
        highlighter.set_layer(HighlightLayer::Preview, meshes);
        self.preview = keys.to_vec();
    }
}

/// The entity whose source range most specifically encloses `pos`.
///
/// Nested ranges (a wall inside its room) resolve to the smallest one; equal
/// extents keep the earlier registration.
pub fn entity_at(registry: &EntityRegistry, pos: SourcePosition) -> Option<EntityKey> {
    let mut best: Option<(&shared::Entity, (u32, i64))> = None;
    for entity in registry.all_entities() {
        let Some(range) = entity.source_range else {
            continue;
        };
        if !range.contains(pos) {
            continue;
        }
        let extent = range.extent();
        if best.as_ref().is_none_or(|(_, e)| extent < *e) {
            best = Some((entity, extent));
        }
    }
    best.map(|(e, _)| e.key())
}

/// Every entity whose source range overlaps any of the editor ranges
pub fn entities_overlapping(registry: &EntityRegistry, ranges: &[EditorRange]) -> Vec<EntityKey> {
    registry
        .all_entities()
        .filter(|entity| {
            entity.source_range.is_some_and(|r| {
                ranges
                    .iter()
                    .any(|sel| r.overlaps(sel.start.to_source(), sel.end.to_source()))
            })
        })
        .map(|e| e.key())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use crate::state::settings::HighlightSettings;
    use editor::{BufferEditor, EditorPosition, EditorSelection};
    use shared::{EntityType, SourceRange};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn registry() -> EntityRegistry {
        let mut r = EntityRegistry::new();
        let kitchen = SourceRange::new(3, 1, 10, 1);
        let wall = SourceRange::new(5, 1, 5, 40);
        let hall = SourceRange::new(12, 0, 15, 1);
        r.register(MeshId(1), EntityType::Room, "Kitchen", "F1", Some(kitchen));
        r.register(MeshId(2), EntityType::Wall, "K_north", "F1", Some(wall));
        r.register(MeshId(3), EntityType::Room, "Hall", "F1", Some(hall));
        r.register(MeshId(4), EntityType::Lift, "L1", "F1", None);
        r
    }

    fn key(t: EntityType, id: &str) -> EntityKey {
        EntityKey::new("F1", t, id)
    }

    struct Fixture {
        sync: SyncProtocol,
        registry: EntityRegistry,
        scene: SceneGraph,
        selection: SelectionEngine,
        highlighter: Highlighter,
        editor: BufferEditor,
    }

    fn fixture() -> Fixture {
        Fixture {
            sync: SyncProtocol::new(&SyncSettings::default()),
            registry: registry(),
            scene: SceneGraph::new(),
            selection: SelectionEngine::new(),
            highlighter: Highlighter::new(HighlightSettings::default()),
            editor: BufferEditor::new("x\n".repeat(20)),
        }
    }

    impl Fixture {
        fn tick(&mut self, now: Instant) -> EditorSyncOutcome {
            self.sync.tick(
                now,
                &self.editor,
                &self.registry,
                &self.scene,
                &mut self.selection,
                &mut self.highlighter,
            )
        }
    }

    #[test]
    fn test_nested_range_resolves_to_smallest() {
        let r = registry();
        // Editor (6, 10) → source (5, 9): inside both wall and room
        let pos = EditorPosition::new(6, 10).to_source();
        assert_eq!(entity_at(&r, pos), Some(key(EntityType::Wall, "K_north")));
        // Source (4, 0): room only
        assert_eq!(
            entity_at(&r, SourcePosition::new(4, 0)),
            Some(key(EntityType::Room, "Kitchen"))
        );
        assert_eq!(entity_at(&r, SourcePosition::new(11, 0)), None);
    }

    #[test]
    fn test_nested_resolution_ignores_registration_order() {
        let mut r = EntityRegistry::new();
        r.register(MeshId(2), EntityType::Wall, "W", "F1", Some(SourceRange::new(5, 1, 5, 40)));
        r.register(MeshId(1), EntityType::Room, "R", "F1", Some(SourceRange::new(3, 1, 10, 1)));
        assert_eq!(entity_at(&r, SourcePosition::new(5, 3)), Some(key(EntityType::Wall, "W")));
    }

    #[test]
    fn test_scene_to_editor_single() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(3), false);
        let event = f.selection.take_events().remove(0);

        assert!(f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0));
        assert_eq!(f.editor.revealed_line(), Some(13));
        let sel = f.editor.selections()[0];
        assert_eq!(sel.anchor, EditorPosition::new(13, 1));
        assert_eq!(sel.active, EditorPosition::new(16, 2));
        assert!(f.editor.decorations().is_empty());
        assert_eq!(f.sync.lock_direction(t0), SyncDirection::SceneToEditor);
    }

    #[test]
    fn test_scene_to_editor_multi_decorates_rest() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection
            .select_multiple(&f.registry, [MeshId(1), MeshId(4), MeshId(3)], false);
        let event = f.selection.take_events().remove(0);
        f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0);

        // Lift has no range; Kitchen is primary, Hall decorated
        assert_eq!(f.editor.revealed_line(), Some(4));
        assert_eq!(f.editor.decorations().len(), 1);
        assert_eq!(f.editor.decorations()[0].start, EditorPosition::new(13, 1));
    }

    #[test]
    fn test_editor_to_scene_after_debounce() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.editor
            .set_selections(vec![EditorSelection::cursor(EditorPosition::new(6, 10))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);

        assert_eq!(f.tick(t0 + ms(50)), EditorSyncOutcome::Idle);
        let out = f.tick(t0 + ms(100));
        assert_eq!(out, EditorSyncOutcome::Selected(vec![key(EntityType::Wall, "K_north")]));
        assert_eq!(f.selection.all(), vec![key(EntityType::Wall, "K_north")]);
        assert_eq!(f.sync.lock_direction(t0 + ms(100)), SyncDirection::EditorToScene);
    }

    #[test]
    fn test_multi_cursor_union() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.editor.set_selections(vec![
            EditorSelection::cursor(EditorPosition::new(5, 1)),
            EditorSelection::cursor(EditorPosition::new(14, 1)),
            EditorSelection::cursor(EditorPosition::new(4, 3)),
        ]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);
        f.tick(t0 + ms(100));
        assert_eq!(
            f.selection.all(),
            vec![key(EntityType::Room, "Kitchen"), key(EntityType::Room, "Hall")]
        );
    }

    #[test]
    fn test_cursor_outside_any_range_deselects() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(1), false);
        f.editor
            .set_selections(vec![EditorSelection::cursor(EditorPosition::new(19, 1))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);
        assert_eq!(f.tick(t0 + ms(100)), EditorSyncOutcome::Selected(vec![]));
        assert!(f.selection.is_empty());
    }

    #[test]
    fn test_echo_suppressed_by_lock() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(1), false);
        let event = f.selection.take_events().remove(0);
        f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0);

        // The editor reports our own set_selection back
        assert_eq!(f.editor.drain_selection_events(), 1);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);
        assert_eq!(f.tick(t0 + ms(100)), EditorSyncOutcome::Suppressed);
        assert!(f.selection.take_events().is_empty());
        assert_eq!(f.sync.stats().scene_updates, 0);
    }

    #[test]
    fn test_echo_suppressed_when_polled_after_lock_expiry() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(1), false);
        let event = f.selection.take_events().remove(0);
        f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0);
        f.editor.drain_selection_events();
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);

        // First poll lands after the 150 ms lock, debounce was due at 100 ms
        assert_eq!(f.tick(t0 + ms(160)), EditorSyncOutcome::Suppressed);
        assert_eq!(f.highlighter.layer_len(HighlightLayer::Preview), 0);
        assert_eq!(f.sync.stats().previews, 0);
        assert_eq!(f.sync.stats().suppressed, 1);
    }

    #[test]
    fn test_scene_to_editor_skipped_during_editor_to_scene() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.editor
            .set_selections(vec![EditorSelection::cursor(EditorPosition::new(14, 1))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);
        f.tick(t0 + ms(100));

        let event = f.selection.take_events().remove(0);
        assert!(!f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0 + ms(101)));
        assert_eq!(f.editor.selection_updates(), 0);
    }

    #[test]
    fn test_lock_expiry_restores_sync() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(1), false);
        let event = f.selection.take_events().remove(0);
        f.sync.on_selection_changed(&event, &f.registry, &mut f.editor, t0);

        // User moves the cursor later, after the lock expired
        let later = t0 + ms(400);
        f.editor
            .set_selections(vec![EditorSelection::cursor(EditorPosition::new(14, 1))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, later);
        assert!(matches!(f.tick(later + ms(100)), EditorSyncOutcome::Selected(_)));
        assert_eq!(f.selection.all(), vec![key(EntityType::Room, "Hall")]);
    }

    #[test]
    fn test_text_selection_previews_without_selecting() {
        let mut f = fixture();
        let t0 = Instant::now();
        f.selection.select(&f.registry, MeshId(3), false);
        f.selection.take_events();

        // Lines 5..7 (editor) overlap Kitchen and its north wall
        f.editor.set_selections(vec![EditorSelection::range(EditorRange::new(
            EditorPosition::new(5, 1),
            EditorPosition::new(7, 1),
        ))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0);
        let out = f.tick(t0 + ms(100));
        assert_eq!(
            out,
            EditorSyncOutcome::Previewed(vec![
                key(EntityType::Room, "Kitchen"),
                key(EntityType::Wall, "K_north")
            ])
        );
        assert_eq!(f.selection.all(), vec![key(EntityType::Room, "Hall")]);
        assert!(f.selection.take_events().is_empty());
        assert!(f.highlighter.is_highlighted(MeshId(1), HighlightLayer::Preview));
        assert!(f.highlighter.is_highlighted(MeshId(2), HighlightLayer::Preview));

        // Collapsing clears the preview immediately, before any debounce
        f.editor
            .set_selections(vec![EditorSelection::cursor(EditorPosition::new(5, 1))]);
        f.sync.on_editor_event(&f.editor, &mut f.highlighter, t0 + ms(150));
        assert!(f.sync.preview().is_empty());
        assert_eq!(f.highlighter.layer_len(HighlightLayer::Preview), 0);
    }
}
