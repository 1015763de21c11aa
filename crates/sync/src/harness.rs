//! Headless test harness: drives a [`Document`] with an in-memory editor and a
//! virtual clock.
//!
//! Time only moves through [`TestHarness::advance`], so debounce and lock
//! expiry are deterministic in tests.

use std::time::{Duration, Instant};

use glam::Vec2;
use shared::{EntityKey, EntityType};

use crate::document::Document;
use crate::error::SyncError;
use crate::fixtures::{self, SampleFloorplan};
use crate::scene::SceneView;
use crate::state::history::{NodeId, SnapshotMeta};
use crate::state::interaction::{Modifiers, PointerButton};
use crate::state::settings::Preferences;
use crate::sync::editor::{
    BufferEditor, EditorPosition, EditorRange, EditorSelection, TextEdit, TextEditor,
};
use crate::sync::EditorSyncOutcome;
use crate::viewport::marquee::{project_aabb, MarqueeMode, ScreenRect};

/// Long enough for any pending debounce to fire and any lock to expire
pub const SETTLE_MS: u64 = 500;
/// Polling interval of the simulated host frame loop
pub const FRAME_MS: u64 = 10;

/// Headless harness: document, editor and clock
pub struct TestHarness {
    pub doc: Document<BufferEditor>,
    epoch: Instant,
    elapsed: Duration,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness loaded with the sample floorplan
    pub fn new() -> Self {
        Self::with_preferences(Preferences::default())
    }

    /// Harness whose document reads and persists `prefs`
    pub fn with_preferences(prefs: Preferences) -> Self {
        let epoch = Instant::now();
        Self {
            doc: fixtures::sample_document(prefs, epoch),
            epoch,
            elapsed: Duration::ZERO,
        }
    }

    // ── Clock ────────────────────────────────────────────────

    pub fn now(&self) -> Instant {
        self.epoch + self.elapsed
    }

    /// Move the clock forward one frame at a time, firing whatever becomes
    /// due. Returns the last outcome other than `Idle`.
    pub fn advance(&mut self, ms: u64) -> EditorSyncOutcome {
        let mut last = EditorSyncOutcome::Idle;
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(FRAME_MS);
            remaining -= step;
            self.elapsed += Duration::from_millis(step);
            let now = self.now();
            let outcome = self.doc.tick(now);
            if outcome != EditorSyncOutcome::Idle {
                last = outcome;
            }
        }
        last
    }

    /// Advance past every debounce and lock
    pub fn settle(&mut self) -> EditorSyncOutcome {
        self.advance(SETTLE_MS)
    }

    // ── Parser simulation ────────────────────────────────────

    /// Replace text, scene and registry with a rendered sample
    pub fn load_plan(&mut self, plan: SampleFloorplan) {
        let now = self.now();
        self.doc
            .replace_text(&plan.source, SnapshotMeta::labeled("load"), now);
        self.doc.apply_parse_success(plan.scene, &plan.batches, now);
    }

    /// Reload the sample, optionally with comment lines prepended
    pub fn load_fixture(&mut self, line_offset: u32) {
        let plan = if line_offset == 0 {
            fixtures::sample_floorplan()
        } else {
            fixtures::sample_floorplan_shifted(line_offset)
        };
        self.load_plan(plan);
    }

    /// Type a syntax error; the parser reports failure
    pub fn break_syntax(&mut self) {
        let now = self.now();
        self.doc
            .replace_text(&fixtures::broken_source(), SnapshotMeta::labeled("typing"), now);
        self.doc.apply_parse_failure("line 7: expected ')'");
    }

    pub fn parse_failed(&mut self, message: &str) {
        self.doc.apply_parse_failure(message);
    }

    // ── Scene input ──────────────────────────────────────────

    pub fn click(&mut self, x: f32, y: f32, modifiers: Modifiers) {
        self.doc.pointer_down(x, y, PointerButton::Primary, modifiers);
        let now = self.now();
        self.doc.pointer_up(x, y, now);
    }

    /// Click the projected centre of an entity; false if it is off-screen
    pub fn click_entity(&mut self, key: &EntityKey, modifiers: Modifiers) -> bool {
        let Some(center) = self.entity_center(key) else {
            return false;
        };
        self.click(center.x, center.y, modifiers);
        true
    }

    /// Press, move and release: a marquee for the primary button
    pub fn drag(&mut self, from: Vec2, to: Vec2, modifiers: Modifiers) {
        self.doc
            .pointer_down(from.x, from.y, PointerButton::Primary, modifiers);
        self.doc.pointer_move(to.x, to.y);
        let now = self.now();
        self.doc.pointer_up(to.x, to.y, now);
    }

    pub fn drag_rect(&mut self, rect: ScreenRect, modifiers: Modifiers) {
        self.drag(rect.min, rect.max, modifiers);
    }

    pub fn set_marquee_mode(&mut self, mode: MarqueeMode) {
        self.doc.set_marquee_mode(mode);
    }

    /// Screen position of the centre of an entity's combined bounds
    pub fn entity_center(&self, key: &EntityKey) -> Option<Vec2> {
        let bounds = self
            .doc
            .registry()
            .meshes_of(key)
            .iter()
            .filter_map(|m| self.doc.scene().bounds_of(*m))
            .reduce(|a, b| a.union(&b))?;
        self.doc
            .camera()
            .project(bounds.center(), self.doc.viewport())
    }

    /// Union of the projected rectangles of an entity's meshes
    pub fn entity_screen_rect(&self, key: &EntityKey) -> Option<ScreenRect> {
        let view_projection = self.doc.camera().view_projection(self.doc.viewport());
        self.doc
            .registry()
            .meshes_of(key)
            .iter()
            .filter_map(|m| self.doc.scene().bounds_of(*m))
            .filter_map(|b| project_aabb(&b, &view_projection, self.doc.viewport()))
            .reduce(|a, b| ScreenRect::from_corners(a.min.min(b.min), a.max.max(b.max)))
    }

    // ── Editor input ─────────────────────────────────────────

    /// Collapse to a single cursor (1-based, as the widget reports)
    pub fn set_cursor(&mut self, line: u32, column: u32) {
        self.set_cursors(&[(line, column)]);
    }

    pub fn set_cursors(&mut self, positions: &[(u32, u32)]) {
        let selections = positions
            .iter()
            .map(|&(line, column)| EditorSelection::cursor(EditorPosition::new(line, column)))
            .collect();
        self.doc.editor_mut().set_selections(selections);
        let now = self.now();
        self.doc.on_cursor_changed(now);
    }

    /// Select a span of text (1-based)
    pub fn select_text(&mut self, start: EditorPosition, end: EditorPosition) {
        let range = EditorRange::new(start, end);
        self.doc
            .editor_mut()
            .set_selections(vec![EditorSelection::range(range)]);
        let now = self.now();
        self.doc.on_cursor_changed(now);
    }

    /// Replace the buffer as a single user edit
    pub fn edit(&mut self, text: &str, label: Option<String>) -> Option<NodeId> {
        let now = self.now();
        let meta = SnapshotMeta {
            label,
            ..SnapshotMeta::default()
        };
        self.doc.replace_text(text, meta, now)
    }

    /// Several edits applied and recorded as one history node
    pub fn bulk_edit(&mut self, edits: &[TextEdit], label: Option<String>) -> Option<NodeId> {
        let now = self.now();
        let meta = SnapshotMeta {
            label,
            entity_count: edits.len(),
        };
        self.doc.apply_edits(edits, meta, now)
    }

    /// Rename every occurrence of `from` in the buffer in one step
    pub fn rename_all(&mut self, from: &str, to: &str) -> Option<NodeId> {
        let text = self.doc.editor().text();
        let edits: Vec<TextEdit> = text
            .match_indices(from)
            .map(|(byte, _)| {
                let start = text[..byte].chars().count();
                let end = start + from.chars().count();
                TextEdit {
                    range: EditorRange::new(
                        self.doc.editor().position_at(start),
                        self.doc.editor().position_at(end),
                    ),
                    text: to.to_string(),
                }
            })
            .collect();
        self.bulk_edit(&edits, Some(format!("rename {from} → {to}")))
    }

    // ── History ──────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let now = self.now();
        self.doc.undo(now)
    }

    pub fn redo(&mut self) -> bool {
        let now = self.now();
        self.doc.redo(now)
    }

    pub fn checkout(&mut self, id: NodeId) -> Result<(), SyncError> {
        let now = self.now();
        self.doc.checkout(id, now)
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn text(&self) -> String {
        self.doc.editor().text()
    }

    pub fn selected(&self) -> Vec<EntityKey> {
        self.doc.selected()
    }

    /// Selected keys rendered as `Floor/type:Id`
    pub fn selected_names(&self) -> Vec<String> {
        self.doc.selected().iter().map(ToString::to_string).collect()
    }

    pub fn selected_of_type(&self, entity_type: EntityType) -> Vec<EntityKey> {
        self.doc
            .selected()
            .into_iter()
            .filter(|k| k.entity_type == entity_type)
            .collect()
    }

    pub fn editor_selection(&self) -> Option<EditorSelection> {
        self.doc.editor().selections().first().copied()
    }
}
