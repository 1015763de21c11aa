//! One open floorplan document: text editor, scene, registry, selection,
//! sync protocol and history, wired together.
//!
//! Each document owns its own instances; nothing is global, so several
//! documents can coexist. All entry points run synchronously on the host's UI
//! thread and take the current time for the debounce/lock timers.

use std::time::Instant;

use glam::Vec2;
use serde::Serialize;
use shared::{EntityKey, FloorBatch, MeshId};

use crate::error::SyncError;
use crate::registry::EntityRegistry;
use crate::scene::{SceneGraph, SceneView};
use crate::state::highlight::Highlighter;
use crate::state::history::{BranchingHistory, NodeId, SnapshotMeta};
use crate::state::interaction::{InteractionState, Modifiers, PointerButton, PointerOutcome};
use crate::state::selection::SelectionEngine;
use crate::state::settings::Preferences;
use crate::sync::editor::{apply_edits, TextEdit, TextEditor};
use crate::sync::{EditorSyncOutcome, SyncDirection, SyncProtocol, SyncStats};
use crate::viewport::camera::{ArcBallCamera, Viewport};
use crate::viewport::marquee::{project_aabb, MarqueeMode, ScreenRect};

/// Degrees of orbit per dragged pixel
const ORBIT_SPEED: f32 = 0.5;
/// Fraction of the orbit distance covered by one wheel notch
const ZOOM_PER_NOTCH: f32 = 0.1;

/// Banner shown while the source does not parse.
///
/// Purely visual: it never captures pointer events, so the stale scene stays
/// selectable underneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorOverlay {
    pub message: String,
    pub intercepts_pointer: bool,
}

pub struct Document<E: TextEditor> {
    editor: E,
    registry: EntityRegistry,
    scene: SceneGraph,
    selection: SelectionEngine,
    highlighter: Highlighter,
    interaction: InteractionState,
    sync: SyncProtocol,
    history: BranchingHistory,
    camera: ArcBallCamera,
    viewport: Viewport,
    prefs: Preferences,
    error_overlay: Option<ErrorOverlay>,
}

impl<E: TextEditor> Document<E> {
    pub fn new(editor: E, prefs: Preferences) -> Self {
        let history = BranchingHistory::new(editor.text(), prefs.history.max_depth);
        Self {
            registry: EntityRegistry::new(),
            scene: SceneGraph::new(),
            selection: SelectionEngine::new(),
            highlighter: Highlighter::new(prefs.highlight.clone()),
            interaction: InteractionState::default(),
            sync: SyncProtocol::new(&prefs.sync),
            history,
            camera: ArcBallCamera::new(),
            viewport: Viewport::new(1280.0, 800.0),
            prefs,
            error_overlay: None,
            editor,
        }
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Direct access for the host's widget adapter; call
    /// [`Document::on_cursor_changed`] after moving cursors through it.
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// For incremental single-floor updates; follow with [`Document::rebuild_floor`]
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn selected(&self) -> Vec<EntityKey> {
        self.selection.all()
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Renderer side: returns true once per batch of highlight changes
    pub fn take_redraw_request(&mut self) -> bool {
        self.highlighter.take_redraw_request()
    }

    pub fn history(&self) -> &BranchingHistory {
        &self.history
    }

    pub fn camera(&self) -> &ArcBallCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut ArcBallCamera {
        &mut self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Direction currently guarded by the sync lock
    pub fn sync_direction(&self, now: Instant) -> SyncDirection {
        self.sync.lock_direction(now)
    }

    pub fn error_overlay(&self) -> Option<&ErrorOverlay> {
        self.error_overlay.as_ref()
    }

    /// True while showing geometry from the last successful parse
    pub fn is_stale(&self) -> bool {
        self.error_overlay.is_some()
    }

    pub fn marquee_overlay(&self) -> Option<ScreenRect> {
        self.interaction.marquee_overlay()
    }

    // ── Parser / renderer notifications ──────────────────────

    /// New scene and registry after a successful parse + render
    pub fn apply_parse_success(&mut self, scene: SceneGraph, batches: &[FloorBatch], now: Instant) {
        if self.error_overlay.take().is_some() {
            tracing::info!("Source parses again; leaving stale mode");
        }
        self.scene = scene;
        self.registry.rebuild(batches);
        self.after_registry_change(now);
    }

    /// Regenerate a single floor without a full rebuild. The caller updates
    /// the floor's nodes in [`Document::scene_mut`] first.
    pub fn rebuild_floor(&mut self, batch: &FloorBatch, now: Instant) {
        let removed = self.registry.clear_floor(&batch.floor_id);
        tracing::debug!(
            "Rebuilding floor {}: {} meshes out, {} in",
            batch.floor_id,
            removed.len(),
            batch.meshes.len()
        );
        self.registry.register_floor(batch);
        self.after_registry_change(now);
    }

    /// Keep the last good scene and ranges, show the banner
    pub fn apply_parse_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("Parse failed, keeping last valid scene: {message}");
        self.error_overlay = Some(ErrorOverlay {
            message,
            intercepts_pointer: false,
        });
    }

    fn after_registry_change(&mut self, now: Instant) {
        self.selection.retain_registered(&self.registry);
        // Meshes are new even when entity keys survived
        self.selection
            .apply_highlights(&self.registry, &self.scene, &mut self.highlighter);
        self.sync.clear_preview(&mut self.highlighter);
        self.process_selection_events(now);
    }

    // ── Pointer input (platform adapter) ─────────────────────

    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton, modifiers: Modifiers) {
        self.interaction.pointer_down(Vec2::new(x, y), button, modifiers);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> PointerOutcome {
        let outcome = self.interaction.pointer_move(Vec2::new(x, y));
        if let PointerOutcome::Orbit { delta } = outcome {
            self.orbit(delta);
        }
        outcome
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, now: Instant) -> PointerOutcome {
        let outcome = self.interaction.pointer_up(Vec2::new(x, y));
        match outcome {
            PointerOutcome::Click { position, modifiers } => {
                self.click_at(position, modifiers, now);
            }
            PointerOutcome::Marquee { rect, modifiers } => {
                self.marquee_select(rect, modifiers, now);
            }
            PointerOutcome::Orbit { delta } => self.orbit(delta),
            PointerOutcome::None | PointerOutcome::MarqueeUpdated(_) => {}
        }
        outcome
    }

    /// Pointer left the view or Escape was pressed mid-gesture: drop the
    /// gesture and its marquee overlay without selecting anything
    pub fn pointer_cancel(&mut self) {
        self.interaction.cancel();
    }

    /// Mouse wheel; positive notches zoom in. Never touches the selection.
    pub fn scroll(&mut self, notches: f32) {
        self.camera.zoom(notches * ZOOM_PER_NOTCH);
    }

    fn orbit(&mut self, delta: Vec2) {
        self.camera.rotate(-delta.x * ORBIT_SPEED, delta.y * ORBIT_SPEED);
    }

    /// Resolve a click to the nearest selectable mesh
    pub fn pick(&self, position: Vec2) -> Option<MeshId> {
        let ray = self.camera.screen_ray(position, self.viewport);
        let hit = self.scene.raycast(&ray)?;
        let selectable = self.registry.find_selectable_ancestor(hit, &self.scene);
        if selectable.is_none() {
            tracing::debug!("Hit {hit} has no selectable ancestor");
        }
        selectable
    }

    /// Click semantics: hit → select (Shift toggles); miss → deselect all
    /// unless Shift is held.
    pub fn click_at(
        &mut self,
        position: Vec2,
        modifiers: Modifiers,
        now: Instant,
    ) -> Option<MeshId> {
        let picked = self.pick(position);
        match (picked, modifiers.shift) {
            (Some(mesh), true) => {
                self.selection.toggle(&self.registry, mesh);
            }
            (Some(mesh), false) => {
                self.selection.select(&self.registry, mesh, false);
            }
            (None, false) => {
                self.selection.deselect_all();
            }
            (None, true) => {}
        }
        self.process_selection_events(now);
        picked
    }

    /// Entities hit by a drag rectangle under the given mode.
    ///
    /// Intersection: any visible mesh of the entity overlaps. Containment:
    /// every visible mesh lies inside. Meshes entirely behind the camera are
    /// ignored; an entity with no visible mesh never matches.
    pub fn marquee_hits(&self, rect: ScreenRect, mode: MarqueeMode) -> Vec<EntityKey> {
        let view_projection = self.camera.view_projection(self.viewport);
        self.registry
            .entries()
            .filter_map(|(key, meshes)| {
                let rects: Vec<ScreenRect> = meshes
                    .iter()
                    .filter_map(|m| self.scene.bounds_of(*m))
                    .filter_map(|b| project_aabb(&b, &view_projection, self.viewport))
                    .collect();
                if rects.is_empty() {
                    return None;
                }
                let hit = match mode {
                    MarqueeMode::Intersection => rects.iter().any(|r| rect.matches(r, mode)),
                    MarqueeMode::Containment => rects.iter().all(|r| rect.matches(r, mode)),
                };
                hit.then(|| key.clone())
            })
            .collect()
    }

    /// Apply a finished marquee using the persisted mode; Shift adds
    pub fn marquee_select(
        &mut self,
        rect: ScreenRect,
        modifiers: Modifiers,
        now: Instant,
    ) -> Vec<EntityKey> {
        let hits = self.marquee_hits(rect, self.prefs.marquee_mode);
        tracing::debug!(
            "Marquee {:?} selected {} entities ({})",
            rect,
            hits.len(),
            self.prefs.marquee_mode.display_name()
        );
        self.selection.select_entities(hits.clone(), modifiers.shift);
        self.process_selection_events(now);
        hits
    }

    pub fn marquee_mode(&self) -> MarqueeMode {
        self.prefs.marquee_mode
    }

    /// Change and persist the marquee mode
    pub fn set_marquee_mode(&mut self, mode: MarqueeMode) {
        if self.prefs.marquee_mode == mode {
            return;
        }
        self.prefs.marquee_mode = mode;
        if let Err(e) = self.prefs.save() {
            tracing::warn!("Failed to persist marquee mode: {e}");
        }
    }

    // ── Programmatic selection ───────────────────────────────

    pub fn select_mesh(&mut self, mesh: MeshId, additive: bool, now: Instant) {
        self.selection.select(&self.registry, mesh, additive);
        self.process_selection_events(now);
    }

    pub fn select_meshes(&mut self, meshes: &[MeshId], additive: bool, now: Instant) {
        self.selection
            .select_multiple(&self.registry, meshes.iter().copied(), additive);
        self.process_selection_events(now);
    }

    pub fn toggle_mesh(&mut self, mesh: MeshId, now: Instant) {
        self.selection.toggle(&self.registry, mesh);
        self.process_selection_events(now);
    }

    pub fn select_all(&mut self, now: Instant) {
        self.selection.select_all(&self.registry);
        self.process_selection_events(now);
    }

    pub fn deselect_all(&mut self, now: Instant) {
        self.selection.deselect_all();
        self.process_selection_events(now);
    }

    /// Deliver pending selection events to the highlight layer and the
    /// editor, then route any echo the editor produced back into the sync.
    fn process_selection_events(&mut self, now: Instant) {
        let events = self.selection.take_events();
        if events.is_empty() {
            return;
        }
        self.selection
            .apply_highlights(&self.registry, &self.scene, &mut self.highlighter);
        for event in &events {
            self.sync
                .on_selection_changed(event, &self.registry, &mut self.editor, now);
        }
        self.forward_editor_echo(now);
    }

    fn forward_editor_echo(&mut self, now: Instant) {
        if self.editor.drain_selection_events() > 0 {
            self.sync
                .on_editor_event(&self.editor, &mut self.highlighter, now);
        }
    }

    // ── Editor input ─────────────────────────────────────────

    /// Cursor or selection changed in the editor widget
    pub fn on_cursor_changed(&mut self, now: Instant) {
        // The adapter may have queued the same notification
        self.editor.drain_selection_events();
        self.sync
            .on_editor_event(&self.editor, &mut self.highlighter, now);
    }

    /// Fire due timers; call from the host's frame or timer callback
    pub fn tick(&mut self, now: Instant) -> EditorSyncOutcome {
        let outcome = self.sync.tick(
            now,
            &self.editor,
            &self.registry,
            &self.scene,
            &mut self.selection,
            &mut self.highlighter,
        );
        self.process_selection_events(now);
        outcome
    }

    // ── History ──────────────────────────────────────────────

    /// Capture the current editor text
    pub fn snapshot(&mut self, metadata: SnapshotMeta) -> Option<NodeId> {
        self.history.snapshot(self.editor.text(), metadata)
    }

    /// Apply edits as one user action: one buffer change, one snapshot.
    /// A bulk change across N entities therefore undoes in a single step.
    pub fn apply_edits(
        &mut self,
        edits: &[TextEdit],
        metadata: SnapshotMeta,
        now: Instant,
    ) -> Option<NodeId> {
        apply_edits(&mut self.editor, edits);
        self.forward_editor_echo(now);
        self.snapshot(metadata)
    }

    /// Replace the whole buffer as one user action
    pub fn replace_text(
        &mut self,
        text: &str,
        metadata: SnapshotMeta,
        now: Instant,
    ) -> Option<NodeId> {
        self.editor.set_text(text);
        self.forward_editor_echo(now);
        self.snapshot(metadata)
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        let Some(content) = self.history.undo().map(str::to_owned) else {
            return false;
        };
        self.restore(&content, now);
        true
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        let Some(content) = self.history.redo().map(str::to_owned) else {
            return false;
        };
        self.restore(&content, now);
        true
    }

    /// Restore any retained snapshot, including abandoned branches
    pub fn checkout(&mut self, id: NodeId, now: Instant) -> Result<(), SyncError> {
        let content = self.history.checkout(id)?.to_owned();
        self.restore(&content, now);
        Ok(())
    }

    /// Full-buffer replace; the widget's native undo stack is discarded
    fn restore(&mut self, content: &str, now: Instant) {
        self.editor.set_text(content);
        self.forward_editor_echo(now);
        tracing::debug!("Restored history node {}", self.history.current_id());
    }
}
