//! Per-mesh highlight state read by the renderer

use std::collections::HashMap;

use shared::MeshId;

use super::settings::HighlightSettings;

/// Independent highlight sources; removing one never touches the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightLayer {
    /// Meshes of entities in the selection set
    Selection,
    /// Non-destructive preview driven by a text range selection
    Preview,
}

/// Effective look of one highlighted mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    pub outline_color: [u8; 3],
    /// Extra emissive intensity for flat meshes whose outline is hard to see
    pub emissive_boost: Option<f32>,
}

#[derive(Default, Debug, Clone)]
struct LayerState {
    /// mesh → is_flat
    meshes: HashMap<MeshId, bool>,
}

/// Highlight bookkeeping. Each (mesh, layer) pair is tracked on its own, so
/// several simultaneous highlights never interfere on removal.
#[derive(Debug, Clone)]
pub struct Highlighter {
    selection: LayerState,
    preview: LayerState,
    settings: HighlightSettings,
    redraw_requested: bool,
}

impl Highlighter {
    pub fn new(settings: HighlightSettings) -> Self {
        Self {
            selection: LayerState::default(),
            preview: LayerState::default(),
            settings,
            redraw_requested: false,
        }
    }

    pub fn settings(&self) -> &HighlightSettings {
        &self.settings
    }

    fn layer_mut(&mut self, layer: HighlightLayer) -> &mut LayerState {
        match layer {
            HighlightLayer::Selection => &mut self.selection,
            HighlightLayer::Preview => &mut self.preview,
        }
    }

    fn layer(&self, layer: HighlightLayer) -> &LayerState {
        match layer {
            HighlightLayer::Selection => &self.selection,
            HighlightLayer::Preview => &self.preview,
        }
    }

    fn touch(&mut self) {
        self.redraw_requested = true;
    }

    /// Highlight a mesh on a layer. `flat` adds the emissive boost.
    pub fn apply(&mut self, mesh: MeshId, layer: HighlightLayer, flat: bool) {
        let previous = self.layer_mut(layer).meshes.insert(mesh, flat);
        if previous != Some(flat) {
            self.touch();
        }
    }

    /// Remove one mesh from one layer
    pub fn remove(&mut self, mesh: MeshId, layer: HighlightLayer) {
        if self.layer_mut(layer).meshes.remove(&mesh).is_some() {
            self.touch();
        }
    }

    /// Drop every highlight on a layer
    pub fn clear_layer(&mut self, layer: HighlightLayer) {
        let state = self.layer_mut(layer);
        if !state.meshes.is_empty() {
            state.meshes.clear();
            self.touch();
        }
    }

    /// Replace a layer's contents, only touching meshes that actually change
    pub fn set_layer(
        &mut self,
        layer: HighlightLayer,
        meshes: impl IntoIterator<Item = (MeshId, bool)>,
    ) {
        let next: HashMap<MeshId, bool> = meshes.into_iter().collect();
        let stale: Vec<MeshId> = self
            .layer(layer)
            .meshes
            .keys()
            .filter(|m| !next.contains_key(m))
            .copied()
            .collect();
        for mesh in stale {
            self.remove(mesh, layer);
        }
        for (mesh, flat) in next {
            self.apply(mesh, layer, flat);
        }
    }

    pub fn is_highlighted(&self, mesh: MeshId, layer: HighlightLayer) -> bool {
        self.layer(layer).meshes.contains_key(&mesh)
    }

    pub fn layer_len(&self, layer: HighlightLayer) -> usize {
        self.layer(layer).meshes.len()
    }

    /// Effective style for a mesh. Selection wins over preview.
    pub fn style_for(&self, mesh: MeshId) -> Option<HighlightStyle> {
        let (flat, color) = if let Some(flat) = self.selection.meshes.get(&mesh) {
            (*flat, self.settings.outline_color)
        } else if let Some(flat) = self.preview.meshes.get(&mesh) {
            (*flat, self.settings.preview_color)
        } else {
            return None;
        };
        Some(HighlightStyle {
            outline_color: color,
            emissive_boost: flat.then_some(self.settings.emissive_boost),
        })
    }

    /// Every highlighted mesh with its effective style
    pub fn styles(&self) -> Vec<(MeshId, HighlightStyle)> {
        let mut meshes: Vec<MeshId> = self
            .selection
            .meshes
            .keys()
            .chain(self.preview.meshes.keys())
            .copied()
            .collect();
        meshes.sort();
        meshes.dedup();
        meshes
            .into_iter()
            .filter_map(|m| self.style_for(m).map(|s| (m, s)))
            .collect()
    }

    /// Whether a redraw was requested since the last call; coalesces updates into one frame
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }
}
