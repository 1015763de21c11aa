//! User preferences

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::viewport::marquee::MarqueeMode;

/// Timing of the editor ↔ scene synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Quiet period after the last cursor event before the scene is updated
    pub debounce_ms: u64,
    /// Hard expiry of the re-entrancy lock (clamped to 100..=200)
    pub lock_ttl_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            lock_ttl_ms: 150,
        }
    }
}

impl SyncSettings {
    pub fn lock_ttl_ms(&self) -> u64 {
        self.lock_ttl_ms.clamp(100, 200)
    }
}

/// Snapshot history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Maximum number of retained snapshots before the oldest branches are pruned
    pub max_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_depth: 200 }
    }
}

/// Selection highlight appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightSettings {
    /// Outline color RGB
    pub outline_color: [u8; 3],
    /// Preview outline color RGB (text selection preview)
    pub preview_color: [u8; 3],
    /// Emissive intensity added to flat meshes
    pub emissive_boost: f32,
    /// Height / footprint ratio under which a mesh counts as flat
    pub flat_ratio: f32,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            outline_color: [0, 220, 255],
            preview_color: [255, 190, 60],
            emissive_boost: 0.35,
            flat_ratio: 0.05,
        }
    }
}

/// All persisted preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Rectangle selection test
    #[serde(default)]
    pub marquee_mode: MarqueeMode,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub highlight: HighlightSettings,
    /// Where these preferences persist; None keeps them in memory only
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Preferences {
    /// Default location in the per-user config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "floorplan", "floorplan-sync")
            .map(|dirs| dirs.config_dir().join("preferences.json"))
    }

    /// Load preferences from the config directory, or defaults if missing/corrupt
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_at(&path),
            None => Self::default(),
        }
    }

    /// Preferences bound to `path`; defaults when the file is missing or
    /// unreadable. Later saves go to `path` either way.
    pub fn load_at(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(prefs) => prefs,
            Err(SyncError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            },
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences at {}: {e}", path.display());
                Self {
                    path: Some(path.to_path_buf()),
                    ..Self::default()
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SyncError> {
        let json = std::fs::read_to_string(path)?;
        let mut prefs: Preferences = serde_json::from_str(&json)?;
        prefs.path = Some(path.to_path_buf());
        Ok(prefs)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Persist to the bound path, if any
    pub fn save(&self) -> Result<(), SyncError> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }
}
