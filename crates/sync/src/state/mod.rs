//! Per-document interaction state: selection, highlights, pointer input,
//! history and persisted preferences.

pub mod highlight;
pub mod history;
pub mod interaction;
pub mod selection;
pub mod settings;

pub use highlight::{HighlightLayer, HighlightStyle, Highlighter};
pub use history::{BranchingHistory, HistoryNode, NodeId, SnapshotMeta};
pub use interaction::{InteractionState, Modifiers, PointerButton, PointerOutcome};
pub use selection::{SelectionChanged, SelectionEngine};
pub use settings::{HighlightSettings, HistorySettings, Preferences, SyncSettings};
