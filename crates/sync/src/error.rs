use thiserror::Error;

use crate::state::history::NodeId;

/// Errors surfaced by the few fallible operations of the core.
///
/// Interaction paths (picking, selection, sync) never fail; they degrade to
/// "nothing selected" or a dropped decoration instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown history node {0}")]
    UnknownHistoryNode(NodeId),

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
