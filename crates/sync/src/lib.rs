// Library crate: the editor ↔ scene selection core, plus the headless harness
// and JSON command protocol used by integration tests and the binary.

pub mod command;
pub mod document;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod registry;
pub mod scene;
pub mod state;
pub mod sync;
pub mod viewport;

pub use document::{Document, ErrorOverlay};
pub use error::SyncError;
