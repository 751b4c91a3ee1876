// Public modules
pub mod backup;
pub mod database;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod retry;
pub mod scaffold;
pub mod sequencer;

// Internal modules - not part of public API
pub(crate) mod templates;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
