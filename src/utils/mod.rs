//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Child process execution with streamed output
//! - `io` - File I/O with consistent error handling
//! - `log` - Status line gating for `log_status!`
//! - `patterns` - Root-relative glob resolution
//! - `shell` - Shell escaping and quoting
//! - `template` - String template rendering

pub mod command;
pub mod io;
pub mod log;
pub mod patterns;
pub mod shell;
pub(crate) mod template;
