/// Macro for prefixed status logging to stderr.
///
/// Emits only when [`utils::log::status_enabled`] allows it (stderr is a
/// terminal or `BUILDSEQ_LOG=1`, and `BUILDSEQ_QUIET` is unset).
///
/// Usage:
/// ```ignore
/// log_status!("sequence", "Running step '{}'", step.name);
/// log_status!("backup", "Restored {}", path.display());
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if $crate::utils::log::status_enabled() {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `buildseq::sequencer` instead of `buildseq::core::sequencer`
pub use core::*;
pub use utils::*;
