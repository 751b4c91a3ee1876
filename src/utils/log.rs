//! Status log gating for the `log_status!` macro.

use std::io::IsTerminal;

/// Environment variable that forces status lines on (CI logs).
pub const LOG_ENV: &str = "BUILDSEQ_LOG";
/// Environment variable that silences status lines entirely.
pub const QUIET_ENV: &str = "BUILDSEQ_QUIET";

pub fn status_enabled() -> bool {
    decide(
        std::io::stderr().is_terminal(),
        std::env::var(LOG_ENV).ok().as_deref(),
        std::env::var(QUIET_ENV).ok().as_deref(),
    )
}

fn decide(is_terminal: bool, log: Option<&str>, quiet: Option<&str>) -> bool {
    if is_truthy(quiet) {
        return false;
    }
    is_terminal || is_truthy(log)
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_enables_by_default() {
        assert!(decide(true, None, None));
        assert!(!decide(false, None, None));
    }

    #[test]
    fn log_env_forces_output_without_terminal() {
        assert!(decide(false, Some("1"), None));
        assert!(decide(false, Some("TRUE"), None));
        assert!(!decide(false, Some("0"), None));
    }

    #[test]
    fn quiet_wins() {
        assert!(!decide(true, Some("1"), Some("1")));
    }
}
