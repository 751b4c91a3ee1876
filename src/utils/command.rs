//! Command execution primitives with consistent error handling.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;

/// Number of trailing output lines kept for error reports.
pub const TAIL_LINES: usize = 15;

/// Outcome of a streamed child process.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    /// Last lines of combined stdout/stderr, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tail: Vec<String>,
}

impl CommandOutput {
    pub fn tail_text(&self) -> String {
        self.tail.join("\n")
    }
}

/// Build a platform shell invocation for `command`.
pub fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }

    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run a shell command, forwarding its stdout and stderr line by line to our
/// stderr while keeping the last [`TAIL_LINES`] lines.
///
/// stdout of this process is left untouched so it can carry the JSON response.
pub fn run_streaming(
    command: &str,
    current_dir: Option<&Path>,
    env: Option<&[(&str, &str)]>,
) -> CommandOutput {
    let mut cmd = shell_command(command);

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    if let Some(env_pairs) = env {
        cmd.envs(env_pairs.iter().copied());
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandOutput {
                success: false,
                exit_code: -1,
                tail: vec![format!("Command error: {}", e)],
            }
        }
    };

    let stdout_handle = child.stdout.take().map(|out| thread::spawn(move || forward(out)));
    let stderr_handle = child.stderr.take().map(|err| thread::spawn(move || forward(err)));

    let mut tail = VecDeque::with_capacity(TAIL_LINES);
    for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
        if let Ok(lines) = handle.join() {
            for line in lines {
                push_tail(&mut tail, line);
            }
        }
    }

    match child.wait() {
        Ok(status) => CommandOutput {
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
            tail: tail.into_iter().collect(),
        },
        Err(e) => {
            push_tail(&mut tail, format!("Command error: {}", e));
            CommandOutput {
                success: false,
                exit_code: -1,
                tail: tail.into_iter().collect(),
            }
        }
    }
}

fn forward<R: Read>(reader: R) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(TAIL_LINES);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let stderr = io::stderr();

    // Drain to EOF even when a line is not valid UTF-8, so the child never
    // sees its pipe closed early.
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        {
            let mut handle = stderr.lock();
            let _ = writeln!(handle, "{}", line);
        }
        push_tail(&mut tail, line);
    }

    tail
}

fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn run_streaming_reports_success() {
        let output = run_streaming("echo hello", None, None);
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.tail, vec!["hello".to_string()]);
    }

    #[test]
    fn run_streaming_reports_exit_code() {
        let output = run_streaming("echo broken >&2; exit 3", None, None);
        assert!(!output.success);
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.tail_text(), "broken");
    }

    #[test]
    fn run_streaming_tolerates_non_utf8_output() {
        let output = run_streaming(
            "printf 'caf\\351\\n'; sleep 0.3; echo done; exit 0",
            None,
            None,
        );
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.tail.len(), 2);
        assert!(output.tail[0].starts_with("caf"));
        assert!(output.tail[0].contains('\u{FFFD}'));
        assert_eq!(output.tail.last().map(String::as_str), Some("done"));
    }

    #[test]
    fn run_streaming_keeps_only_last_lines() {
        let output = run_streaming("for i in $(seq 1 40); do echo line$i; done", None, None);
        assert_eq!(output.tail.len(), TAIL_LINES);
        assert_eq!(output.tail.last().map(String::as_str), Some("line40"));
    }

    #[test]
    fn run_streaming_honours_dir_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_streaming(
            "echo $BUILDSEQ_TEST_VALUE; ls",
            Some(dir.path()),
            Some(&[("BUILDSEQ_TEST_VALUE", "42")]),
        );
        assert!(output.success);
        assert_eq!(output.tail, vec!["42".to_string()]);
    }
}
