use buildseq::error::StepCommandFailedDetails;
use buildseq::output::{map_cmd_result_to_json, write_result, CliResponse};
use buildseq::Error;

fn step_failure(exit_code: i32) -> Error {
    Error::step_command_failed(StepCommandFailedDetails {
        step: "server-bundle".to_string(),
        command: "npx esbuild server/index.js".to_string(),
        exit_code,
        working_dir: "/app".to_string(),
        output_tail: "error: Could not resolve \"express\"".to_string(),
    })
}

#[test]
fn step_command_failed_serializes_output_tail() {
    let json = CliResponse::<()>::from_error(&step_failure(127))
        .to_json()
        .unwrap();

    assert!(json.contains("\"success\": false"));
    assert!(json.contains("\"code\": \"step.command_failed\""));
    assert!(json.contains("\"exitCode\": 127"));
    assert!(json.contains("\"workingDir\": \"/app\""));
    assert!(json.contains("Could not resolve"));
    assert!(json.contains("Command not found"));
}

#[test]
fn step_command_failed_maps_to_exit_code_1() {
    let (value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(step_failure(2)));

    assert!(value.is_err());
    assert_eq!(exit_code, 1);
}

#[test]
fn config_errors_map_to_exit_code_2() {
    let err = Error::config_invalid_value("path_fix.attempts", Some("0".to_string()), "must be at least 1");
    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

    assert_eq!(exit_code, 2);
}

#[test]
fn success_keeps_command_exit_code() {
    let (value, exit_code) =
        map_cmd_result_to_json(Ok((serde_json::json!({"ok": false}), 1)));

    assert_eq!(value.unwrap()["ok"], false);
    assert_eq!(exit_code, 1);
}

#[test]
fn success_envelope_omits_error() {
    let json = CliResponse::success(serde_json::json!({"steps": []}))
        .to_json()
        .unwrap();

    assert!(json.contains("\"success\": true"));
    assert!(!json.contains("\"error\""));
}

#[test]
fn write_result_emits_one_envelope_for_success_and_failure() {
    let mut ok_out = Vec::new();
    write_result(&mut ok_out, Ok(serde_json::json!({ "steps": 9 }))).unwrap();
    let ok: serde_json::Value = serde_json::from_slice(&ok_out).unwrap();
    assert_eq!(ok["success"], true);
    assert_eq!(ok["data"]["steps"], 9);
    assert!(ok.get("error").is_none());

    let mut err_out = Vec::new();
    write_result::<_, serde_json::Value>(&mut err_out, Err(step_failure(2))).unwrap();
    let err: serde_json::Value = serde_json::from_slice(&err_out).unwrap();
    assert_eq!(err["success"], false);
    assert_eq!(err["error"]["code"], "step.command_failed");
    assert!(err.get("data").is_none());
}

struct ClosedPipe;

impl std::io::Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn write_result_ignores_closed_pipe() {
    assert!(write_result(&mut ClosedPipe, Ok("done")).is_ok());
}
