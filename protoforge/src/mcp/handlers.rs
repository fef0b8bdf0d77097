//! MCP request handlers: initialize and the forge_and_run tool call.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::gateway::Gateway;
use crate::runner::ScriptRunner;

/// Handle the `initialize` request.
pub(super) fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": "protoforge",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Handle the `forge_and_run` tool call. The gateway renders every runtime
/// failure into the report text, so the only `Err` here is a missing argument.
pub(super) fn handle_forge_and_run<R: ScriptRunner>(
    gateway: &Gateway<R>,
    arguments: &Value,
) -> Result<String> {
    let code = arguments
        .get("code")
        .and_then(|v| v.as_str())
        .context("code is required")?;
    let purpose = arguments
        .get("purpose")
        .and_then(|v| v.as_str())
        .context("purpose is required")?;

    Ok(gateway.forge_and_run(code, purpose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunOutcome, RunnerError};
    use std::path::Path;
    use std::time::Duration;

    struct EchoRunner;

    impl ScriptRunner for EchoRunner {
        fn run(
            &self,
            _script_path: &Path,
            _cwd: &Path,
            _extra_env: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RunOutcome, RunnerError> {
            Ok(RunOutcome {
                exit_code: 0,
                stdout: "ran\n".to_string(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_initialize_shape() {
        let result = handle_initialize(&json!({}));
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "protoforge");
    }

    #[test]
    fn test_missing_code_is_err() {
        let root = tempfile::tempdir().unwrap();
        let gw = Gateway::new(root.path().to_path_buf(), EchoRunner, Duration::from_secs(1));
        let err = handle_forge_and_run(&gw, &json!({"purpose": "p"})).unwrap_err();
        assert!(err.to_string().contains("code is required"));
    }

    #[test]
    fn test_missing_purpose_is_err() {
        let root = tempfile::tempdir().unwrap();
        let gw = Gateway::new(root.path().to_path_buf(), EchoRunner, Duration::from_secs(1));
        let err = handle_forge_and_run(&gw, &json!({"code": "print(1)"})).unwrap_err();
        assert!(err.to_string().contains("purpose is required"));
    }

    #[test]
    fn test_dispatches_to_gateway() {
        let root = tempfile::tempdir().unwrap();
        let gw = Gateway::new(root.path().to_path_buf(), EchoRunner, Duration::from_secs(1));
        let report =
            handle_forge_and_run(&gw, &json!({"code": "print(1)", "purpose": "demo"})).unwrap();
        assert!(report.contains("📊 Status: Success"));
        assert!(report.contains("ran"));
    }
}
