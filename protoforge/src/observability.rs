//! Observability: tracing init and the execution audit log.
//!
//! Uses config::ObservabilityConfig for PROTOFORGE_QUIET, LOG_LEVEL, AUDIT_LOG.
//! All diagnostics go to stderr or a file; stdout is reserved for the MCP
//! JSON-RPC channel.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call once at process startup.
/// When PROTOFORGE_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "protoforge=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };
}

fn audit_path() -> Option<String> {
    let path = crate::config::ObservabilityConfig::from_env().audit_log.clone()?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

/// Audit: execution_started (right before spawn).
pub fn audit_execution_started(workspace: &str, cmd: &str, args: &[&str], cwd: &str) {
    if let Some(path) = audit_path() {
        let record = json!({
            "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": "execution_started",
            "workspace": workspace,
            "cmd": cmd,
            "args": args,
            "cwd": cwd,
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: execution_completed.
pub fn audit_execution_completed(workspace: &str, exit_code: i32, duration_ms: u64, stdout_len: usize) {
    if let Some(path) = audit_path() {
        let record = json!({
            "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": "execution_completed",
            "workspace": workspace,
            "exit_code": exit_code,
            "duration_ms": duration_ms,
            "stdout_len": stdout_len,
            "success": exit_code == 0,
        });
        append_jsonl(&path, &record);
    }
}
