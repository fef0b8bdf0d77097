//! Execution Gateway: the forge_and_run pipeline.
//!
//! One linear sequence per call: derive a workspace name, create the
//! directories, persist the code, hand off to the script runner, and render
//! the outcome as a text report. Every failure is rendered into the response
//! string; the tool surface itself never errors.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::{ExecutionConfig, PathsConfig};
use crate::runner::{RunOutcome, RunnerError, ScriptRunner, UvRunner};
use crate::workspace::{self, Workspace};

/// Env var the child process receives with the absolute path of its
/// dedicated artifact directory. Placement there is a convention the
/// executed script is expected (not forced) to follow.
pub const OUTPUT_DIR_ENV: &str = "PROTOTYPE_OUTPUT_DIR";

pub struct Gateway<R: ScriptRunner> {
    root: PathBuf,
    runner: R,
    timeout: Duration,
}

impl Gateway<UvRunner> {
    /// Build the production gateway from env config, ensuring the root
    /// directory exists.
    pub fn from_env(timeout_override: Option<u64>) -> anyhow::Result<Self> {
        let paths = PathsConfig::from_env();
        let exec = ExecutionConfig::from_env().with_cli_override(timeout_override);
        workspace::ensure_root(&paths.root)?;
        Ok(Self::new(paths.root, UvRunner, Duration::from_secs(exec.timeout_secs)))
    }
}

impl<R: ScriptRunner> Gateway<R> {
    pub fn new(root: PathBuf, runner: R, timeout: Duration) -> Self {
        Self { root, runner, timeout }
    }

    /// Materialize `code` into a fresh workspace, execute it, and return the
    /// report. Infallible at this surface: runner failures become the fixed
    /// error strings, everything else a structured report.
    pub fn forge_and_run(&self, code: &str, purpose: &str) -> String {
        match self.run_pipeline(code, purpose) {
            Ok(report) => report,
            Err(RunnerError::NotFound) => {
                tracing::warn!("uv not found in PATH");
                "❌ Error: 'uv' executable not found in PATH.".to_string()
            }
            Err(RunnerError::Timeout(secs)) => {
                tracing::warn!(timeout_secs = secs, "execution timed out");
                format!("❌ Error: Execution timed out ({}s).", secs)
            }
            Err(RunnerError::Other(e)) => {
                tracing::error!(error = %e, "execution failed");
                format!("❌ System Error: {}", e)
            }
        }
    }

    fn run_pipeline(&self, code: &str, purpose: &str) -> Result<String, RunnerError> {
        let ws = workspace::create(&self.root, purpose).map_err(RunnerError::Other)?;
        workspace::write_script(&ws, code).map_err(RunnerError::Other)?;
        tracing::info!(workspace = %ws.dir.display(), "workspace created");

        // The script is on disk before the runner is resolved; a missing
        // runner leaves it behind, matching the no-cleanup contract.
        // Workspace paths are absolute (workspace::create), so the child sees
        // a usable artifact path regardless of its cwd.
        let extra_env = vec![(
            OUTPUT_DIR_ENV.to_string(),
            ws.output_dir.to_string_lossy().to_string(),
        )];

        let started = Instant::now();
        let outcome = self
            .runner
            .run(&ws.script_path, &ws.dir, &extra_env, self.timeout)?;
        let duration_ms = started.elapsed().as_millis() as u64;

        crate::observability::audit_execution_completed(
            &ws.dir.to_string_lossy(),
            outcome.exit_code,
            duration_ms,
            outcome.stdout.len(),
        );
        tracing::info!(
            exit_code = outcome.exit_code,
            duration_ms,
            "execution finished"
        );

        Ok(render_report(&ws, &outcome))
    }
}

/// Assemble the multi-line execution report.
fn render_report(ws: &Workspace, outcome: &RunOutcome) -> String {
    let status = if outcome.exit_code == 0 {
        "Success".to_string()
    } else {
        format!("Failed (Exit Code: {})", outcome.exit_code)
    };

    let mut report = vec![
        format!("🚀 Prototype Directory Created: {}", ws.dir.display()),
        format!("📊 Status: {}", status),
        "\n[Standard Output]".to_string(),
        if outcome.stdout.is_empty() {
            "(No output)".to_string()
        } else {
            outcome.stdout.clone()
        },
    ];

    if !outcome.stderr.is_empty() {
        report.push(format!("\n[Standard Error]\n{}", outcome.stderr));
    }

    let artifacts = workspace::list_artifacts(&ws.output_dir);
    if !artifacts.is_empty() {
        report.push(format!("\n📁 Generated Artifacts in outputs/: {:?}", artifacts));
    }

    report.join("\n")
}
