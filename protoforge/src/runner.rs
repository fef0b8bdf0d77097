//! External script runner: `uv` resolution, spawn, and timeout enforcement.
//!
//! The runner is the one injectable collaborator of the gateway. Production
//! code uses [`UvRunner`]; tests substitute a fake so no process is spawned.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Poll interval for the child-exit loop.
const POLL_INTERVAL_MS: u64 = 100;

/// Captured result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runner failures the gateway distinguishes when rendering its response.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("'uv' executable not found in PATH")]
    NotFound,
    #[error("execution timed out ({0}s)")]
    Timeout(u64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Executes a persisted script and captures its output.
///
/// `extra_env` is added on top of the inherited environment; `cwd` becomes
/// the child's working directory.
pub trait ScriptRunner {
    fn run(
        &self,
        script_path: &Path,
        cwd: &Path,
        extra_env: &[(String, String)],
        timeout: Duration,
    ) -> Result<RunOutcome, RunnerError>;
}

/// Production runner: `uv run <script>`. `uv` resolves any inline-declared
/// (PEP 723) dependencies itself; we treat it as an opaque interpreter.
pub struct UvRunner;

impl UvRunner {
    /// Locate `uv` on the search path. Resolution happens per call so an
    /// install made after server startup is picked up.
    fn resolve() -> Option<PathBuf> {
        find_in_path("uv")
    }
}

impl ScriptRunner for UvRunner {
    fn run(
        &self,
        script_path: &Path,
        cwd: &Path,
        extra_env: &[(String, String)],
        timeout: Duration,
    ) -> Result<RunOutcome, RunnerError> {
        let uv = Self::resolve().ok_or(RunnerError::NotFound)?;

        let cwd_str = cwd.to_string_lossy();
        let script_str = script_path.to_string_lossy();
        crate::observability::audit_execution_started(
            cwd_str.as_ref(),
            uv.to_string_lossy().as_ref(),
            &["run", script_str.as_ref()],
            cwd_str.as_ref(),
        );

        let mut cmd = Command::new(&uv);
        cmd.arg("run")
            .arg(script_path)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn {}: {}", uv.display(), e))?;

        wait_with_timeout(&mut child, timeout)
    }
}

/// Search PATH entries for an executable with the given name.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Wait for the child with a wall-clock timeout, capturing stdout/stderr.
///
/// Output is drained in background threads while the process runs: a child
/// writing more than the pipe buffer (~64KB) would otherwise block on write
/// and deadlock the wait loop. On timeout the child is killed and reaped.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<RunOutcome, RunnerError> {
    let start = Instant::now();

    let stdout_handle = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut s = String::new();
            let _ = out.read_to_string(&mut s);
            s
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut s = String::new();
            let _ = err.read_to_string(&mut s);
            s
        })
    });

    let join = |handle: Option<thread::JoinHandle<String>>| {
        handle.map(|h| h.join().unwrap_or_default()).unwrap_or_default()
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(RunOutcome {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: join(stdout_handle),
                    stderr: join(stderr_handle),
                });
            }
            Ok(None) => {}
            Err(e) => {
                let _ = join(stdout_handle);
                let _ = join(stderr_handle);
                return Err(anyhow::anyhow!("Failed to wait for process: {}", e).into());
            }
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = join(stdout_handle);
            let _ = join(stderr_handle);
            return Err(RunnerError::Timeout(timeout.as_secs()));
        }

        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_captures_output_and_exit_code() {
        let mut child = spawn_sh("echo out; echo err >&2; exit 3");
        let outcome = wait_with_timeout(&mut child, Duration::from_secs(10)).unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_times_out_and_kills() {
        let mut child = spawn_sh("sleep 30");
        let start = Instant::now();
        let err = wait_with_timeout(&mut child, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout(1)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_drains_large_output() {
        // 256KB, well past the pipe buffer
        let mut child = spawn_sh("head -c 262144 /dev/zero | tr '\\0' 'x'");
        let outcome = wait_with_timeout(&mut child, Duration::from_secs(30)).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.len(), 262144);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RunnerError::NotFound.to_string(),
            "'uv' executable not found in PATH"
        );
        assert_eq!(
            RunnerError::Timeout(180).to_string(),
            "execution timed out (180s)"
        );
    }

    #[test]
    fn test_find_in_path_missing() {
        assert!(find_in_path("definitely-not-a-real-binary-xyz").is_none());
    }
}
