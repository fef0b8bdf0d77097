//! Configuration for protoforge
//!
//! All configuration is read from environment variables or CLI arguments.
//! No configuration file is used. Environment variable keys are centralized
//! here for consistency.

use std::env;
use std::path::PathBuf;

/// Environment variable key constants.
/// Use these when reading/writing env vars to avoid typos and enable refactoring.
pub mod env_keys {
    pub const PROTOFORGE_ROOT: &str = "PROTOFORGE_ROOT";
    pub const PROTOFORGE_TIMEOUT_SECS: &str = "PROTOFORGE_TIMEOUT_SECS";
    pub const PROTOFORGE_QUIET: &str = "PROTOFORGE_QUIET";
    pub const PROTOFORGE_LOG_LEVEL: &str = "PROTOFORGE_LOG_LEVEL";
    pub const PROTOFORGE_LOG_JSON: &str = "PROTOFORGE_LOG_JSON";
    pub const PROTOFORGE_AUDIT_LOG: &str = "PROTOFORGE_AUDIT_LOG";
}

/// Default execution timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Read an env var, treating empty values as unset.
fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Parse a boolean env var: 0/false/no/off are false, anything else is true.
fn env_bool(key: &str, default: bool) -> bool {
    match env_optional(key) {
        Some(s) => !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

/// Workspace root configuration.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Root directory under which per-call workspaces are created.
    pub root: PathBuf,
}

impl PathsConfig {
    /// `PROTOFORGE_ROOT`, or `~/.protoforge` when unset.
    pub fn from_env() -> Self {
        let root = env_optional(env_keys::PROTOFORGE_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".protoforge")
            });
        Self { root }
    }
}

/// Execution limits applied to the spawned script runner.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionConfig {
    /// Wall-clock timeout in seconds.
    pub timeout_secs: u64,
}

impl ExecutionConfig {
    pub fn from_env() -> Self {
        let timeout_secs = env_optional(env_keys::PROTOFORGE_TIMEOUT_SECS)
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { timeout_secs }
    }

    /// CLI flags take precedence over env vars.
    pub fn with_cli_override(mut self, timeout: Option<u64>) -> Self {
        if let Some(t) = timeout {
            self.timeout_secs = t;
        }
        self
    }
}

/// Observability configuration: quiet, log_level, log_json, audit_log.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(env_keys::PROTOFORGE_QUIET, false),
            log_level: env_optional(env_keys::PROTOFORGE_LOG_LEVEL)
                .unwrap_or_else(|| "protoforge=info".to_string()),
            log_json: env_bool(env_keys::PROTOFORGE_LOG_JSON, false),
            audit_log: env_optional(env_keys::PROTOFORGE_AUDIT_LOG),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_TIMEOUT_SECS, 180);
    }

    #[test]
    fn test_cli_override_wins() {
        let cfg = ExecutionConfig { timeout_secs: 180 }.with_cli_override(Some(5));
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn test_cli_override_none_keeps_value() {
        let cfg = ExecutionConfig { timeout_secs: 42 }.with_cli_override(None);
        assert_eq!(cfg.timeout_secs, 42);
    }
}
