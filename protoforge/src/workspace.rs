//! Per-call workspace layout: naming, creation, script persistence, and
//! artifact listing.
//!
//! A workspace is `{root}/{timestamp}_{sanitized_purpose}/` holding the
//! script file and an `outputs/` directory the executed script writes
//! artifacts into. Workspaces are created fresh per call and never deleted.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed filename the code argument is persisted to.
pub const SCRIPT_FILE: &str = "script.py";

/// Name of the artifact directory inside each workspace.
pub const OUTPUTS_DIR: &str = "outputs";

/// Maximum length (in characters) of the sanitized purpose segment.
const MAX_PURPOSE_CHARS: usize = 30;

/// A materialized workspace for one forge_and_run call.
///
/// All paths are absolute: the script path is handed to a child process whose
/// cwd is the workspace itself, so a root-relative path would double-resolve.
#[derive(Debug)]
pub struct Workspace {
    pub dir: PathBuf,
    pub script_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Make a path absolute against the current directory, without touching the
/// filesystem.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Ensure the workspace root exists. Called once at startup.
pub fn ensure_root(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create workspace root: {}", root.display()))
}

/// Reduce a purpose string to a directory-name-safe label: keep alphanumerics,
/// spaces, and underscores; map spaces to underscores; truncate to 30 chars.
pub fn sanitize_purpose(purpose: &str) -> String {
    purpose
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_PURPOSE_CHARS)
        .collect()
}

/// Build the workspace directory name: `{YYYYmmdd_HHMMSS}_{sanitized}`.
///
/// Timestamp resolution is one second and there is no collision detection:
/// two calls in the same second with the same truncated purpose map to the
/// same directory, and the later script write wins.
pub fn workspace_name(purpose: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}", timestamp, sanitize_purpose(purpose))
}

/// Create the workspace directory and its outputs/ subdirectory, with parents.
pub fn create(root: &Path, purpose: &str) -> Result<Workspace> {
    let dir = absolutize(&root.join(workspace_name(purpose)));
    let output_dir = dir.join(OUTPUTS_DIR);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create workspace: {}", dir.display()))?;
    Ok(Workspace {
        script_path: dir.join(SCRIPT_FILE),
        dir,
        output_dir,
    })
}

/// Write the code verbatim to the workspace's script file.
pub fn write_script(workspace: &Workspace, code: &str) -> Result<()> {
    fs::write(&workspace.script_path, code).with_context(|| {
        format!("Failed to write script: {}", workspace.script_path.display())
    })
}

/// List artifact file names in the outputs directory, one level deep, sorted.
/// An unreadable or missing directory is reported as empty.
pub fn list_artifacts(output_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(output_dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_alnum_and_underscore() {
        assert_eq!(sanitize_purpose("fetch_data v2"), "fetch_data_v2");
    }

    #[test]
    fn test_sanitize_strips_disallowed_chars() {
        // "a/b" and "a_b" differ only in a disallowed character
        assert_eq!(sanitize_purpose("a/b"), "ab");
        assert_eq!(sanitize_purpose("a_b"), "a_b");
        assert_eq!(sanitize_purpose("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn test_sanitize_truncates_to_30_chars() {
        let long = "x".repeat(50);
        assert_eq!(sanitize_purpose(&long).chars().count(), 30);
    }

    #[test]
    fn test_sanitize_multibyte_is_char_based() {
        let purpose = "数".repeat(40);
        assert_eq!(sanitize_purpose(&purpose).chars().count(), 30);
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize_purpose(""), "");
        assert_eq!(sanitize_purpose("!@#$%"), "");
    }

    #[test]
    fn test_workspace_name_format() {
        let name = workspace_name("test run");
        // 15-char timestamp + separator + sanitized purpose
        assert!(name.ends_with("_test_run"));
        assert_eq!(name.len(), 15 + 1 + "test_run".len());
    }

    #[test]
    fn test_create_and_write_script() {
        let root = tempfile::tempdir().unwrap();
        let ws = create(root.path(), "demo").unwrap();
        assert!(ws.dir.is_dir());
        assert!(ws.output_dir.is_dir());

        write_script(&ws, "print('hi')").unwrap();
        let content = std::fs::read_to_string(&ws.script_path).unwrap();
        assert_eq!(content, "print('hi')");
    }

    #[test]
    fn test_create_with_relative_root_yields_absolute_paths() {
        let scratch = format!("target/ws_rel_root_{}", std::process::id());
        let ws = create(Path::new(&scratch), "rel").unwrap();
        assert!(ws.dir.is_absolute());
        assert!(ws.script_path.is_absolute());
        assert!(ws.output_dir.is_absolute());
        assert!(ws.output_dir.is_dir());
        let _ = std::fs::remove_dir_all(&scratch);
    }

    #[test]
    fn test_list_artifacts_sorted() {
        let root = tempfile::tempdir().unwrap();
        let ws = create(root.path(), "artifacts").unwrap();
        std::fs::write(ws.output_dir.join("b.csv"), "1").unwrap();
        std::fs::write(ws.output_dir.join("a.png"), "2").unwrap();
        assert_eq!(list_artifacts(&ws.output_dir), vec!["a.png", "b.csv"]);
    }

    #[test]
    fn test_list_artifacts_missing_dir_is_empty() {
        assert!(list_artifacts(Path::new("/nonexistent/outputs")).is_empty());
    }
}
