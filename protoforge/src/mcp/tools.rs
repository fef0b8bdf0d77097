//! MCP tool definitions — the single tool exposed by the server.

use serde_json::{json, Value};

pub(super) fn tool_definitions() -> Vec<Value> {
    vec![json!({
        "name": "forge_and_run",
        "description": "Synthesize a standalone Python prototype in an isolated workspace and execute it immediately via `uv run`. The code must be self-contained; declare external libraries with PEP 723 inline script metadata (`# /// script` block). Scripts should save generated artifacts (CSV, plots, logs) into the directory given by the PROTOTYPE_OUTPUT_DIR environment variable. Returns an execution report with the workspace path, exit status, stdout, stderr, and generated artifact names.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Complete Python source code to execute. Must be self-contained; use PEP 723 inline metadata for dependencies."
                },
                "purpose": {
                    "type": "string",
                    "description": "Concise description of the prototype's objective. Sanitized and used in the workspace directory name for traceability."
                }
            },
            "required": ["code", "purpose"]
        }
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tool_with_required_args() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "forge_and_run");
        let required = tools[0]["inputSchema"]["required"].as_array().unwrap();
        assert_eq!(required, &[json!("code"), json!("purpose")]);
    }
}
