//! MCP (Model Context Protocol) server over stdio.
//!
//! Implements the standard MCP JSON-RPC 2.0 line protocol and exposes one
//! tool: `forge_and_run`.
//!
//! Protocol flow:
//!   1. Client sends `initialize` → server returns capabilities
//!   2. Client sends `notifications/initialized`
//!   3. Client sends `tools/list` → server returns the tool definition
//!   4. Client sends `tools/call` → server executes and returns the report

mod handlers;
mod tools;

use anyhow::Result;
use serde_json::{json, Value};
use std::io::{self, BufRead, BufReader, Read, Write};

use crate::gateway::Gateway;
use crate::runner::ScriptRunner;
use handlers::{handle_forge_and_run, handle_initialize};
use tools::tool_definitions;

/// Maximum JSON-RPC request size (10 MB) to prevent OOM from a hostile client.
const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

/// Read one line, enforcing [`MAX_REQUEST_SIZE`]. Returns `Ok(None)` on EOF.
/// An oversized line is discarded up to its newline and reported as an error.
fn read_line_limited<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let mut limited = reader.by_ref().take(MAX_REQUEST_SIZE as u64 + 1);
    let n = limited.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_REQUEST_SIZE {
        // Limit hit mid-line: drop the rest of the line
        skip_until_newline(reader);
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Request exceeds 10MB size limit",
        ));
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))
}

/// Discard bytes until a newline or EOF.
fn skip_until_newline(reader: &mut impl BufRead) {
    loop {
        let (done, used) = match reader.fill_buf() {
            Ok(buf) if buf.is_empty() => (true, 0),
            Ok(buf) => match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => (true, pos + 1),
                None => (false, buf.len()),
            },
            Err(_) => (true, 0),
        };
        reader.consume(used);
        if done {
            break;
        }
    }
}

/// Run the MCP server over stdio (JSON-RPC 2.0).
///
/// Entry point for `protoforge mcp`. Blocks until stdin EOF. Each `tools/call`
/// runs to completion before the next request is read.
pub fn serve_stdio<R: ScriptRunner>(gateway: &Gateway<R>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());

    loop {
        let line = match read_line_limited(&mut reader) {
            Ok(None) => break, // EOF
            Ok(Some(l)) => l,
            Err(e) => {
                send_error(&mut stdout, None, -32600, &format!("Request size error: {}", e))?;
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                send_error(&mut stdout, None, -32700, &format!("Parse error: {}", e))?;
                continue;
            }
        };

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or(json!({}));

        match method {
            "initialize" => {
                send_result(&mut stdout, id, handle_initialize(&params))?;
            }
            "notifications/initialized" | "initialized" => {
                // Notification — no response required
            }
            "ping" => {
                send_result(&mut stdout, id, json!({}))?;
            }
            "tools/list" => {
                send_result(&mut stdout, id, json!({ "tools": tool_definitions() }))?;
            }
            "tools/call" => {
                let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                let result = if tool_name == "forge_and_run" {
                    handle_forge_and_run(gateway, &arguments)
                } else {
                    Err(anyhow::anyhow!("Unknown tool: {}", tool_name))
                };

                let (text, is_error) = match result {
                    Ok(report) => (report, false),
                    Err(e) => (format!("Error: {}", e), true),
                };
                send_result(
                    &mut stdout,
                    id,
                    json!({
                        "content": [{"type": "text", "text": text}],
                        "isError": is_error
                    }),
                )?;
            }
            "resources/list" => {
                send_result(&mut stdout, id, json!({"resources": []}))?;
            }
            "prompts/list" => {
                send_result(&mut stdout, id, json!({"prompts": []}))?;
            }
            _ => {
                // Notifications (no id) are silently ignored per MCP spec
                if id.is_some() {
                    send_error(&mut stdout, id, -32601, &format!("Method not found: {}", method))?;
                }
            }
        }
    }

    Ok(())
}

/// Send a JSON-RPC 2.0 success response.
fn send_result(stdout: &mut io::Stdout, id: Option<Value>, result: Value) -> Result<()> {
    let resp = json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "result": result
    });
    writeln!(stdout, "{}", resp)?;
    stdout.flush()?;
    Ok(())
}

/// Send a JSON-RPC 2.0 error response.
fn send_error(stdout: &mut io::Stdout, id: Option<Value>, code: i64, message: &str) -> Result<()> {
    let resp = json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": {"code": code, "message": message}
    });
    writeln!(stdout, "{}", resp)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_limited_plain() {
        let mut reader = BufReader::new("hello\nworld\n".as_bytes());
        assert_eq!(read_line_limited(&mut reader).unwrap().unwrap(), "hello");
        assert_eq!(read_line_limited(&mut reader).unwrap().unwrap(), "world");
        assert!(read_line_limited(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_read_line_limited_strips_crlf() {
        let mut reader = BufReader::new("req\r\n".as_bytes());
        assert_eq!(read_line_limited(&mut reader).unwrap().unwrap(), "req");
    }

    #[test]
    fn test_read_line_limited_last_line_without_newline() {
        let mut reader = BufReader::new("tail".as_bytes());
        assert_eq!(read_line_limited(&mut reader).unwrap().unwrap(), "tail");
        assert!(read_line_limited(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_read_line_limited_rejects_oversized_and_resynchronizes() {
        let mut big = vec![b'x'; MAX_REQUEST_SIZE + 10];
        big.push(b'\n');
        big.extend_from_slice(b"next\n");
        let mut reader = BufReader::new(big.as_slice());
        assert!(read_line_limited(&mut reader).is_err());
        assert_eq!(read_line_limited(&mut reader).unwrap().unwrap(), "next");
    }
}
