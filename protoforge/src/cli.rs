use clap::{Parser, Subcommand};

/// protoforge - forge-and-run execution gateway for agent prototypes
#[derive(Parser, Debug)]
#[command(name = "protoforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP (Model Context Protocol) server over stdio
    ///
    /// Implements the standard MCP JSON-RPC 2.0 protocol and exposes one
    /// tool: forge_and_run. Used by Cursor, VSCode, and other MCP clients.
    Mcp,

    /// Forge and run a script once, printing the execution report
    ///
    /// Reads the code from a file (or stdin with "-"), materializes it into
    /// a fresh workspace under the root, and executes it via `uv run`.
    Run {
        /// Path to the script file, or "-" to read code from stdin
        #[arg(value_name = "SCRIPT")]
        script: String,

        /// Purpose label used in the workspace directory name
        #[arg(long, default_value = "cli_run")]
        purpose: String,

        /// Execution timeout in seconds (default: from env or 180)
        #[arg(long)]
        timeout: Option<u64>,
    },
}
