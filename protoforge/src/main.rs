mod cli;
mod config;
mod gateway;
mod mcp;
mod observability;
mod runner;
mod workspace;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;

use cli::{Cli, Commands};
use gateway::Gateway;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Mcp => {
            let gateway = Gateway::from_env(None)?;
            mcp::serve_stdio(&gateway)?;
        }
        Commands::Run {
            script,
            purpose,
            timeout,
        } => {
            let code = if script == "-" {
                let mut s = String::new();
                std::io::stdin()
                    .read_to_string(&mut s)
                    .context("Failed to read code from stdin")?;
                s
            } else {
                std::fs::read_to_string(&script)
                    .with_context(|| format!("Failed to read script: {}", script))?
            };
            let gateway = Gateway::from_env(timeout)?;
            println!("{}", gateway.forge_and_run(&code, &purpose));
        }
    }

    Ok(())
}
