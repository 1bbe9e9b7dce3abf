//! # readgate
//!
//! Command-line entry point for the read-before-write MCP gateway.
//!
//! - `readgate serve [-- <delegate cmd>]`: run the MCP server on stdio
//! - `readgate tools`: print the gated tool catalog
//! - `readgate audit verify/tail`: inspect the decision log
//! - `readgate replay <file> [-- <delegate cmd>]`: rerun a tool-call transcript
//!
//! Typically launched by an MCP client, e.g. in `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "code-mode-rules": {
//!       "type": "stdio",
//!       "command": "readgate",
//!       "args": ["serve", "--", "npx", "-y", "your-filesystem-mcp-server", "."]
//!     }
//!   }
//! }
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rg_mcp_gateway::GatewayConfig;
use tracing_subscriber::EnvFilter;

/// Read-before-write gate for agent file edits.
#[derive(Parser)]
#[command(name = "readgate", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdio.
    Serve {
        /// Delegate filesystem server command, overriding the config file.
        #[arg(last = true)]
        delegate: Vec<String>,
    },
    /// Print the gated tool catalog as JSON.
    Tools,
    /// Inspect the decision log.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
    /// Run a JSONL transcript of tool calls through a fresh gate.
    Replay {
        /// File with one `{"name": .., "arguments": {..}}` object per line.
        transcript: PathBuf,
        /// Delegate filesystem server command, overriding the config file.
        #[arg(last = true)]
        delegate: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interfere with MCP on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rg_gate=info".parse()?)
                .add_directive("rg_mcp_gateway=info".parse()?)
                .add_directive("readgate=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = GatewayConfig::load(&project_root)?;

    match cli.command {
        Commands::Serve { delegate } => {
            commands::serve::execute(config.with_delegate_command(delegate))
        }
        Commands::Tools => commands::tools::execute(),
        Commands::Audit { command } => commands::audit::execute(&command, &config),
        Commands::Replay {
            transcript,
            delegate,
        } => commands::replay::execute(&transcript, config.with_delegate_command(delegate)),
    }
}
