//! MCP server for managed document databases.
//!
//! Run with `docstore-mcp` (projects from `DOCSTORE_PROJECTS`, credentials in
//! `creds/` next to the executable) or `docstore-mcp --memory` for in-memory
//! databases.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docstore_mcp::{McpServer, ProjectRegistry, Settings, CREDENTIALS_ENV, PROJECTS_ENV};

/// MCP server for managed document databases.
///
/// Exposes document CRUD and query operations as MCP tools for AI agents,
/// routing each call to one of several configured projects.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "docstore-mcp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Comma-separated project ids to register at startup.
    #[arg(long, env = PROJECTS_ENV, value_name = "IDS")]
    projects: Option<String>,

    /// Explicit credentials file, overriding per-project discovery.
    #[arg(long, env = CREDENTIALS_ENV, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Directory holding per-project credential files.
    /// Defaults to `creds/` next to the executable.
    #[arg(long, value_name = "DIR")]
    credentials_dir: Option<PathBuf>,

    /// Use an in-memory database per project instead of remote connections.
    /// Data is not persisted.
    #[arg(long)]
    memory: bool,

    /// Enable debug logging to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Set up logging; stdout belongs to the protocol.
    let directive = if args.verbose {
        "docstore_mcp=debug"
    } else {
        "docstore_mcp=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new(args.projects, args.credentials, args.credentials_dir);

    let registry = if args.memory {
        ProjectRegistry::in_memory(settings.projects.clone(), &settings.raw_projects)
    } else {
        match ProjectRegistry::initialize(&settings).await {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    };

    let server = McpServer::new(registry);
    if let Err(e) = server.run().await {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
