use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use portal_cli::cli::{
    init_tracing, run_command, run_server, FeedCommand, LedgerServerState, PortalConfig,
};
use portal_core::remote::MemoryLedger;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(about = "Shared link feed with optimistic likes")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (contains target, wallet, server)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Ledger endpoint, overrides the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Wallet address to act as, overrides the config file
    #[arg(long)]
    address: Option<String>,

    /// Debug logging on stderr (PORTAL_LOG takes precedence)
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ledger server
    Serve {
        /// Bind address, overrides the config file
        #[arg(long)]
        bind: Option<String>,
        /// Persist accounts to this JSON file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },

    /// Show the feed
    Feed,

    /// Initialize the feed account (once per program)
    Init,

    /// Submit a link
    Submit {
        link: String,
    },

    /// Like an item
    Like {
        link: String,
    },

    /// Remove a like
    Unlike {
        link: String,
    },

    /// Like or unlike depending on the current state
    Toggle {
        link: String,
    },

    /// Show an optimistic like settle against an in-process ledger
    Demo,
}

async fn serve(config: PortalConfig, bind: Option<String>, state_file: Option<PathBuf>) -> Result<()> {
    let bind = bind.unwrap_or(config.server.bind);
    let program_id = config.target.program_id;
    let state = match state_file.or(config.server.state_file) {
        Some(path) => LedgerServerState::with_state_file(program_id, path)?,
        None => LedgerServerState::new(Arc::new(MemoryLedger::new()), program_id),
    };
    run_server(&bind, state).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = PortalConfig::resolve(cli.config.as_deref())?
        .with_endpoint(cli.endpoint)
        .with_address(cli.address);

    let command = match cli.command {
        Commands::Serve { bind, state_file } => return serve(config, bind, state_file).await,
        Commands::Feed => FeedCommand::Feed,
        Commands::Init => FeedCommand::Init,
        Commands::Submit { link } => FeedCommand::Submit { link },
        Commands::Like { link } => FeedCommand::Like { link },
        Commands::Unlike { link } => FeedCommand::Unlike { link },
        Commands::Toggle { link } => FeedCommand::Toggle { link },
        Commands::Demo => FeedCommand::Demo,
    };
    run_command(&config, command, cli.pretty).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
