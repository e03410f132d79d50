pub mod commands;
pub mod config;
pub mod server;
pub mod tracing_setup;

pub use commands::{execute, run_command, run_demo, CommandReport, FeedCommand};
pub use config::PortalConfig;
pub use server::{router, run_server, LedgerServerState};
pub use tracing_setup::init_tracing;
