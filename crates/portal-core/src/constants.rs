//! Application-wide constants
//!
//! Centralized location for defaults shared by the core library and the CLI.

/// Program identifier the feed ledger is deployed under
pub const DEFAULT_PROGRAM_ID: &str = "PoRTa1Feed1111111111111111111111111111111111";

/// Default ledger endpoint (local ledger server started with `portal-cli serve`)
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8899";

/// Default bind address for the ledger server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8899";

/// Seed mixed into the program id when deriving the shared feed account address
pub const FEED_ACCOUNT_SEED: &str = "portal-feed";

// Ledger HTTP routes
pub mod routes {
    /// Fetch the feed account (POST, JSON body)
    pub const FETCH_ACCOUNT: &str = "/v1/accounts/fetch";
    /// Submit a signed instruction (POST, JSON body)
    pub const SEND_INSTRUCTION: &str = "/v1/instructions";
}

/// Links preloaded by `portal-cli demo`
pub const DEMO_LINKS: [&str; 4] = [
    "https://media.giphy.com/media/LqW9dLVjQm3cs/giphy.gif",
    "https://media.giphy.com/media/USORjkHBNBxD6rlO0I/giphy.gif",
    "https://media.giphy.com/media/l0HlQs07WAV67eEog/giphy.gif",
    "https://media.giphy.com/media/3ohs88j0jPszpGCbYY/giphy.gif",
];
