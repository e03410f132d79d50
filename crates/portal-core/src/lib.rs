pub mod actions;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod remote;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;

// Re-export the composition root and its vocabulary at crate root for convenience
pub use actions::{ActionKey, ActionOutcome};
pub use config::{CoreConfig, FeedTarget};
pub use error::FeedError;
pub use events::{FeedEvent, Notice, NoticeLevel};
pub use models::{CanonicalFeedState, FeedAccount, FeedItem, Identity, LikeDelta};
pub use runtime::FeedRuntime;
pub use session::{SessionManager, SessionState, StaticWallet, WalletProvider};
pub use store::{AccountState, Projection, VisibleItem};
