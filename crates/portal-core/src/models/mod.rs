pub mod feed_item;
pub mod feed_state;
pub mod identity;

pub use feed_item::{FeedItem, LikeDelta};
pub use feed_state::{CanonicalFeedState, FeedAccount, FetchOutcome};
pub use identity::Identity;
