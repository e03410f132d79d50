use crate::actions::ActionKey;

/// Errors surfaced by session, store and action operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("Wallet authorization refused: {reason}")]
    AuthRefused { reason: String },
    #[error("Wallet connection already in progress")]
    ConnectInProgress,
    #[error("Not connected to a wallet")]
    NotConnected,
    #[error("Feed account is not initialized")]
    AccountUninitialized,
    #[error("Remote call {operation} failed: {message}")]
    RemoteCallFailed {
        operation: &'static str,
        message: String,
    },
    #[error("Another {key} is still in flight, try again shortly")]
    ConcurrentActionRejected { key: ActionKey },
    #[error("Link cannot be empty")]
    EmptyLink,
    #[error("No feed item with link {link}")]
    UnknownItem { link: String },
    #[error("Invalid wallet address: {value:?}")]
    InvalidIdentity { value: String },
}

impl FeedError {
    pub(crate) fn remote(operation: &'static str, err: impl std::fmt::Display) -> Self {
        FeedError::RemoteCallFailed {
            operation,
            message: err.to_string(),
        }
    }

    /// Failures that go away if the user simply tries again later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::RemoteCallFailed { .. }
                | FeedError::ConcurrentActionRejected { .. }
                | FeedError::ConnectInProgress
        )
    }

    /// Failures caused by the request itself rather than the remote side.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FeedError::EmptyLink
                | FeedError::UnknownItem { .. }
                | FeedError::InvalidIdentity { .. }
                | FeedError::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_is_transient_not_user_error() {
        let err = FeedError::ConcurrentActionRejected {
            key: ActionKey::LikeToggle("x".to_string()),
        };
        assert!(err.is_transient());
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("try again shortly"));
    }

    #[test]
    fn test_remote_failure_message() {
        let err = FeedError::remote("submit_add_item", "connection reset");
        assert_eq!(
            err.to_string(),
            "Remote call submit_add_item failed: connection reset"
        );
        assert!(err.is_transient());
    }
}
