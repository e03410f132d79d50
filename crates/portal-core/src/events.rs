use tokio::sync::mpsc::UnboundedSender;

use crate::error::FeedError;
use crate::session::SessionState;

/// How loudly a notice should be shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message produced by a session or feed operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn from_error(err: &FeedError) -> Self {
        let level = match err {
            FeedError::AuthRefused { .. } => NoticeLevel::Error,
            FeedError::ConcurrentActionRejected { .. }
            | FeedError::ConnectInProgress
            | FeedError::AccountUninitialized => NoticeLevel::Info,
            _ => NoticeLevel::Warning,
        };
        Self {
            level,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    SessionChanged(SessionState),
    /// Canonical state or the pending overlay changed; re-read the projection.
    ProjectionChanged,
    Notice(Notice),
}

/// Sending half of the event channel. Sends never fail from the caller's view:
/// a dropped receiver just means nobody is listening.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<FeedEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<FeedEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn send(&self, event: FeedEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn projection_changed(&self) {
        self.send(FeedEvent::ProjectionChanged);
    }

    pub fn notice(&self, notice: Notice) {
        self.send(FeedEvent::Notice(notice));
    }

    pub fn error(&self, err: &FeedError) {
        self.notice(Notice::from_error(err));
    }
}
