//! User-facing notifications.
//!
//! The session store and the classroom service report outcomes the user
//! should see (sign-in failures, a profile that could not be created) as
//! `Notification`s. The terminal client subscribes and shows them as toasts.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffer size for the notification channel.
/// A burst of notifications comes from one user action, so 64 is plenty.
const NOTIFICATION_BUFFER_SIZE: usize = 64;

/// How long a toast stays on screen.
pub const TOAST_LIFETIME_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(TOAST_LIFETIME_SECS)
    }
}

/// Cloneable handle for publishing notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_BUFFER_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        debug!(title = %notification.title, kind = ?notification.kind, "Notification");
        // No subscribers is fine; the message is simply dropped.
        let _ = self.tx.send(notification);
    }

    pub fn success(&self, title: &str, description: &str) {
        self.publish(Notification::new(
            NotificationKind::Success,
            title,
            Some(description.to_string()),
        ));
    }

    pub fn error(&self, title: &str, description: &str) {
        self.publish(Notification::new(
            NotificationKind::Error,
            title,
            Some(description.to_string()),
        ));
    }

    pub fn info(&self, title: &str, description: &str) {
        self.publish(Notification::new(
            NotificationKind::Info,
            title,
            Some(description.to_string()),
        ));
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
