//! Notification sink seam.
//!
//! Notifications are fire-and-forget: a sink failure must never roll back
//! a financial decision, so the trait cannot return an error at all and
//! implementations deal with their own delivery problems.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use prexo_shared::types::{OwnerId, TransactionId};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// A transaction was recorded or settled.
    Transaction,
    /// A refund credit reached the wallet.
    Refund,
    /// An administrator decision landed.
    Approval,
}

/// Delivery priority hint for downstream channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Routine updates.
    Normal,
    /// Money moved unexpectedly (refunds, failures).
    High,
}

/// An outbound user notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Who to notify.
    pub owner_id: OwnerId,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// What the notification is about.
    pub category: NotificationCategory,
    /// The transaction this relates to, if any.
    pub transaction_id: Option<TransactionId>,
    /// Delivery priority hint.
    pub priority: NotificationPriority,
}

/// Abstract delivery channel for user notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers (or queues) a notification. Must not fail the caller.
    async fn notify(&self, notification: Notification);
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for std::sync::Arc<T> {
    async fn notify(&self, notification: Notification) {
        (**self).notify(notification).await
    }
}

/// Sink that emits notifications as structured tracing events.
///
/// The default for deployments where real delivery (push/SMS/email) is
/// handled by a separate service consuming the logs or a queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, notification: Notification) {
        info!(
            owner_id = %notification.owner_id,
            category = ?notification.category,
            priority = ?notification.priority,
            transaction_id = ?notification.transaction_id.map(|id| id.to_string()),
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
    }
}
