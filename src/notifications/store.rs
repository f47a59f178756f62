//! Notification storage trait

use anyhow::Result;

use super::models::{NotificationKind, PendingNotification};

/// Trait for notification storage operations
pub trait NotificationStore: Send + Sync {
    /// Appends a notification for `recipient_user_id`.
    /// Returns the created notification with its ID and timestamp set.
    fn enqueue(
        &self,
        recipient_user_id: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<PendingNotification>;

    /// Get a user's notifications, newest first.
    fn get_user_notifications(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PendingNotification>>;

    /// Total number of notifications for a user, read or not.
    fn count_user_notifications(&self, user_id: &str) -> Result<usize>;

    /// Mark a notification as read. Returns the updated notification.
    /// Returns None if notification doesn't exist or doesn't belong to user.
    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<PendingNotification>>;

    /// Get count of unread notifications for a user.
    fn get_unread_count(&self, user_id: &str) -> Result<usize>;
}
