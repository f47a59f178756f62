//! Notification data models

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Notification kind, stored and serialized as its dotted event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "post.liked")]
    PostLiked,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PostLiked => crate::likes::POST_LIKED_EVENT,
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post.liked" => Ok(NotificationKind::PostLiked),
            _ => bail!("Unknown notification kind: {}", s),
        }
    }
}

/// A queued notification for a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: String,
    pub recipient_user_id: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub read_at: Option<i64>,
    pub created_at: i64,
}
