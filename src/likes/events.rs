use serde::{Deserialize, Serialize};

pub const POST_LIKED_EVENT: &str = "post.liked";

/// Emitted once per winning like insert on someone else's post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLikedEvent {
    pub post_id: String,
    pub liker_user_id: String,
    pub post_owner_id: String,
}

impl PostLikedEvent {
    /// Payload carried by the notification queued for the post owner.
    pub fn notification_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "post_id": self.post_id,
            "liker_user_id": self.liker_user_id,
        })
    }
}

/// One-way hand-off for like side effects.
///
/// `emit` must not block and must not fail from the caller's point of view:
/// implementations log and drop what they cannot deliver.
pub trait LikeEventSink: Send + Sync {
    fn emit(&self, event: PostLikedEvent);
}
