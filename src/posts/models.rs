use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    /// Denormalized count of live likes. The like relation is authoritative.
    pub likes_count: i64,
    pub created_at: i64,
}
