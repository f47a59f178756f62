use serde::{Deserialize, Serialize};

/// A live (user, post) like fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: String,
    pub post_id: String,
    pub created_at: i64,
}

/// Result of trying to create a like fact.
///
/// `AlreadyExists` means the uniqueness constraint rejected the write: some
/// other request already holds the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeInsertOutcome {
    Created,
    AlreadyExists,
}

/// Result of trying to remove a like fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDeleteOutcome {
    Deleted,
    NotFound,
}

/// State of the relation after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStatus {
    Liked,
    Unliked,
}

impl ToggleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleStatus::Liked => "liked",
            ToggleStatus::Unliked => "unliked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ToggleStatus::Liked).unwrap(),
            "\"liked\""
        );
        assert_eq!(
            serde_json::to_string(&ToggleStatus::Unliked).unwrap(),
            "\"unliked\""
        );
        assert_eq!(ToggleStatus::Unliked.as_str(), "unliked");
    }
}
