use super::models::{Like, LikeDeleteOutcome, LikeInsertOutcome};
use anyhow::Result;

/// Durable set of (user, post) like facts, unique per pair.
///
/// Insert and delete are single constrained writes. Callers take no locks: a
/// conflicting concurrent write surfaces as `AlreadyExists` / `NotFound`, not as
/// an error.
pub trait LikeStore: Send + Sync {
    /// Point lookup, no side effects.
    fn like_exists(&self, user_id: &str, post_id: &str) -> Result<bool>;

    /// Creates the like fact.
    /// Returns Ok(AlreadyExists) if the pair is already present.
    /// Returns Err for any other failure, including a missing post.
    fn insert_like(&self, user_id: &str, post_id: &str) -> Result<LikeInsertOutcome>;

    /// Removes the like fact.
    /// Returns Ok(NotFound) if the pair was not present.
    fn delete_like(&self, user_id: &str, post_id: &str) -> Result<LikeDeleteOutcome>;

    /// Number of live like facts for the post.
    fn count_post_likes(&self, post_id: &str) -> Result<usize>;

    /// Live like facts for the post, oldest first.
    fn get_post_likes(&self, post_id: &str) -> Result<Vec<Like>>;
}
