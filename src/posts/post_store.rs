use super::models::Post;
use anyhow::Result;

pub trait PostStore: Send + Sync {
    /// Creates a new post owned by `owner_id` with a zero like counter.
    fn create_post(&self, owner_id: &str, content: &str) -> Result<Post>;

    /// Returns the post with the given id.
    /// Returns Ok(None) if the post does not exist.
    /// Returns Err if there is a database error.
    fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    /// Returns posts ordered by creation time, newest first.
    fn get_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>>;

    /// Total number of posts.
    fn count_posts(&self) -> Result<usize>;

    /// Adds one to the post's like counter with a single storage-side update.
    /// Returns Err if the post does not exist.
    fn increment_like_count(&self, post_id: &str) -> Result<()>;

    /// Subtracts one from the post's like counter with a single storage-side update.
    /// Returns Err if the post does not exist.
    fn decrement_like_count(&self, post_id: &str) -> Result<()>;

    /// Recomputes every like counter that disagrees with the like relation.
    /// Returns the number of posts whose counter was repaired.
    fn reconcile_like_counts(&self) -> Result<usize>;
}
