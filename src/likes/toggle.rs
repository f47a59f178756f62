//! Like toggle coordinator.
//!
//! The relation store's uniqueness constraint decides who won a race. The
//! `like_exists` lookup is only a hint for which write to attempt; the outcome of
//! that write decides the reported status. Counter deltas and the `post.liked`
//! event are tied one-to-one to the write that actually changed the relation,
//! so the counter equals the number of live like facts under any interleaving.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::posts::{Post, PostStore};
use crate::server::metrics;

use super::events::{LikeEventSink, PostLikedEvent};
use super::like_store::LikeStore;
use super::models::{Like, LikeDeleteOutcome, LikeInsertOutcome, ToggleStatus};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Post with ID {0} not found")]
    PostNotFound(String),

    /// The relation write committed but the paired counter delta did not.
    /// The counter stays off by one until reconciliation repairs it.
    #[error("Like counter update failed for post {post_id}: {source}")]
    CounterUpdateFailed {
        post_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub struct LikeToggleCoordinator {
    post_store: Arc<dyn PostStore>,
    like_store: Arc<dyn LikeStore>,
    event_sink: Arc<dyn LikeEventSink>,
}

impl LikeToggleCoordinator {
    pub fn new(
        post_store: Arc<dyn PostStore>,
        like_store: Arc<dyn LikeStore>,
        event_sink: Arc<dyn LikeEventSink>,
    ) -> Self {
        Self {
            post_store,
            like_store,
            event_sink,
        }
    }

    /// Flips the (user, post) like relation and reports the resulting state.
    ///
    /// A lost race is not an error: the returned status is whatever state the
    /// relation is in after this request's write attempt.
    pub fn toggle(&self, user_id: &str, post_id: &str) -> Result<ToggleStatus, ToggleError> {
        let post = self
            .post_store
            .get_post(post_id)?
            .ok_or_else(|| ToggleError::PostNotFound(post_id.to_string()))?;

        let liked_hint = self.like_store.like_exists(user_id, post_id)?;

        let status = if liked_hint {
            self.unlike(user_id, &post)?
        } else {
            self.like(user_id, &post)?
        };
        metrics::record_like_toggle(status.as_str());
        Ok(status)
    }

    /// Point-in-time membership check.
    pub fn has_user_liked_post(&self, user_id: &str, post_id: &str) -> anyhow::Result<bool> {
        self.like_store.like_exists(user_id, post_id)
    }

    /// Who currently likes the post, oldest like first.
    pub fn get_post_likes(&self, post_id: &str) -> anyhow::Result<Vec<Like>> {
        self.like_store.get_post_likes(post_id)
    }

    fn like(&self, user_id: &str, post: &Post) -> Result<ToggleStatus, ToggleError> {
        match self.like_store.insert_like(user_id, &post.id)? {
            LikeInsertOutcome::Created => {
                self.post_store
                    .increment_like_count(&post.id)
                    .map_err(|source| self.counter_failure(user_id, &post.id, source))?;

                if post.owner_id != user_id {
                    self.event_sink.emit(PostLikedEvent {
                        post_id: post.id.clone(),
                        liker_user_id: user_id.to_string(),
                        post_owner_id: post.owner_id.clone(),
                    });
                }

                info!("User: {} | Post: {} | Liked post", user_id, post.id);
                Ok(ToggleStatus::Liked)
            }
            LikeInsertOutcome::AlreadyExists => {
                // A concurrent insert won; it owns the increment and the event.
                debug!(
                    "User: {} | Post: {} | Like insert lost a race, already liked",
                    user_id, post.id
                );
                metrics::record_like_conflict("already_exists");
                Ok(ToggleStatus::Liked)
            }
        }
    }

    fn unlike(&self, user_id: &str, post: &Post) -> Result<ToggleStatus, ToggleError> {
        match self.like_store.delete_like(user_id, &post.id)? {
            LikeDeleteOutcome::Deleted => {
                self.post_store
                    .decrement_like_count(&post.id)
                    .map_err(|source| self.counter_failure(user_id, &post.id, source))?;

                info!("User: {} | Post: {} | Unliked post", user_id, post.id);
                Ok(ToggleStatus::Unliked)
            }
            LikeDeleteOutcome::NotFound => {
                // A concurrent delete won; it owns the decrement.
                debug!(
                    "User: {} | Post: {} | Like delete lost a race, already unliked",
                    user_id, post.id
                );
                metrics::record_like_conflict("not_found");
                Ok(ToggleStatus::Unliked)
            }
        }
    }

    fn counter_failure(&self, user_id: &str, post_id: &str, source: anyhow::Error) -> ToggleError {
        error!(
            "User: {} | Post: {} | Relation written but like counter update failed, counter drifts until reconciliation: {:#}",
            user_id, post_id, source
        );
        metrics::record_like_counter_failure();
        ToggleError::CounterUpdateFailed {
            post_id: post_id.to_string(),
            source,
        }
    }
}
