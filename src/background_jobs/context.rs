use crate::posts::PostStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared resources and the cancellation token handed to every job run.
#[derive(Clone)]
pub struct JobContext {
    pub cancellation_token: CancellationToken,
    pub post_store: Arc<dyn PostStore>,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken, post_store: Arc<dyn PostStore>) -> Self {
        Self {
            cancellation_token,
            post_store,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Same resources, with a token that is cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            cancellation_token: self.cancellation_token.child_token(),
            post_store: Arc::clone(&self.post_store),
        }
    }
}
