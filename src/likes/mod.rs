//! Like toggling: the per-user-per-post relation, its paired counter deltas and
//! the `post.liked` side effect.

mod events;
mod like_store;
mod models;
mod toggle;

pub use events::{LikeEventSink, PostLikedEvent, POST_LIKED_EVENT};
pub use like_store::LikeStore;
pub use models::{Like, LikeDeleteOutcome, LikeInsertOutcome, ToggleStatus};
pub use toggle::{LikeToggleCoordinator, ToggleError};
