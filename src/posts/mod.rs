//! Posts: the subset of post data the like subsystem relies on, plus the thin
//! create/list pass-throughs.

mod models;
mod post_store;

pub use models::Post;
pub use post_store::PostStore;
