//! Social feed server library
//!
//! Posts, a per-user like toggle with a denormalized like counter, and the
//! notification queue fed by like events.

pub mod background_jobs;
pub mod config;
pub mod feed_store;
pub mod likes;
pub mod notifications;
pub mod posts;
pub mod server;
pub mod sqlite_persistence;

pub use feed_store::SqliteFeedStore;
pub use likes::{LikeToggleCoordinator, ToggleError, ToggleStatus};
pub use notifications::NotificationDispatcher;
pub use server::{run_server, RequestsLoggingLevel};
