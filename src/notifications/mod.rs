//! Pending notifications: the durable queue written by like side effects and
//! the dispatcher that feeds it.

mod dispatcher;
mod models;
mod store;

pub use dispatcher::NotificationDispatcher;
pub use models::{NotificationKind, PendingNotification};
pub use store::NotificationStore;
