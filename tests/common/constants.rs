//! Shared constants for end-to-end tests

/// Author of the posts created by tests
pub const POST_OWNER: &str = "alice";

/// User who likes other users' posts
pub const LIKER: &str = "bob";

/// Second liker, for multi-user scenarios
pub const OTHER_LIKER: &str = "carol";

pub const REQUEST_TIMEOUT_SECS: u64 = 5;

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Notifications are written asynchronously; tests poll up to this long.
pub const NOTIFICATION_WAIT_TIMEOUT_MS: u64 = 3000;

pub const NOTIFICATION_POLL_INTERVAL_MS: u64 = 20;
