mod schema;
mod sqlite_feed_store;

pub use sqlite_feed_store::SqliteFeedStore;
