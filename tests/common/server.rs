//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database, notification
//! dispatcher and random port.

use super::constants::*;
use social_feed_server::posts::PostStore;
use social_feed_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use social_feed_server::{LikeToggleCoordinator, NotificationDispatcher, SqliteFeedStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server shuts down and the temp database is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store for direct database access in tests
    pub store: Arc<SqliteFeedStore>,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port and waits until it answers.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteFeedStore::new(temp_db_dir.path().join("feed.db"))
                .expect("Failed to open feed store"),
        );

        let (dispatcher, _notification_worker) = NotificationDispatcher::spawn(store.clone(), 256);
        let coordinator = Arc::new(LikeToggleCoordinator::new(
            store.clone(),
            store.clone(),
            dispatcher,
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
        };
        let app = make_app(config, store.clone(), store.clone(), coordinator);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Creates a post directly in the store and returns its id.
    pub fn create_post(&self, owner_id: &str, content: &str) -> String {
        self.store
            .create_post(owner_id, content)
            .expect("Failed to create post")
            .id
    }

    /// Current denormalized like counter of a post.
    pub fn likes_count(&self, post_id: &str) -> i64 {
        self.store
            .get_post(post_id)
            .expect("Failed to load post")
            .expect("Post not found")
            .likes_count
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
