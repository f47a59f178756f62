//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer, LIKER};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_toggle_like() {
//!     let server = TestServer::spawn().await;
//!     let post_id = server.create_post("alice", "hello");
//!     let client = TestClient::as_user(server.base_url.clone(), LIKER);
//!
//!     let response = client.toggle_like(&post_id).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod server;

pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;
