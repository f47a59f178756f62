//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When routes or request formats
//! change, update only this file.

use super::constants::*;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    /// Client that sends no caller identity.
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Client acting as `user_id` on every request.
    pub fn as_user(base_url: String, user_id: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-User-Id",
            HeaderValue::from_str(user_id).expect("Invalid user id header"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Posts
    // ========================================================================

    pub async fn create_post(&self, content: &str) -> Response {
        self.client
            .post(format!("{}/v1/posts", self.base_url))
            .json(&json!({ "content": content }))
            .send()
            .await
            .expect("Create post request failed")
    }

    pub async fn get_posts(&self, limit: usize, offset: usize) -> Response {
        self.client
            .get(format!(
                "{}/v1/posts?limit={}&offset={}",
                self.base_url, limit, offset
            ))
            .send()
            .await
            .expect("Get posts request failed")
    }

    pub async fn get_post(&self, post_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/posts/{}", self.base_url, post_id))
            .send()
            .await
            .expect("Get post request failed")
    }

    // ========================================================================
    // Likes
    // ========================================================================

    pub async fn toggle_like(&self, post_id: &str) -> Response {
        self.client
            .post(format!("{}/v1/posts/{}/like", self.base_url, post_id))
            .send()
            .await
            .expect("Toggle like request failed")
    }

    pub async fn get_like(&self, post_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/posts/{}/like", self.base_url, post_id))
            .send()
            .await
            .expect("Get like request failed")
    }

    pub async fn get_post_likes(&self, post_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/posts/{}/likes", self.base_url, post_id))
            .send()
            .await
            .expect("Get post likes request failed")
    }

    /// Toggles and returns the reported status string.
    pub async fn toggle_like_status(&self, post_id: &str) -> String {
        let response = self.toggle_like(post_id).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.expect("Invalid toggle response");
        body["status"]
            .as_str()
            .expect("Missing status in toggle response")
            .to_string()
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn get_notifications(&self) -> Response {
        self.client
            .get(format!("{}/v1/notifications", self.base_url))
            .send()
            .await
            .expect("Get notifications request failed")
    }

    pub async fn get_unread_count(&self) -> Response {
        self.client
            .get(format!("{}/v1/notifications/unread_count", self.base_url))
            .send()
            .await
            .expect("Get unread count request failed")
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Response {
        self.client
            .post(format!(
                "{}/v1/notifications/{}/read",
                self.base_url, notification_id
            ))
            .send()
            .await
            .expect("Mark notification read request failed")
    }

    /// Polls the unread count until it equals `expected` or the wait times out.
    pub async fn wait_for_unread_count(&self, expected: u64) -> u64 {
        let start = std::time::Instant::now();
        loop {
            let body: serde_json::Value = self
                .get_unread_count()
                .await
                .json()
                .await
                .expect("Invalid unread count response");
            let count = body["count"].as_u64().expect("Missing count");
            if count == expected
                || start.elapsed() > Duration::from_millis(NOTIFICATION_WAIT_TIMEOUT_MS)
            {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(NOTIFICATION_POLL_INTERVAL_MS)).await;
        }
    }
}
