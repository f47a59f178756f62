//! End-to-end tests for posts and the like toggle endpoints

mod common;

use common::{TestClient, TestServer, LIKER, OTHER_LIKER, POST_OWNER};
use reqwest::StatusCode;
use social_feed_server::likes::LikeStore;

#[tokio::test]
async fn test_user_routes_require_caller_identity() {
    let server = TestServer::spawn().await;
    let post_id = server.create_post(POST_OWNER, "hello");
    let client = TestClient::anonymous(server.base_url.clone());

    assert_eq!(client.home().await.status(), StatusCode::OK);
    assert_eq!(
        client.toggle_like(&post_id).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(server.likes_count(&post_id), 0);
}

#[tokio::test]
async fn test_create_and_fetch_post() {
    let server = TestServer::spawn().await;
    let client = TestClient::as_user(server.base_url.clone(), POST_OWNER);

    let response = client.create_post("first post").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: serde_json::Value = response.json().await.unwrap();
    let post_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["owner_id"], POST_OWNER);

    let response = client.get_post(&post_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: serde_json::Value = response.json().await.unwrap();
    assert_eq!(fetched["content"], "first post");
    assert_eq!(fetched["likes_count"], 0);

    assert_eq!(
        client.get_post("does-not-exist").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_posts_are_listed_newest_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::as_user(server.base_url.clone(), POST_OWNER);
    let first = server.create_post(POST_OWNER, "one");
    let second = server.create_post(POST_OWNER, "two");

    let body: serde_json::Value = client.get_posts(10, 0).await.json().await.unwrap();
    assert_eq!(body["total"], 2);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let body: serde_json::Value = client.get_posts(10, 1).await.json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_like_then_unlike_updates_counter() {
    let server = TestServer::spawn().await;
    let post_id = server.create_post(POST_OWNER, "hello");
    let client = TestClient::as_user(server.base_url.clone(), LIKER);

    assert_eq!(client.toggle_like_status(&post_id).await, "liked");
    assert_eq!(server.likes_count(&post_id), 1);
    let body: serde_json::Value = client.get_like(&post_id).await.json().await.unwrap();
    assert_eq!(body["liked"], true);

    assert_eq!(client.toggle_like_status(&post_id).await, "unliked");
    assert_eq!(server.likes_count(&post_id), 0);
    let body: serde_json::Value = client.get_like(&post_id).await.json().await.unwrap();
    assert_eq!(body["liked"], false);
}

#[tokio::test]
async fn test_likes_from_several_users_accumulate() {
    let server = TestServer::spawn().await;
    let post_id = server.create_post(POST_OWNER, "hello");
    let liker = TestClient::as_user(server.base_url.clone(), LIKER);
    let other = TestClient::as_user(server.base_url.clone(), OTHER_LIKER);
    let owner = TestClient::as_user(server.base_url.clone(), POST_OWNER);

    assert_eq!(liker.toggle_like_status(&post_id).await, "liked");
    assert_eq!(other.toggle_like_status(&post_id).await, "liked");
    assert_eq!(owner.toggle_like_status(&post_id).await, "liked");

    assert_eq!(server.likes_count(&post_id), 3);
    assert_eq!(server.store.count_post_likes(&post_id).unwrap(), 3);

    let fetched: serde_json::Value = liker.get_post(&post_id).await.json().await.unwrap();
    assert_eq!(fetched["likes_count"], 3);

    assert_eq!(other.toggle_like_status(&post_id).await, "unliked");
    let response = owner.get_post_likes(&post_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let likes: serde_json::Value = response.json().await.unwrap();
    let likers: Vec<&str> = likes
        .as_array()
        .unwrap()
        .iter()
        .map(|like| like["user_id"].as_str().unwrap())
        .collect();
    assert_eq!(likers, vec![LIKER, POST_OWNER]);
}

#[tokio::test]
async fn test_toggle_on_missing_post_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::as_user(server.base_url.clone(), LIKER);

    assert_eq!(
        client.toggle_like("missing-post").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get_like("missing-post").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_concurrent_toggles_keep_counter_consistent() {
    let server = TestServer::spawn().await;
    let post_id = server.create_post(POST_OWNER, "hot take");

    let mut tasks = Vec::new();
    for i in 0..6 {
        let client = TestClient::as_user(server.base_url.clone(), &format!("user-{}", i));
        let post_id = post_id.clone();
        // Users with an even index toggle once, the others twice.
        let toggles = if i % 2 == 0 { 1 } else { 2 };
        tasks.push(tokio::spawn(async move {
            for _ in 0..toggles {
                client.toggle_like_status(&post_id).await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(server.store.count_post_likes(&post_id).unwrap(), 3);
    assert_eq!(server.likes_count(&post_id), 3);
}
