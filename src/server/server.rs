use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{error, info};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::metrics::metrics_handler;
use super::session::CallerIdentity;
use super::{log_requests, state::*, ServerConfig};
use crate::likes::{ToggleError, ToggleStatus};

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
    pub user_id: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct CreatePostBody {
    pub content: String,
}

#[derive(Deserialize, Debug, Default)]
struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT)
    }

    fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// One page of a listing plus the size of the whole listing.
#[derive(Serialize)]
struct Page<T> {
    items: Vec<T>,
    total: usize,
}

#[derive(Serialize)]
struct ToggleLikeResponse {
    status: ToggleStatus,
}

#[derive(Serialize)]
struct LikedResponse {
    liked: bool,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    count: usize,
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{}: {:#}", context, err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

async fn home(caller: Option<CallerIdentity>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
        user_id: caller.map(|c| c.user_id),
    };
    Json(stats)
}

async fn create_post(
    caller: CallerIdentity,
    State(post_store): State<GuardedPostStore>,
    Json(body): Json<CreatePostBody>,
) -> Response {
    if body.content.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Post content cannot be empty").into_response();
    }
    match post_store.create_post(&caller.user_id, &body.content) {
        Ok(post) => {
            info!("User: {} | Post: {} | Created post", caller.user_id, post.id);
            (StatusCode::CREATED, Json(post)).into_response()
        }
        Err(err) => internal_error("Failed to create post", err),
    }
}

async fn get_posts(
    _caller: CallerIdentity,
    State(post_store): State<GuardedPostStore>,
    Query(page): Query<PageQuery>,
) -> Response {
    let posts = post_store
        .get_posts(page.limit(), page.offset())
        .and_then(|items| Ok(Page { items, total: post_store.count_posts()? }));
    match posts {
        Ok(page) => Json(page).into_response(),
        Err(err) => internal_error("Failed to list posts", err),
    }
}

async fn get_post(
    _caller: CallerIdentity,
    State(post_store): State<GuardedPostStore>,
    Path(post_id): Path<String>,
) -> Response {
    match post_store.get_post(&post_id) {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error("Failed to load post", err),
    }
}

async fn toggle_post_like(
    caller: CallerIdentity,
    State(coordinator): State<GuardedLikeToggleCoordinator>,
    Path(post_id): Path<String>,
) -> Response {
    // Runs to completion even if the client goes away, so a relation write is
    // never separated from its counter delta by request cancellation.
    let user_id = caller.user_id.clone();
    let toggle_post_id = post_id.clone();
    let result =
        tokio::task::spawn_blocking(move || coordinator.toggle(&user_id, &toggle_post_id)).await;

    match result {
        Ok(Ok(status)) => Json(ToggleLikeResponse { status }).into_response(),
        Ok(Err(ToggleError::PostNotFound(_))) => StatusCode::NOT_FOUND.into_response(),
        Ok(Err(err)) => {
            error!(
                "User: {} | Post: {} | Like toggle failed: {:#}",
                caller.user_id,
                post_id,
                anyhow::Error::from(err)
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(join_err) => {
            error!(
                "User: {} | Post: {} | Like toggle task failed: {}",
                caller.user_id, post_id, join_err
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_post_like(
    caller: CallerIdentity,
    State(post_store): State<GuardedPostStore>,
    State(coordinator): State<GuardedLikeToggleCoordinator>,
    Path(post_id): Path<String>,
) -> Response {
    match post_store.get_post(&post_id) {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error("Failed to load post", err),
    }
    match coordinator.has_user_liked_post(&caller.user_id, &post_id) {
        Ok(liked) => Json(LikedResponse { liked }).into_response(),
        Err(err) => internal_error("Failed to read like state", err),
    }
}

async fn get_post_likes(
    _caller: CallerIdentity,
    State(post_store): State<GuardedPostStore>,
    State(coordinator): State<GuardedLikeToggleCoordinator>,
    Path(post_id): Path<String>,
) -> Response {
    match post_store.get_post(&post_id) {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return internal_error("Failed to load post", err),
    }
    match coordinator.get_post_likes(&post_id) {
        Ok(likes) => Json(likes).into_response(),
        Err(err) => internal_error("Failed to list post likes", err),
    }
}

async fn get_notifications(
    caller: CallerIdentity,
    State(notification_store): State<GuardedNotificationStore>,
    Query(page): Query<PageQuery>,
) -> Response {
    let notifications = notification_store
        .get_user_notifications(&caller.user_id, page.limit(), page.offset())
        .and_then(|items| {
            Ok(Page {
                items,
                total: notification_store.count_user_notifications(&caller.user_id)?,
            })
        });
    match notifications {
        Ok(page) => Json(page).into_response(),
        Err(err) => internal_error("Failed to list notifications", err),
    }
}

async fn get_unread_count(
    caller: CallerIdentity,
    State(notification_store): State<GuardedNotificationStore>,
) -> Response {
    match notification_store.get_unread_count(&caller.user_id) {
        Ok(count) => Json(UnreadCountResponse { count }).into_response(),
        Err(err) => internal_error("Failed to count unread notifications", err),
    }
}

async fn mark_notification_read(
    caller: CallerIdentity,
    State(notification_store): State<GuardedNotificationStore>,
    Path(notification_id): Path<String>,
) -> Response {
    match notification_store.mark_notification_read(&notification_id, &caller.user_id) {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => internal_error("Failed to mark notification read", err),
    }
}

pub fn make_app(
    config: ServerConfig,
    post_store: GuardedPostStore,
    notification_store: GuardedNotificationStore,
    like_toggle_coordinator: GuardedLikeToggleCoordinator,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        post_store,
        notification_store,
        like_toggle_coordinator,
    };

    let post_routes: Router = Router::new()
        .route("/", post(create_post).get(get_posts))
        .route("/{id}", get(get_post))
        .route("/{id}/like", post(toggle_post_like).get(get_post_like))
        .route("/{id}/likes", get(get_post_likes))
        .with_state(state.clone());

    let notification_routes: Router = Router::new()
        .route("/", get(get_notifications))
        .route("/unread_count", get(get_unread_count))
        .route("/{id}/read", post(mark_notification_read))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1/posts", post_routes)
        .nest("/v1/notifications", notification_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown_token` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    post_store: GuardedPostStore,
    notification_store: GuardedNotificationStore,
    like_toggle_coordinator: GuardedLikeToggleCoordinator,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, post_store, notification_store, like_toggle_coordinator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let api_shutdown = shutdown_token.clone();
    let api_server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { api_shutdown.cancelled().await });
    let metrics_server = axum::serve(metrics_listener, make_metrics_app())
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await });

    tokio::try_join!(
        async { api_server.await.context("API server failed") },
        async { metrics_server.await.context("Metrics server failed") },
    )?;
    Ok(())
}
