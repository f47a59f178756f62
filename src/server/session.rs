use super::state::ServerState;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use tracing::debug;

/// Header carrying the already-authenticated caller id.
pub const HEADER_USER_ID_KEY: &str = "X-User-Id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
}

#[derive(Debug)]
pub enum CallerIdentityError {
    Missing,
    Malformed,
}

impl IntoResponse for CallerIdentityError {
    fn into_response(self) -> axum::response::Response {
        match self {
            CallerIdentityError::Missing => StatusCode::UNAUTHORIZED.into_response(),
            CallerIdentityError::Malformed => StatusCode::BAD_REQUEST.into_response(),
        }
    }
}

fn extract_caller_identity(parts: &Parts) -> Result<CallerIdentity, CallerIdentityError> {
    let value = parts
        .headers
        .get(HEADER_USER_ID_KEY)
        .ok_or(CallerIdentityError::Missing)?;
    let user_id = value
        .to_str()
        .map_err(|_| CallerIdentityError::Malformed)?
        .trim();
    if user_id.is_empty() {
        return Err(CallerIdentityError::Missing);
    }
    Ok(CallerIdentity {
        user_id: user_id.to_string(),
    })
}

impl FromRequestParts<ServerState> for CallerIdentity {
    type Rejection = CallerIdentityError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_caller_identity(parts).inspect_err(|err| {
            debug!("Rejecting request without caller identity: {:?}", err);
        })
    }
}

impl OptionalFromRequestParts<ServerState> for CallerIdentity {
    type Rejection = CallerIdentityError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_caller_identity(parts).ok())
    }
}
