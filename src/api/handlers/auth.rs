use super::{bearer_token, ApiError};
use crate::session::{Credential, Session, SessionManager};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LoginRequest {
    user: String,
    password: String,
}

// password is never logged
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Session issued by the identity provider", body = Session),
        (status = 400, description = "Missing or malformed body", body = ApiError),
        (status = 500, description = "Wrong credentials or identity provider failure", body = ApiError),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    sessions: Extension<Arc<SessionManager>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return ApiError::new(StatusCode::BAD_REQUEST, "invalid format").into_response();
    };

    debug!("login request: {:?}", request);

    let credential = Credential::new(request.user, request.password);

    match sessions.login(&credential).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/auth/logout",
    request_body = LogoutRequest,
    responses (
        (status = 200, description = "Session closed", body = String),
        (status = 400, description = "Missing or malformed body", body = ApiError),
        (status = 500, description = "Invalid refresh token", body = ApiError),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    sessions: Extension<Arc<SessionManager>>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return ApiError::new(StatusCode::BAD_REQUEST, "invalid format").into_response();
    };

    match sessions.logout(&request.refresh_token).await {
        Ok(()) => (StatusCode::OK, Json("logout")).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/auth/valid-token",
    responses (
        (status = 200, description = "Whether the bearer token is active", body = bool),
        (status = 400, description = "Missing or malformed Authorization header", body = ApiError),
        (status = 500, description = "Introspection failed", body = ApiError),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn valid_token(
    sessions: Extension<Arc<SessionManager>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(err) => return ApiError::new(StatusCode::BAD_REQUEST, err.message()).into_response(),
    };

    match sessions.is_valid_token(token).await {
        Ok(active) => (StatusCode::OK, Json(active)).into_response(),
        Err(err) => err.into_response(),
    }
}
