use super::{bearer_token, ApiError};
use crate::directory::{DirectoryUser, NewUserRequest, UserDirectory};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;

fn unauthorized(headers: &HeaderMap) -> Result<&str, Response> {
    bearer_token(headers)
        .map_err(|err| ApiError::new(StatusCode::UNAUTHORIZED, err.message()).into_response())
}

fn nickname_required(nickname: &str) -> Result<&str, Response> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(
            ApiError::new(StatusCode::BAD_REQUEST, "user's nick name is required").into_response(),
        );
    }
    Ok(nickname)
}

#[utoipa::path(
    get,
    path= "/users",
    responses (
        (status = 200, description = "Every user in the directory", body = [DirectoryUser]),
        (status = 401, description = "Missing bearer token", body = ApiError),
        (status = 500, description = "Identity provider failure", body = ApiError),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn list(directory: Extension<Arc<UserDirectory>>, headers: HeaderMap) -> Response {
    let token = match unauthorized(&headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    match directory.get_all(token).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path= "/users/{nickname}",
    params(("nickname" = String, Path, description = "Username of the user")),
    responses (
        (status = 200, description = "The user", body = DirectoryUser),
        (status = 400, description = "Missing nickname", body = ApiError),
        (status = 401, description = "Missing bearer token", body = ApiError),
        (status = 404, description = "No user with that nickname", body = ApiError),
        (status = 500, description = "Identity provider failure", body = ApiError),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip(directory, headers))]
pub async fn get(
    directory: Extension<Arc<UserDirectory>>,
    headers: HeaderMap,
    Path(nickname): Path<String>,
) -> Response {
    let (token, nickname) = match unauthorized(&headers).and_then(|token| {
        nickname_required(&nickname).map(|nickname| (token, nickname))
    }) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    match directory.get_by_nickname(token, nickname).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/users",
    request_body = NewUserRequest,
    responses (
        (status = 200, description = "User created", body = String),
        (status = 400, description = "Missing or invalid fields", body = ApiError),
        (status = 401, description = "Missing bearer token", body = ApiError),
        (status = 500, description = "Identity provider failure", body = ApiError),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn create(
    directory: Extension<Arc<UserDirectory>>,
    headers: HeaderMap,
    payload: Option<Json<NewUserRequest>>,
) -> Response {
    let token = match unauthorized(&headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let Some(Json(request)) = payload else {
        return ApiError::new(StatusCode::BAD_REQUEST, "invalid format").into_response();
    };

    match directory.create(token, &request).await {
        Ok(_id) => (
            StatusCode::OK,
            Json(format!("user {} created", request.username())),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path= "/users/{nickname}",
    params(("nickname" = String, Path, description = "Username of the user")),
    responses (
        (status = 200, description = "User deleted", body = String),
        (status = 400, description = "Missing nickname", body = ApiError),
        (status = 401, description = "Missing bearer token", body = ApiError),
        (status = 404, description = "No user with that nickname", body = ApiError),
        (status = 409, description = "User still belongs to a team", body = ApiError),
        (status = 500, description = "Identity provider or team service failure", body = ApiError),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip(directory, headers))]
pub async fn delete(
    directory: Extension<Arc<UserDirectory>>,
    headers: HeaderMap,
    Path(nickname): Path<String>,
) -> Response {
    let (token, nickname) = match unauthorized(&headers).and_then(|token| {
        nickname_required(&nickname).map(|nickname| (token, nickname))
    }) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    match directory.delete(token, nickname).await {
        Ok(username) => (StatusCode::OK, Json(format!("user {username} deleted"))).into_response(),
        Err(err) => err.into_response(),
    }
}
