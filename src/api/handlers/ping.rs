use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path= "/ping",
    responses (
        (status = 200, description = "Service is alive", body = String, content_type = "text/plain"),
    ),
    tag= "health"
)]
pub async fn ping() -> impl IntoResponse {
    "pong"
}
