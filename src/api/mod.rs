use crate::{directory::UserDirectory, session::SessionManager};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
pub mod metrics;
mod openapi;

pub use self::metrics::HttpMetrics;
pub use self::openapi::openapi;

use self::handlers::{auth, health, ping, users};

/// Routes and shared state, without transport layers.
///
/// Every routed request is recorded by `http_metrics`.
#[must_use]
pub fn router(
    sessions: Arc<SessionManager>,
    directory: Arc<UserDirectory>,
    http_metrics: Arc<HttpMetrics>,
) -> Router {
    Router::new()
        .route("/ping", get(ping::ping))
        .route("/health", get(health::health).options(health::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/valid-token", post(auth::valid_token))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:nickname", get(users::get).delete(users::delete))
        .route("/metrics", get(metrics::metrics))
        .route("/openapi.json", get(|| async { Json(openapi()).into_response() }))
        .route_layer(middleware::from_fn_with_state(
            http_metrics.clone(),
            metrics::track,
        ))
        .layer(Extension(sessions))
        .layer(Extension(directory))
        .layer(Extension(http_metrics))
}

/// CORS policy: `*` allows any origin, anything else must be a single origin.
///
/// # Errors
/// Returns an error if `allow_origin` is not a valid header value.
pub fn cors(allow_origin: &str) -> Result<CorsLayer> {
    let origin = if allow_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(
            HeaderValue::from_str(allow_origin.trim())
                .with_context(|| format!("Invalid CORS origin: {allow_origin}"))?,
        )
    };

    Ok(CorsLayer::new()
        .allow_headers([ORIGIN, CONTENT_LENGTH, CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_origin(origin))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    sessions: Arc<SessionManager>,
    directory: Arc<UserDirectory>,
    http_metrics: Arc<HttpMetrics>,
    allow_origin: &str,
) -> Result<()> {
    let app = router(sessions, directory, http_metrics).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors(allow_origin)?),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
