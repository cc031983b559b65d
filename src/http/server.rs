//! axum-based HTTP server.
//!
//! Routes mirror the store/read contract: `/conf/{*path}` for document
//! reads, writes, and deletes (writes and deletes bypass expansion), and
//! `/auth` for API-key management. Every route except the health check
//! requires a valid API key, presented either as a `key` query parameter
//! or a `key` header.

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ResolveError;
use crate::paths;
use crate::resolve::Engine;
use crate::store::generate_key;

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    engine: Engine,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// `key` query parameter accepted on every authenticated route.
#[derive(Debug, Deserialize)]
struct AuthQuery {
    key: Option<String>,
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The API key presented on a request: `key` query parameter first, then
/// the `key` header.
fn presented_key(query_key: Option<String>, headers: &HeaderMap) -> Option<String> {
    query_key.or_else(|| {
        headers
            .get("key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

/// Middleware rejecting requests without a known API key.
async fn require_key(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = presented_key(auth.key, request.headers()) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.engine().store().is_authorized(&key).await {
        Ok(true) => next.run(request).await,
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!(error = %err, "authorization lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /conf/{*path}`: resolve a document.
///
/// The first URL segment names the environment; the rest is the location
/// within it. Extend directives are expanded and the wildcard fallback
/// applies.
async fn get_conf(State(state): State<AppState>, Path(rest): Path<String>) -> Response {
    let Some(dotted) = paths::path_from_url(&rest) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some((environment, remainder)) = paths::split_environment(&dotted) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.engine().get_config(remainder, environment).await {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(ResolveError::Timeout) => {
            warn!(path = %dotted, "resolution timed out");
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        Err(err) => {
            error!(path = %dotted, error = %err, "resolution failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /conf/{*path}`: store a document verbatim at the full absolute
/// path. Extends are only interpreted on read.
async fn set_conf(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(dotted) = paths::path_from_url(&rest) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.engine().set_config(&dotted, &body).await {
        Ok(()) => Json(json!(true)).into_response(),
        Err(err) => {
            error!(path = %dotted, error = %err, "write failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `DELETE /conf/{*path}`: delete the exact key.
async fn delete_conf(State(state): State<AppState>, Path(rest): Path<String>) -> Response {
    let Some(dotted) = paths::path_from_url(&rest) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.engine().delete_config(&dotted).await {
        Ok(_) => Json(json!(true)).into_response(),
        Err(err) => {
            error!(path = %dotted, error = %err, "delete failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /auth`: mint and register a new API key.
async fn issue_key(State(state): State<AppState>) -> Response {
    let key = generate_key();
    match state.engine().store().create_key(&key).await {
        Ok(()) => Json(json!(key)).into_response(),
        Err(err) => {
            error!(error = %err, "key creation failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `DELETE /auth`: revoke the presented key (self-revocation).
async fn revoke_key(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(key) = presented_key(auth.key, &headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.engine().store().delete_key(&key).await {
        Ok(_) => Json(json!(true)).into_response(),
        Err(err) => {
            error!(error = %err, "key revocation failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let authenticated = Router::new()
        .route(
            "/conf/{*path}",
            get(get_conf).post(set_conf).delete(delete_conf),
        )
        .route("/auth", post(issue_key).delete(revoke_key))
        .layer(middleware::from_fn_with_state(state.clone(), require_key));

    Router::new()
        .merge(authenticated)
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified bind address and port.
///
/// Returns a oneshot sender that can be used to signal shutdown, and the
/// actual address the server is bound to.
pub async fn start_server(
    engine: Engine,
    bind: &str,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let state = AppState::new(engine);
    let app = build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("configuration service listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("HTTP server shutting down");
            })
            .await
        {
            error!("HTTP server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
