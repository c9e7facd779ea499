//! Access logging middleware.
//!
//! Logs every session-bound request with role, method, path and response
//! status. Runs innermost (after the session middleware has injected
//! `ActiveSession`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ActiveSession;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let role = req.extensions().get::<ActiveSession>().map(|s| s.context.role);

    let response = next.run(req).await;

    let status = response.status().as_u16();
    if response.status().is_server_error() {
        tracing::warn!(?role, %method, path, status, "API access");
    } else {
        tracing::info!(?role, %method, path, status, "API access");
    }
    response
}
