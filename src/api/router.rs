//! HTTP API router.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Middleware stack on session-bound routes (outermost → innermost):
//! 1. Session validator → 2. Access logger

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // Session-bound routes. Layers are applied from bottom (innermost) to
    // top (outermost); Extension must be outermost so middleware can reach
    // ApiContext.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/session", get(endpoints::session::current))
        .route("/session/logout", post(endpoints::session::logout))
        .route("/session/locale", put(endpoints::session::set_locale))
        .route("/session/input", put(endpoints::session::set_input))
        .route("/assessments", post(endpoints::assessments::create))
        .route("/history", get(endpoints::history::list))
        .route("/history/export", get(endpoints::history::export))
        .route("/history/delete", post(endpoints::history::delete))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        .layer(axum::Extension(ctx.clone()));

    // Open routes: no session needed
    let open = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/session/guest", post(endpoints::session::guest))
        .route("/session/login", post(endpoints::session::login))
        .route("/i18n/:locale", get(endpoints::catalog::messages))
        .route("/features", get(endpoints::catalog::features))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", open)
        .layer(TraceLayer::new_for_http())
}
