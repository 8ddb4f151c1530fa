//! Subdomain pre-routing middleware.

use crate::handlers;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Resolve the request against the subdomain table and dispatch on a hit.
/// Misses continue to the regular routes untouched.
pub async fn subdomain_dispatch(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let resolved = state
        .router
        .resolve(request.method().as_str(), &host, request.uri().path());

    match resolved {
        Some(route) => {
            debug!(
                "Subdomain route {} -> {:?} (id {:?})",
                route.subdomain.label(),
                route.handler,
                route.id
            );
            handlers::dispatch(state, route, request).await
        }
        None => next.run(request).await,
    }
}
