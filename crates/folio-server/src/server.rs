//! HTTP server implementation using Axum.

use crate::error::{not_found, ApiError, ErrorDetail};
use crate::handlers::{admin, api, main_site};
use crate::rate_limit::RateLimiters;
use crate::subdomain::subdomain_dispatch;
use axum::{
    body::Body,
    extract::State,
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use folio_core::{Folio, SiteUrls, SubdomainRouter};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    /// Storage, project sync and mail
    pub folio: Folio,
    /// Subdomain route table interpreter
    pub router: SubdomainRouter,
    /// Absolute URL builder for links, mail and the sitemap
    pub urls: SiteUrls,
    pub limiters: RateLimiters,
}

impl AppState {
    pub fn new(folio: Folio) -> Self {
        let settings = folio.settings();
        let limiters = RateLimiters::per_minute(settings.rate_limit_per_minute)
            .trust_proxy(settings.trust_proxy);
        Self {
            router: folio.subdomain_router(),
            urls: folio.site_urls(),
            limiters,
            folio,
        }
    }
}

/// Build the application router.
///
/// Subdomain dispatch runs as middleware ahead of the path routes below, so
/// a resolved subdomain handler answers before any of them is consulted.
/// Panics below the debug-detail layer become masked 500 responses.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/api/github/cache-stats", get(admin::cache_stats))
        .route("/api/github/clear-cache", post(admin::clear_cache))
        .route("/api/github/force-refresh/:id", post(admin::force_refresh))
        .route(
            "/api/admin/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route("/api/admin/categories/:id", delete(admin::delete_category))
        .route("/api/admin/projects", post(admin::create_project))
        .route(
            "/api/admin/projects/:id",
            put(admin::update_project).delete(admin::delete_project),
        )
        .route("/api/admin/contacts", get(admin::list_contacts))
        .route("/api/admin/subscribers", get(admin::list_subscribers))
        .route(
            "/api/admin/donations/:id/complete",
            post(admin::complete_donation),
        )
        .route("/api/admin/seo", get(admin::list_seo))
        .route("/api/admin/seo/:page", put(admin::upsert_seo));

    Router::new()
        .route("/", get(main_site::index))
        .route("/health", get(main_site::health))
        .route("/newsletter/subscribe", post(main_site::newsletter_subscribe))
        .route("/newsletter/unsubscribe", get(main_site::newsletter_unsubscribe))
        .route("/contact/submit", post(main_site::contact_submit))
        .route("/sitemap.xml", get(main_site::sitemap))
        .route("/robots.txt", get(main_site::robots))
        .route("/api/projects", get(api::list_projects))
        .route("/api/projects/:id", get(api::get_project))
        .merge(admin_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            subdomain_dispatch,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            attach_debug_detail,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    ApiError::panicked(payload.as_ref()).into_response()
}

/// In debug mode, copy the full error chain of masked errors into the body.
async fn attach_debug_detail(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.folio.settings().debug {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, 64 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    let mut json: Value = match serde_json::from_slice(&bytes) {
        Ok(json) => json,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(obj) = json.as_object_mut() {
        obj.insert("detail".to_string(), Value::String(detail));
    }
    parts.headers.remove(header::CONTENT_LENGTH);
    (parts, Json(json)).into_response()
}

/// Bind and serve until Ctrl+C.
pub async fn serve(folio: Folio, host: &str, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(folio));
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received, exiting");
    })
    .await?;

    Ok(())
}
