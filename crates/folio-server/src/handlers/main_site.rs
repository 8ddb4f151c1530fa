//! Main site: homepage, forms, and crawler files.

use crate::error::ApiError;
use crate::page::{JsonOrForm, Page};
use crate::rate_limit::{ClientIp, LimitGroup};
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use folio_core::{
    mail, seo, validation, ContactForm, ProjectFilter, SubscribeForm, SubscribeOutcome,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const HOMEPAGE_PROJECTS: usize = 6;
const SITEMAP_ARTICLES: usize = 1000;

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let mut projects = db.homepage_projects(HOMEPAGE_PROJECTS)?;
    state.folio.sync().refresh_listing(&mut projects).await;

    Ok(Page::new(
        "index.html",
        json!({
            "projects": projects,
            "categories": db.list_categories()?,
            "subdomains": {
                "wiki": state.urls.subdomain(folio_core::Subdomain::Wiki, "/"),
                "git": state.urls.subdomain(folio_core::Subdomain::Git, "/"),
                "donation": state.urls.subdomain(folio_core::Subdomain::Donation, "/"),
                "store": state.folio.settings().store_url,
            },
        }),
    )
    .with_seo(db.page_seo("home")?))
}

/// Subscribe, and send the welcome mail unless the address was already active.
pub(crate) async fn subscribe_and_welcome(
    state: &AppState,
    form: &SubscribeForm,
) -> Result<Json<Value>, ApiError> {
    let (subscriber, outcome) = state.folio.db().subscribe(form)?;

    if outcome != SubscribeOutcome::AlreadySubscribed {
        let settings = state.folio.settings();
        let token = validation::unsubscribe_token(&settings.secret_key, &subscriber.email);
        let link = state.urls.unsubscribe_url(&subscriber.email, &token);
        let email = mail::newsletter_welcome(&settings.mail_sender, &subscriber, &link);
        mail::send_quietly(state.folio.mailer(), email).await;
    }

    Ok(Json(json!({
        "success": true,
        "status": if outcome == SubscribeOutcome::AlreadySubscribed { "info" } else { "success" },
        "outcome": outcome,
        "message": outcome.message(),
    })))
}

pub async fn newsletter_subscribe(
    State(state): State<Arc<AppState>>,
    client: ClientIp,
    JsonOrForm(form): JsonOrForm<SubscribeForm>,
) -> Result<Json<Value>, ApiError> {
    state.limiters.check(LimitGroup::Newsletter, &client)?;
    subscribe_and_welcome(&state, &form).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnsubscribeParams {
    pub email: String,
    pub token: String,
}

pub async fn newsletter_unsubscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UnsubscribeParams>,
) -> Result<Page, ApiError> {
    let secret = &state.folio.settings().secret_key;
    let email = validation::normalize_email(&params.email);
    if email.is_empty() || !validation::verify_unsubscribe_token(secret, &email, &params.token) {
        return Err(ApiError::bad_request("Invalid unsubscribe link"));
    }

    let removed = state.folio.db().unsubscribe(&email)?;
    Ok(Page::new(
        "newsletter/unsubscribed.html",
        json!({
            "success": true,
            "email": email,
            "message": if removed {
                "You have been unsubscribed from the newsletter."
            } else {
                "This address is not subscribed to the newsletter."
            },
        }),
    ))
}

pub async fn contact_submit(
    State(state): State<Arc<AppState>>,
    client: ClientIp,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Result<Json<Value>, ApiError> {
    state.limiters.check(LimitGroup::Contact, &client)?;

    let contact = state.folio.db().create_contact(&form)?;
    info!("Contact submission {} from {}", contact.id, contact.email);

    let settings = state.folio.settings();
    if let Some(admin) = &settings.admin_email {
        let email = mail::contact_notification(&settings.mail_sender, admin, &contact);
        mail::send_quietly(state.folio.mailer(), email).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Thank you for your message! I'll get back to you soon.",
    })))
}

pub async fn sitemap(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let db = state.folio.db();
    let projects = db.list_projects(&ProjectFilter::default())?;
    let articles = db.recent_articles(SITEMAP_ARTICLES)?;
    let xml = seo::sitemap(&state.urls, &projects, &articles);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

pub async fn robots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        seo::robots_txt(&state.urls),
    )
}
