//! Request handlers, split by site section.

pub mod admin;
pub mod api;
pub mod donation;
pub mod git;
pub mod main_site;
pub mod store;
pub mod wiki;

use crate::error::ApiError;
use crate::page::Page;
use crate::server::AppState;
use axum::{
    extract::{Query, Request},
    response::{IntoResponse, Response},
};
use folio_core::{HandlerId, RouteMatch};
use serde::Deserialize;
use std::sync::Arc;

/// `?q=` on the search pages.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
}

/// Invoke the subdomain handler a route resolved to.
pub async fn dispatch(state: Arc<AppState>, route: RouteMatch, request: Request) -> Response {
    run(&state, route, request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn run(state: &AppState, route: RouteMatch, request: Request) -> Result<Response, ApiError> {
    let response = match route.handler {
        HandlerId::WikiIndex => with_seo(state, "wiki", wiki::index(state)?)?,
        HandlerId::WikiSearch => {
            with_seo(state, "wiki", wiki::search(state, &search_query(&request))?)?
        }
        HandlerId::WikiArticle => {
            with_seo(state, "wiki", wiki::article(state, route_id(&route)?)?)?
        }
        HandlerId::WikiCategory => {
            with_seo(state, "wiki", wiki::category(state, route_id(&route)?)?)?
        }

        HandlerId::GitIndex => with_seo(state, "git", git::index(state).await?)?,
        HandlerId::GitSearch => {
            with_seo(state, "git", git::search(state, &search_query(&request)).await?)?
        }
        HandlerId::GitProject => {
            with_seo(state, "git", git::project(state, route_id(&route)?).await?)?
        }
        HandlerId::GitCategory => {
            with_seo(state, "git", git::category(state, route_id(&route)?).await?)?
        }

        HandlerId::DonationIndex => with_seo(state, "donation", donation::index(state)?)?,
        HandlerId::DonationProject => {
            with_seo(state, "donation", donation::project(state, route_id(&route)?)?)?
        }
        HandlerId::DonationDonateForm => {
            with_seo(state, "donation", donation::donate_form(state, route_id(&route)?)?)?
        }
        HandlerId::DonationDonate => {
            donation::donate(state, route_id(&route)?, request).await?
        }
        HandlerId::DonationSuccess => {
            with_seo(state, "donation", donation::success(state, route_id(&route)?)?)?
        }
        HandlerId::DonationHighlights => {
            with_seo(state, "donation", donation::highlights(state)?)?
        }
        HandlerId::DonationThanksgiving => {
            with_seo(state, "thanksgiving", donation::thanksgiving(state)?)?
        }
        HandlerId::DonationWhyDonate => {
            with_seo(state, "donation", donation::why_donate(state, route_id(&route)?)?)?
        }
        HandlerId::DonationSubscribe => donation::subscribe(state, request).await?,
        HandlerId::DonationApiProjects => donation::api_projects(state)?,
        HandlerId::DonationApiProject => donation::api_project(state, route_id(&route)?)?,
        HandlerId::DonationApiDonations => donation::api_donations(state, route_id(&route)?)?,
        HandlerId::DonationApiDonate => donation::api_donate(state, request).await?,

        HandlerId::StoreIndex => store::index(state),
    };
    Ok(response)
}

/// Attach the stored SEO entry for `page` and render.
fn with_seo(state: &AppState, page: &str, body: Page) -> Result<Response, ApiError> {
    let seo = state.folio.db().page_seo(page)?;
    Ok(body.with_seo(seo).into_response())
}

fn route_id(route: &RouteMatch) -> Result<i64, ApiError> {
    route
        .id
        .ok_or_else(|| ApiError::not_found("Missing numeric id in route"))
}

fn search_query(request: &Request) -> String {
    Query::<SearchParams>::try_from_uri(request.uri())
        .map(|Query(params)| params.q.trim().to_string())
        .unwrap_or_default()
}
