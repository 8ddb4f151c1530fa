//! Donation subdomain: campaigns, pledges and the supporter newsletter.

use crate::error::ApiError;
use crate::handlers::main_site::subscribe_and_welcome;
use crate::page::{JsonOrForm, Page};
use crate::rate_limit::LimitGroup;
use crate::server::AppState;
use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use folio_core::{
    mail, Currency, Donation, DonationForm, DonationProject, DonationStatus, Subdomain,
    SubscribeForm,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

const RECENT_DONATIONS: usize = 10;
const PROJECT_DONATIONS: usize = 20;
const API_DONATIONS: usize = 500;
const SUPPORTERS: usize = 500;
const ANONYMOUS_SUPPORTER: &str = "Anonymous Supporter";

/// Donation as shown publicly: anonymous donors masked, no email.
#[derive(Debug, Serialize)]
struct PublicDonation<'a> {
    id: i64,
    project_id: i64,
    donor_name: &'a str,
    amount: f64,
    currency: Currency,
    message: Option<&'a str>,
    status: DonationStatus,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Donation> for PublicDonation<'a> {
    fn from(d: &'a Donation) -> Self {
        Self {
            id: d.id,
            project_id: d.project_id,
            donor_name: d.display_name(),
            amount: d.amount,
            currency: d.currency,
            message: d.message.as_deref(),
            status: d.status,
            created_at: d.created_at,
        }
    }
}

fn public(donations: &[Donation]) -> Vec<PublicDonation<'_>> {
    donations.iter().map(PublicDonation::from).collect()
}

pub fn index(state: &AppState) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let recent = db.recent_completed_donations(RECENT_DONATIONS)?;
    Ok(Page::new(
        "donation/index.html",
        json!({
            "projects": db.list_donation_projects(true)?,
            "totals": db.donation_totals()?,
            "recent_donations": public(&recent),
        }),
    ))
}

pub fn project(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let project = db.get_donation_project(id)?;
    let donations = db.donations_for_project(id, true, PROJECT_DONATIONS)?;
    Ok(Page::new(
        "donation/project_detail.html",
        json!({ "project": project, "donations": public(&donations) }),
    ))
}

/// Donation form for an active campaign.
pub fn donate_form(state: &AppState, project_id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let project = db.get_donation_project(project_id)?;
    if !project.is_active {
        return Err(ApiError::not_found(format!(
            "Donation project {} is not accepting donations",
            project_id
        )));
    }
    let donations = db.donations_for_project(project_id, true, PROJECT_DONATIONS)?;
    let action = state
        .urls
        .subdomain(Subdomain::Donation, &format!("/donate/{}", project_id));
    Ok(Page::new(
        "donation/project_detail.html",
        json!({
            "project": project,
            "donations": public(&donations),
            "show_donation_form": true,
            "currencies": [Currency::Npr, Currency::Usd],
            "action": action,
        }),
    ))
}

/// Record a pending donation and thank the donor by mail.
async fn record_donation(
    state: &AppState,
    project_id: i64,
    form: &DonationForm,
) -> Result<Donation, ApiError> {
    let db = state.folio.db();
    let donation = db.create_donation(project_id, form)?;
    let project = db.get_donation_project(project_id)?;

    let settings = state.folio.settings();
    let email = mail::donation_thanks(&settings.mail_sender, &donation, &project.title);
    mail::send_quietly(state.folio.mailer(), email).await;
    Ok(donation)
}

pub async fn donate(
    state: &AppState,
    project_id: i64,
    request: Request,
) -> Result<Response, ApiError> {
    let client = state.limiters.client_ip(request.headers(), request.extensions());
    state.limiters.check(LimitGroup::Donation, &client)?;

    let JsonOrForm(form) = JsonOrForm::<DonationForm>::from_request(request, &()).await?;
    let donation = record_donation(state, project_id, &form).await?;

    let success_url = state
        .urls
        .subdomain(Subdomain::Donation, &format!("/success/{}", donation.id));
    Ok(Json(json!({
        "success": true,
        "message": "Thank you for your donation! Your contribution is being processed.",
        "donation_id": donation.id,
        "reference": donation.reference,
        "redirect": success_url,
    }))
    .into_response())
}

pub fn success(state: &AppState, donation_id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let donation = db.get_donation(donation_id)?;
    let project = db.get_donation_project(donation.project_id)?;
    Ok(Page::new(
        "donation/success.html",
        json!({
            "donation": PublicDonation::from(&donation),
            "reference": donation.reference,
            "project": project,
        }),
    ))
}

/// Body of `POST /api/donate`: the donation form plus its campaign.
#[derive(Debug, Deserialize)]
struct ApiDonation {
    project_id: Option<i64>,
    #[serde(flatten)]
    form: DonationForm,
}

pub async fn api_donate(state: &AppState, request: Request) -> Result<Response, ApiError> {
    let client = state.limiters.client_ip(request.headers(), request.extensions());
    state.limiters.check(LimitGroup::Donation, &client)?;

    let Json(body) = Json::<ApiDonation>::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?;
    let project_id = body
        .project_id
        .ok_or_else(|| ApiError::bad_request("Missing required field: project_id"))?;
    let donation = record_donation(state, project_id, &body.form).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Donation submitted successfully",
        "donation_id": donation.id,
        "reference": donation.reference,
    }))
    .into_response())
}

/// Featured and fully funded campaigns, with site-wide figures.
pub fn highlights(state: &AppState) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let campaigns = db.list_donation_projects(false)?;
    let featured: Vec<&DonationProject> = campaigns.iter().filter(|p| p.is_featured).collect();
    let completed: Vec<&DonationProject> = campaigns.iter().filter(|p| p.goal_reached()).collect();
    let active = campaigns.iter().filter(|p| p.is_active).count() as i64;
    let (portfolio_projects, portfolio_featured) = db.project_counts()?;
    let totals = db.donation_totals()?;

    Ok(Page::new(
        "donation/highlights.html",
        json!({
            "featured_projects": featured,
            "completed_projects": completed,
            "achievement_stats": {
                "total_projects": active + portfolio_projects,
                "completed_projects": completed.len(),
                "featured_projects": featured.len() as i64 + portfolio_featured,
                "total_raised_display": totals.display(),
                "total_usd": totals.total_usd,
                "total_npr": totals.total_npr,
                "supporter_count": totals.supporter_count,
            },
        }),
    ))
}

/// Donor recognition entry. Amounts stay private.
#[derive(Debug, Serialize)]
struct Supporter<'a> {
    donor_name: &'a str,
    currency: Currency,
    message: Option<&'a str>,
    project_title: Option<&'a str>,
    created_at: DateTime<Utc>,
}

pub fn thanksgiving(state: &AppState) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let donations = db.recent_completed_donations(SUPPORTERS)?;
    let titles: HashMap<i64, String> = db
        .list_donation_projects(false)?
        .into_iter()
        .map(|p| (p.id, p.title))
        .collect();

    let supporters: Vec<Supporter<'_>> = donations
        .iter()
        .map(|d| Supporter {
            donor_name: if d.is_anonymous {
                ANONYMOUS_SUPPORTER
            } else {
                d.donor_name.as_str()
            },
            currency: d.currency,
            message: d.message.as_deref(),
            project_title: titles.get(&d.project_id).map(String::as_str),
            created_at: d.created_at,
        })
        .collect();

    Ok(Page::new(
        "donation/thanksgiving.html",
        json!({
            "donations": supporters,
            "supporter_count": db.donation_totals()?.supporter_count,
        }),
    ))
}

pub fn why_donate(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let project = state.folio.db().get_donation_project(id)?;
    let progress = project.progress_percent();
    let goal_reached = project.goal_reached();
    let donate_url = state
        .urls
        .subdomain(Subdomain::Donation, &format!("/donate/{}", id));
    Ok(Page::new(
        "donation/why_donate.html",
        json!({
            "project": project,
            "progress_percent": progress,
            "goal_reached": goal_reached,
            "donate_url": donate_url,
        }),
    ))
}

pub async fn subscribe(state: &AppState, request: Request) -> Result<Response, ApiError> {
    let client = state.limiters.client_ip(request.headers(), request.extensions());
    state.limiters.check(LimitGroup::Newsletter, &client)?;

    let JsonOrForm(form) = JsonOrForm::<SubscribeForm>::from_request(request, &()).await?;
    Ok(subscribe_and_welcome(state, &form).await?.into_response())
}

pub fn api_projects(state: &AppState) -> Result<Response, ApiError> {
    let projects = state.folio.db().list_donation_projects(true)?;
    Ok(Json(projects).into_response())
}

pub fn api_project(state: &AppState, id: i64) -> Result<Response, ApiError> {
    let project = state.folio.db().get_donation_project(id)?;
    Ok(Json(project).into_response())
}

pub fn api_donations(state: &AppState, project_id: i64) -> Result<Response, ApiError> {
    let db = state.folio.db();
    db.get_donation_project(project_id)?;
    let donations = db.donations_for_project(project_id, true, API_DONATIONS)?;
    Ok(Json(public(&donations)).into_response())
}
