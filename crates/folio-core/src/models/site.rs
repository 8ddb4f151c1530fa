//! Wiki, donation and site-form records.

use crate::config::FormLimits;
use crate::error::{FolioError, Result};
use crate::validation::{require_text, validate_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WikiCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WikiArticle {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Comma-delimited tags.
    pub tags: String,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewWikiArticle {
    pub title: String,
    pub content: String,
    pub tags: String,
    pub category_id: Option<i64>,
}

impl NewWikiArticle {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title, 200)?;
        if self.content.trim().is_empty() {
            return Err(FolioError::validation("content", "content is required"));
        }
        Ok(())
    }
}

/// Accepted donation currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Npr,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Npr => "NPR",
            Currency::Usd => "USD",
        }
    }

    /// Unknown currencies fall back to NPR.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "USD" => Currency::Usd,
            _ => Currency::Npr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "completed" => Some(DonationStatus::Completed),
            "cancelled" => Some(DonationStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationProject {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub goal_amount: f64,
    pub currency: Currency,
    pub is_active: bool,
    pub is_featured: bool,
    /// Sum of completed donations.
    pub raised_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl DonationProject {
    pub fn goal_reached(&self) -> bool {
        self.goal_amount > 0.0 && self.raised_amount >= self.goal_amount
    }

    /// Share of the goal raised so far, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.goal_amount <= 0.0 {
            return 0.0;
        }
        (self.raised_amount / self.goal_amount * 100.0).min(100.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDonationProject {
    pub title: String,
    pub description: Option<String>,
    pub goal_amount: f64,
    pub currency: Currency,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Donation {
    pub id: i64,
    pub project_id: i64,
    pub donor_name: String,
    #[serde(skip_serializing)]
    pub donor_email: String,
    pub amount: f64,
    pub currency: Currency,
    pub message: Option<String>,
    pub is_anonymous: bool,
    pub status: DonationStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    /// Name shown publicly; anonymous donors are masked.
    pub fn display_name(&self) -> &str {
        if self.is_anonymous {
            "Anonymous"
        } else {
            &self.donor_name
        }
    }
}

/// Aggregate figures over completed donations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DonationTotals {
    pub total_npr: f64,
    pub total_usd: f64,
    /// Distinct donor emails.
    pub supporter_count: i64,
}

impl DonationTotals {
    /// Raised amounts for display, e.g. `$1,250 / Rs.40,000`.
    pub fn display(&self) -> String {
        let usd = format!("${}", group_thousands(self.total_usd));
        let npr = format!("Rs.{}", group_thousands(self.total_npr));
        match (self.total_usd > 0.0, self.total_npr > 0.0) {
            (true, false) => usd,
            (false, true) => npr,
            _ => format!("{} / {}", usd, npr),
        }
    }
}

/// Whole units with comma separators.
fn group_thousands(amount: f64) -> String {
    let digits = format!("{:.0}", amount.max(0.0));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DonationForm {
    pub donor_name: String,
    pub donor_email: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub message: Option<String>,
    pub is_anonymous: bool,
}

impl DonationForm {
    pub fn validate(&self) -> Result<()> {
        require_text("donor_name", &self.donor_name, FormLimits::NAME_MAX)?;
        validate_email(&self.donor_email)?;
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(FolioError::validation("amount", "amount must be greater than zero"));
        }
        Ok(())
    }

    pub fn currency(&self) -> Currency {
        self.currency
            .as_deref()
            .map(Currency::parse_or_default)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name, FormLimits::NAME_MAX)?;
        validate_email(&self.email)?;
        if let Some(subject) = &self.subject {
            if subject.trim().chars().count() > FormLimits::SUBJECT_MAX {
                return Err(FolioError::validation("subject", "subject is too long"));
            }
        }
        let len = self.message.trim().chars().count();
        if len < FormLimits::MESSAGE_MIN {
            return Err(FolioError::validation(
                "message",
                format!("message must be at least {} characters", FormLimits::MESSAGE_MIN),
            ));
        }
        if len > FormLimits::MESSAGE_MAX {
            return Err(FolioError::validation(
                "message",
                format!("message must be at most {} characters", FormLimits::MESSAGE_MAX),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterSubscriber {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub interests: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeForm {
    pub email: String,
    pub name: Option<String>,
    pub interests: Option<String>,
}

impl SubscribeForm {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if let Some(interests) = &self.interests {
            if interests.chars().count() > FormLimits::INTERESTS_MAX {
                return Err(FolioError::validation("interests", "interests are too long"));
            }
        }
        Ok(())
    }
}

/// What a subscribe request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
    AlreadySubscribed,
}

impl SubscribeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubscribeOutcome::Created => "Thank you for subscribing to the newsletter!",
            SubscribeOutcome::Reactivated => "Your newsletter subscription has been reactivated.",
            SubscribeOutcome::AlreadySubscribed => "You are already subscribed to the newsletter.",
        }
    }
}

/// Title and meta tags for one page of the site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoSettings {
    pub page_name: String,
    pub title: String,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeoUpdate {
    pub title: String,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
}

impl SeoUpdate {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title, 200)?;
        if let Some(description) = &self.meta_description {
            if description.trim().chars().count() > 500 {
                return Err(FolioError::validation(
                    "meta_description",
                    "meta description must be at most 500 characters",
                ));
            }
        }
        Ok(())
    }
}
