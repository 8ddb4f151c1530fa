//! Data types shared across the core and the server.

mod github;
mod project;
mod site;

pub use github::{
    FailureKind, FailureRecord, GitHubCacheStats, GitHubRepoPayload, RateLimitSnapshot,
    RepoMetrics, SyncReport,
};
pub use project::{
    split_list, NewCategory, NewProject, Project, ProjectCategory, ProjectFilter, ProjectStatus,
    ProjectUpdate,
};
pub use site::{
    ContactForm, ContactSubmission, Currency, Donation, DonationForm, DonationProject,
    DonationStatus, DonationTotals, NewDonationProject, NewWikiArticle, NewsletterSubscriber,
    SeoSettings, SeoUpdate, SubscribeForm, SubscribeOutcome, WikiArticle, WikiCategory,
};
