//! Folio Server - axum front end for the Folio portfolio site.
//!
//! Requests pass through the subdomain pre-router first; anything it does not
//! claim goes to the main site and API routes in [`server::build_router`].

pub mod error;
pub mod handlers;
pub mod page;
pub mod rate_limit;
pub mod server;
pub mod subdomain;

pub use error::ApiError;
pub use server::{build_router, serve, AppState};
