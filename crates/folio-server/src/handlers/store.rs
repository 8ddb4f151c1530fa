//! Store subdomain. The store itself is hosted elsewhere.

use crate::server::AppState;
use axum::response::{IntoResponse, Redirect, Response};

pub fn index(state: &AppState) -> Response {
    Redirect::temporary(&state.folio.settings().store_url).into_response()
}
