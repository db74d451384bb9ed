//! Well-known documents.
pub mod jwks;

use axum::Router;
use axum::routing::get;

use crate::AppState;

pub fn well_known(state: AppState) -> Router {
    Router::new()
        .route("/jwks.json", get(jwks::handler))
        .with_state(state)
}
