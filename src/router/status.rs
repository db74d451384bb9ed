//! Public server status.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;

/// Structured configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    pub version: String,
    pub issuer: String,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        name: config.name.clone(),
        version: config.version().to_owned(),
        issuer: config.token.issuer.clone(),
    })
}
