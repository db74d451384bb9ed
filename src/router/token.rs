//! Demonstration issuance endpoint.
//!
//! Whoever reaches it gets a token for the subject they ask for, so it is
//! only mounted when `issue_endpoint` is enabled.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::token::{ClaimSet, TOKEN_TYPE};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub access_token: String,
    pub expires_in: u64,
}

/// Handler to issue a token.
pub async fn handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<ClaimSet>, JsonRejection>,
) -> Result<Json<Response>> {
    let Json(claims) = body?;
    let access_token = state.token.issue_token(&claims)?;

    tracing::info!(subject = claims.subject(), "token issued");

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        access_token,
        expires_in: state.token.options().lifetime.as_secs(),
    }))
}
