//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::response::{Decision, to_response};
use crate::token::ValidationOutcome;

const BEARER: &str = "Bearer";

/// Token carried by an `Authorization: Bearer <token>` header.
///
/// The scheme name is case-insensitive.
fn bearer_token(req: &Request) -> Option<&str> {
    let (scheme, token) = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_once(' ')?;

    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }

    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Reject requests without a valid bearer token; attach the claims
/// otherwise.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    // A missing header is no token at all.
    let outcome = match bearer_token(&req) {
        Some(token) => state.token.validate_token(token),
        None => ValidationOutcome::Malformed,
    };

    match to_response(outcome, &state.policy) {
        Decision::Accept(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        },
        Decision::Reject(rejection) => rejection.into_response(),
    }
}
