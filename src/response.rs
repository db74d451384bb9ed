//! Turn validation outcomes into what callers see.
//!
//! Only the closed [`ValidationOutcome`] reaches this module, so nothing
//! about why a token failed can leak into a response body.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::token::{Claims, ValidationOutcome};

const INVALID_TOKEN_CHALLENGE: &str = r#"Bearer error="invalid_token""#;

/// Status returned for rejected tokens other than expired ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionPolicy {
    pub invalid_token_status: StatusCode,
}

impl Default for RejectionPolicy {
    fn default() -> Self {
        Self {
            invalid_token_status: StatusCode::UNAUTHORIZED,
        }
    }
}

/// Body of a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RejectionBody {
    #[serde(rename_all = "camelCase")]
    Expired {
        authenticated: bool,
        token_expired: bool,
    },
    Invalid {
        success: bool,
    },
}

/// Response sent instead of the protected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub body: RejectionBody,
}

/// What the transport layer must do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run the protected operation with these claims attached.
    Accept(Claims),
    Reject(Rejection),
}

/// Map `outcome` to a decision.
pub fn to_response(
    outcome: ValidationOutcome,
    policy: &RejectionPolicy,
) -> Decision {
    match outcome {
        ValidationOutcome::Valid(claims) => Decision::Accept(claims),
        ValidationOutcome::Expired => Decision::Reject(Rejection {
            status: StatusCode::UNAUTHORIZED,
            body: RejectionBody::Expired {
                authenticated: false,
                token_expired: true,
            },
        }),
        ValidationOutcome::InvalidSignature
        | ValidationOutcome::InvalidIssuerOrAudience
        | ValidationOutcome::Malformed => Decision::Reject(Rejection {
            status: policy.invalid_token_status,
            body: RejectionBody::Invalid { success: false },
        }),
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(INVALID_TOKEN_CHALLENGE),
            );
        }
        response
    }
}
