//! Issue and validate signed bearer tokens.
//!
//! [`TokenService`] is the whole boundary the transport layer needs:
//! [`TokenService::issue_token`] and [`TokenService::validate_token`].

mod claims;
mod issuer;
mod validator;

use std::sync::Arc;
use std::time::Duration;

pub use claims::{ClaimSet, ClaimValue, Claims, RESERVED_CLAIMS};
pub use issuer::{IssuanceError, TokenIssuer};
pub use validator::TokenValidator;

use crate::clock::{Clock, SystemClock};
use crate::key::{PublicKey, SigningCredential};

/// Default token lifetime, one hour.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60);
/// Type advertised to clients alongside the token.
pub const TOKEN_TYPE: &str = "Bearer";

/// Options shared by the issuer and the validator.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct TokenOptions {
    /// Value of `iss` written and expected.
    pub issuer: String,
    /// Value of `aud` written and expected.
    pub audience: String,
    pub credential: SigningCredential,
    /// Tolerance granted to tokens past their expiry.
    pub clock_skew: Duration,
    /// Issued tokens expire this long after `iat`.
    pub lifetime: Duration,
}

/// Result of a validation. Exactly one per call.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    /// Every check passed.
    Valid(Claims),
    /// Genuine token, past `exp` plus the skew tolerance.
    Expired,
    /// The signature does not verify with our key and algorithm.
    InvalidSignature,
    /// Genuine token minted for another issuer or audience.
    InvalidIssuerOrAudience,
    /// Not a token at all.
    Malformed,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidIssuerOrAudience => "invalid_issuer_or_audience",
            Self::Malformed => "malformed",
        }
    }
}

/// Issue and validate tokens against the current time.
#[derive(Clone)]
pub struct TokenService {
    options: Arc<TokenOptions>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a new [`TokenService`] using the system clock.
    pub fn new(options: TokenOptions, public_key: &PublicKey) -> Self {
        let options = Arc::new(options);

        Self {
            issuer: TokenIssuer::new(Arc::clone(&options)),
            validator: TokenValidator::new(Arc::clone(&options), public_key),
            options,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &TokenOptions {
        &self.options
    }

    /// Issue a token for `claims`, valid from now on.
    pub fn issue_token(&self, claims: &ClaimSet) -> Result<String, IssuanceError> {
        let token = self.issuer.issue(claims, self.clock.now())?;
        metrics::counter!("token_issued_total").increment(1);
        Ok(token)
    }

    /// Validate `token` against the current time.
    pub fn validate_token(&self, token: &str) -> ValidationOutcome {
        let outcome = self.validator.validate(token, self.clock.now());

        if !outcome.is_valid() {
            tracing::debug!(outcome = outcome.label(), "token rejected");
        }
        metrics::counter!("token_validations_total", "outcome" => outcome.label())
            .increment(1);

        outcome
    }
}
