//! Build and sign tokens.

use std::sync::Arc;

use jsonwebtoken::{Header, encode};

use super::TokenOptions;
use super::claims::{ClaimSet, Claims, RESERVED_CLAIMS};

/// Error raised while issuing a single token.
///
/// Only the request that triggered it is rejected.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("claim `{0}` is set by the issuer and cannot be supplied")]
    ReservedClaim(String),
    #[error("claim `{0}` holds a value that cannot be serialized")]
    UnsupportedValue(String),
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Signs tokens with the configured credential.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    options: Arc<TokenOptions>,
}

impl TokenIssuer {
    /// Create a new [`TokenIssuer`].
    pub fn new(options: Arc<TokenOptions>) -> Self {
        Self { options }
    }

    /// Issue a token for `claims`, issued at `issued_at` (Unix seconds).
    ///
    /// With an `RS*` algorithm the output is a pure function of its inputs.
    pub fn issue(
        &self,
        claims: &ClaimSet,
        issued_at: u64,
    ) -> Result<String, IssuanceError> {
        if claims.subject().is_empty() {
            return Err(IssuanceError::EmptySubject);
        }

        for (name, value) in claims.custom() {
            if RESERVED_CLAIMS.contains(&name.as_str()) {
                return Err(IssuanceError::ReservedClaim(name.clone()));
            }
            if !value.is_serializable() {
                return Err(IssuanceError::UnsupportedValue(name.clone()));
            }
        }

        let credential = &self.options.credential;
        let mut header = Header::new(credential.algorithm());
        header.kid = Some(credential.key_id().to_owned());

        let claims = Claims {
            sub: claims.subject().to_owned(),
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.options.lifetime.as_secs()),
            custom: claims.custom().clone(),
        };

        Ok(encode(&header, &claims, credential.key())?)
    }
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64UrlUnpadded, Encoding};

    use super::*;
    use crate::token::claims::ClaimValue;
    use crate::token::tests::options;

    const NOW: u64 = 1_700_000_000;

    fn segment(token: &str, index: usize) -> serde_json::Value {
        let part = token.split('.').nth(index).unwrap();
        serde_json::from_slice(&Base64UrlUnpadded::decode_vec(part).unwrap())
            .unwrap()
    }

    #[test]
    fn test_mandatory_claims() {
        let issuer = TokenIssuer::new(Arc::new(options()));
        let token = issuer
            .issue(&ClaimSet::new("alice").with("role", "admin"), NOW)
            .unwrap();

        assert_eq!(token.split('.').count(), 3);

        let header = segment(&token, 0);
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["kid"], "test");

        let payload = segment(&token, 1);
        assert_eq!(payload["sub"], "alice");
        assert_eq!(payload["iss"], "ExampleIssuer");
        assert_eq!(payload["aud"], "ExampleAudience");
        assert_eq!(payload["iat"], NOW);
        assert_eq!(payload["exp"], NOW + 3600);
        assert_eq!(payload["role"], "admin");
    }

    #[test]
    fn test_deterministic() {
        let issuer = TokenIssuer::new(Arc::new(options()));
        let claims = ClaimSet::new("alice").with("a", 1).with("b", "two");

        assert_eq!(
            issuer.issue(&claims, NOW).unwrap(),
            issuer.issue(&claims, NOW).unwrap()
        );
        assert_ne!(
            issuer.issue(&claims, NOW).unwrap(),
            issuer.issue(&claims, NOW + 1).unwrap()
        );
    }

    #[test]
    fn test_only_url_safe_characters() {
        let issuer = TokenIssuer::new(Arc::new(options()));
        let token = issuer
            .issue(&ClaimSet::new("alice").with("bin", "???>>>~~~"), NOW)
            .unwrap();

        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
        );
    }

    #[test]
    fn test_rejected_claims() {
        let issuer = TokenIssuer::new(Arc::new(options()));

        assert!(matches!(
            issuer.issue(&ClaimSet::new(""), NOW),
            Err(IssuanceError::EmptySubject)
        ));
        assert!(matches!(
            issuer.issue(&ClaimSet::new("alice").with("exp", 1), NOW),
            Err(IssuanceError::ReservedClaim(name)) if name == "exp"
        ));
        assert!(matches!(
            issuer.issue(
                &ClaimSet::new("alice").with("score", ClaimValue::Float(f64::NAN)),
                NOW
            ),
            Err(IssuanceError::UnsupportedValue(name)) if name == "score"
        ));
    }

    #[test]
    fn test_lifetime_saturates() {
        let issuer = TokenIssuer::new(Arc::new(options()));
        let token = issuer.issue(&ClaimSet::new("alice"), u64::MAX - 1).unwrap();
        assert_eq!(segment(&token, 1)["exp"], u64::MAX);
    }
}
