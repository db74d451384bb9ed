//! Check incoming tokens.
//!
//! Every call ends with a [`ValidationOutcome`]; untrusted input never turns
//! into an error or a panic. The signature is always verified before any
//! embedded field is looked at.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use super::claims::Claims;
use super::{TokenOptions, ValidationOutcome};
use crate::key::PublicKey;

/// Verifies tokens against the public key and the configured options.
#[derive(Clone)]
pub struct TokenValidator {
    options: Arc<TokenOptions>,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Create a new [`TokenValidator`].
    pub fn new(options: Arc<TokenOptions>, public_key: &PublicKey) -> Self {
        let algorithm = options.credential.algorithm();

        // Issuer, audience and lifetime are checked here, in a fixed order,
        // against the caller's clock.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            options,
            algorithm,
            decoding_key: public_key.decoding_key().clone(),
            validation,
        }
    }

    /// Validate `token` at time `now` (Unix seconds).
    pub fn validate(&self, token: &str, now: u64) -> ValidationOutcome {
        if !is_well_formed(token) {
            return ValidationOutcome::Malformed;
        }

        match decode_header(token) {
            Ok(header) if header.alg == self.algorithm => {},
            // No other algorithm can verify with this key.
            Ok(_) => return ValidationOutcome::InvalidSignature,
            Err(_) => return ValidationOutcome::Malformed,
        }

        let claims = match decode::<Claims>(
            token,
            &self.decoding_key,
            &self.validation,
        ) {
            Ok(data) => data.claims,
            Err(err) => return classify(err.kind()),
        };

        if claims.iss != self.options.issuer
            || claims.aud != self.options.audience
        {
            return ValidationOutcome::InvalidIssuerOrAudience;
        }

        let skew = self.options.clock_skew.as_secs();
        if now > claims.exp.saturating_add(skew) {
            return ValidationOutcome::Expired;
        }

        ValidationOutcome::Valid(claims)
    }
}

/// Three non-empty base64url segments.
fn is_well_formed(token: &str) -> bool {
    let mut parts = 0;
    for part in token.split('.') {
        parts += 1;
        if parts > 3
            || part.is_empty()
            || Base64UrlUnpadded::decode_vec(part).is_err()
        {
            return false;
        }
    }
    parts == 3
}

fn classify(kind: &ErrorKind) -> ValidationOutcome {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::Crypto(_) => ValidationOutcome::InvalidSignature,
        _ => ValidationOutcome::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::key::KeyPair;
    use crate::key::tests::{OTHER_PEM, fixture};
    use crate::token::claims::{ClaimSet, ClaimValue};
    use crate::token::issuer::TokenIssuer;
    use crate::token::tests::options;

    const NOW: u64 = 1_700_000_000;
    const HOUR: u64 = 3600;

    fn pair(options: TokenOptions) -> (TokenIssuer, TokenValidator) {
        let options = Arc::new(options);
        let public = fixture().public_key().clone();
        (
            TokenIssuer::new(Arc::clone(&options)),
            TokenValidator::new(options, &public),
        )
    }

    #[test]
    fn test_round_trip() {
        let (issuer, validator) = pair(options());
        let claims = ClaimSet::new("alice")
            .with("role", "admin")
            .with("level", 3)
            .with("ratio", 0.25)
            .with("groups", vec!["a", "b"]);
        let token = issuer.issue(&claims, NOW).unwrap();

        match validator.validate(&token, NOW) {
            ValidationOutcome::Valid(parsed) => {
                assert!(parsed.contains(&claims));
                assert_eq!(parsed.iss, "ExampleIssuer");
                assert_eq!(parsed.aud, "ExampleAudience");
                assert_eq!(parsed.iat, NOW);
                assert_eq!(parsed.exp, NOW + HOUR);
            },
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
    }

    #[test]
    fn test_alice_scenario() {
        let (issuer, validator) = pair(options());
        let token = issuer.issue(&ClaimSet::new("alice"), NOW).unwrap();

        let ValidationOutcome::Valid(claims) = validator.validate(&token, NOW)
        else {
            panic!("token should be valid");
        };
        assert_eq!(claims.sub, "alice");
        assert!(claims.custom.is_empty());

        assert_eq!(
            validator.validate(&token, NOW + HOUR + 1),
            ValidationOutcome::Expired
        );
    }

    #[test]
    fn test_expiry_boundaries() {
        for skew in [0, 1, 300] {
            let (issuer, validator) = pair(TokenOptions {
                clock_skew: Duration::from_secs(skew),
                ..options()
            });
            let token = issuer.issue(&ClaimSet::new("alice"), NOW).unwrap();
            let expiry = NOW + HOUR;

            assert!(validator.validate(&token, expiry).is_valid());
            assert!(validator.validate(&token, expiry + skew).is_valid());
            assert_eq!(
                validator.validate(&token, expiry + skew + 1),
                ValidationOutcome::Expired
            );
        }
    }

    #[test]
    fn test_issuer_and_audience() {
        let (issuer, _) = pair(TokenOptions {
            issuer: "A".into(),
            ..options()
        });
        let (_, validator) = pair(TokenOptions {
            issuer: "B".into(),
            ..options()
        });
        let token = issuer.issue(&ClaimSet::new("alice"), NOW).unwrap();

        assert_eq!(
            validator.validate(&token, NOW),
            ValidationOutcome::InvalidIssuerOrAudience
        );
        // Issuer is checked before lifetime.
        assert_eq!(
            validator.validate(&token, NOW + 10 * HOUR),
            ValidationOutcome::InvalidIssuerOrAudience
        );

        let (issuer, _) = pair(TokenOptions {
            audience: "other".into(),
            ..options()
        });
        let (_, validator) = pair(options());
        let token = issuer.issue(&ClaimSet::new("alice"), NOW).unwrap();
        assert_eq!(
            validator.validate(&token, NOW),
            ValidationOutcome::InvalidIssuerOrAudience
        );
    }

    #[test]
    fn test_single_bit_mutations() {
        let (issuer, validator) = pair(options());
        let token = issuer
            .issue(&ClaimSet::new("alice").with("role", "user"), NOW)
            .unwrap();
        assert!(validator.validate(&token, NOW).is_valid());

        let bytes = token.as_bytes();
        for index in 0..bytes.len() {
            // Stay within ASCII so the mutated token is still a string.
            for bit in 0..7 {
                let mut mutated = bytes.to_vec();
                mutated[index] ^= 1 << bit;
                let mutated = String::from_utf8(mutated).unwrap();

                let outcome = validator.validate(&mutated, NOW);
                assert!(
                    matches!(
                        outcome,
                        ValidationOutcome::InvalidSignature
                            | ValidationOutcome::Malformed
                    ),
                    "byte {index} bit {bit} gave {outcome:?}"
                );
            }
        }
    }

    #[test]
    fn test_foreign_key() {
        let other = KeyPair::parse(OTHER_PEM).unwrap();
        let options = options();
        let other_options = Arc::new(TokenOptions {
            credential: other.signing_credential(Algorithm::RS256, "test").unwrap(),
            ..options.clone()
        });
        let token = TokenIssuer::new(other_options)
            .issue(&ClaimSet::new("mallory"), NOW)
            .unwrap();

        let (_, validator) = pair(options);
        assert_eq!(
            validator.validate(&token, NOW),
            ValidationOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_algorithm_confusion() {
        let (_, validator) = pair(options());
        let public = fixture().public_key().modulus().to_owned();

        // HMAC keyed with public material must never be accepted.
        let claims = serde_json::json!({
            "sub": "mallory", "iss": "ExampleIssuer", "aud": "ExampleAudience",
            "iat": NOW, "exp": NOW + HOUR,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(public.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            validator.validate(&token, NOW),
            ValidationOutcome::InvalidSignature
        );

        // Unsigned token.
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none"}"#);
        let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        let token = format!("{header}.{payload}.");
        assert_eq!(validator.validate(&token, NOW), ValidationOutcome::Malformed);
    }

    #[test]
    fn test_malformed() {
        let (_, validator) = pair(options());

        for token in [
            "",
            "abc",
            "a.b",
            "a.b.c.d",
            "..",
            "e30.e30.e30",
            "!!!.???.***",
            "eyJhbGciOiJSUzI1NiJ9.e30",
        ] {
            assert_eq!(
                validator.validate(token, NOW),
                ValidationOutcome::Malformed,
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_signed_but_incomplete_payload() {
        let (_, validator) = pair(options());
        let options = options();
        let credential = &options.credential;

        // Missing `exp`.
        let claims = serde_json::json!({
            "sub": "alice", "iss": "ExampleIssuer", "aud": "ExampleAudience",
            "iat": NOW,
        });
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            credential.key(),
        )
        .unwrap();
        assert_eq!(validator.validate(&token, NOW), ValidationOutcome::Malformed);

        // Audience as a list is not supported.
        let claims = serde_json::json!({
            "sub": "alice", "iss": "ExampleIssuer", "aud": ["ExampleAudience"],
            "iat": NOW, "exp": NOW + HOUR,
        });
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            credential.key(),
        )
        .unwrap();
        assert_eq!(validator.validate(&token, NOW), ValidationOutcome::Malformed);
    }

    #[test]
    fn test_foreign_claims_are_kept() {
        let (_, validator) = pair(options());
        let claims = serde_json::json!({
            "sub": "alice", "iss": "ExampleIssuer", "aud": "ExampleAudience",
            "iat": NOW, "exp": NOW + HOUR, "nbf": NOW, "jti": "abc",
        });
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            options().credential.key(),
        )
        .unwrap();

        let ValidationOutcome::Valid(parsed) = validator.validate(&token, NOW)
        else {
            panic!("token should be valid");
        };
        assert_eq!(parsed.get("jti"), Some(&ClaimValue::from("abc")));
    }
}
