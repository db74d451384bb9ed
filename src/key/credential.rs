//! Private key bound to a signature algorithm.

use std::fmt;

use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;

use super::{KeyMaterialError, Result};

/// Signature algorithms usable with an RSA key.
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Immutable signing material owned by the token issuer.
#[derive(Clone)]
pub struct SigningCredential {
    algorithm: Algorithm,
    key_id: String,
    key: EncodingKey,
}

impl SigningCredential {
    pub(super) fn new(
        private: &RsaPrivateKey,
        algorithm: Algorithm,
        key_id: String,
    ) -> Result<Self> {
        if !RSA_ALGORITHMS.contains(&algorithm) {
            return Err(KeyMaterialError::UnsupportedAlgorithm(algorithm));
        }

        // The document zeroizes itself on drop.
        let der = private.to_pkcs1_der()?;
        let key = EncodingKey::from_rsa_der(der.as_bytes());

        Ok(Self {
            algorithm,
            key_id,
            key,
        })
    }

    /// Algorithm written in the token header.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key identifier written in the token header (`kid`).
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn key(&self) -> &EncodingKey {
        &self.key
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}
