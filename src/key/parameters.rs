//! JSON document holding RSA key parameters.
//!
//! Values are standard base64 of big-endian integers. Member names follow
//! the `RSAParameters` layout (`Modulus`, `Exponent`, `D`, `P`, `Q`, `DP`,
//! `DQ`, `InverseQ`); snake_case spellings are accepted on input.

use base64ct::{Base64, Encoding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{KeyMaterialError, Result};

/// Persisted RSA private key.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RsaKeyParameters {
    #[serde(rename = "Modulus", alias = "modulus")]
    pub modulus: String,
    #[serde(rename = "Exponent", alias = "exponent")]
    pub exponent: String,
    #[serde(rename = "D", alias = "d")]
    pub d: String,
    #[serde(rename = "P", alias = "p")]
    pub p: String,
    #[serde(rename = "Q", alias = "q")]
    pub q: String,
    /// CRT values are recomputed on load.
    #[serde(
        rename = "DP",
        alias = "dp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dp: Option<String>,
    #[serde(
        rename = "DQ",
        alias = "dq",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dq: Option<String>,
    #[serde(
        rename = "InverseQ",
        alias = "inverse_q",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inverse_q: Option<String>,
}

fn decode(name: &'static str, value: &str) -> Result<BigUint> {
    let bytes = Zeroizing::new(
        Base64::decode_vec(value.trim())
            .map_err(|_| KeyMaterialError::Base64(name))?,
    );
    Ok(BigUint::from_bytes_be(&bytes))
}

fn encode(value: &BigUint) -> String {
    let bytes = Zeroizing::new(value.to_bytes_be());
    Base64::encode_string(&bytes)
}

impl RsaKeyParameters {
    /// Rebuild the private key. Consistency is checked by the caller.
    pub fn to_private_key(&self) -> Result<RsaPrivateKey> {
        let n = decode("Modulus", &self.modulus)?;
        let e = decode("Exponent", &self.exponent)?;
        let d = decode("D", &self.d)?;
        let p = decode("P", &self.p)?;
        let q = decode("Q", &self.q)?;

        Ok(RsaPrivateKey::from_components(n, e, d, vec![p, q])?)
    }

    pub(super) fn from_private_key(key: &RsaPrivateKey) -> Result<Self> {
        let [p, q] = key.primes() else {
            return Err(KeyMaterialError::MultiPrime(key.primes().len()));
        };
        let one = BigUint::from(1u32);
        let dp = key.d() % (p - &one);
        let dq = key.d() % (q - &one);

        Ok(Self {
            modulus: encode(key.n()),
            exponent: encode(key.e()),
            d: encode(key.d()),
            p: encode(p),
            q: encode(q),
            dp: Some(encode(&dp)),
            dq: Some(encode(&dq)),
            inverse_q: key.crt_coefficient().map(|c| encode(&c)),
        })
    }
}
