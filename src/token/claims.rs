//! Pieces of information asserted on a token.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Claims set by the issuer itself. Callers cannot supply them.
pub const RESERVED_CLAIMS: [&str; 5] = ["sub", "iss", "aud", "iat", "exp"];

/// Value of a custom claim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ClaimValue>),
}

impl ClaimValue {
    /// NumericDate (seconds since the Unix epoch) for `time`.
    ///
    /// Instants before the epoch are clamped to it.
    pub fn timestamp(time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::Integer(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Whether the value has a JSON representation.
    pub(crate) fn is_serializable(&self) -> bool {
        match self {
            Self::Float(value) => value.is_finite(),
            Self::List(values) => values.iter().all(Self::is_serializable),
            _ => true,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for ClaimValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<SystemTime> for ClaimValue {
    fn from(value: SystemTime) -> Self {
        Self::timestamp(value)
    }
}

impl<T: Into<ClaimValue>> From<Vec<T>> for ClaimValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Claims supplied by the caller when asking for a token.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ClaimSet {
    #[serde(rename = "sub")]
    subject: String,
    #[serde(default, rename = "claims")]
    custom: BTreeMap<String, ClaimValue>,
}

impl ClaimSet {
    /// Create a new [`ClaimSet`] for `subject`.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            custom: BTreeMap::new(),
        }
    }

    /// Add a custom claim.
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<ClaimValue>,
    ) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a custom claim, returning the previous value if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ClaimValue>,
    ) -> Option<ClaimValue> {
        self.custom.insert(name.into(), value.into())
    }

    /// Subject identity.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Custom claims, sorted by name.
    pub fn custom(&self) -> &BTreeMap<String, ClaimValue> {
        &self.custom
    }
}

/// Full claim set carried by an issued token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity.
    pub sub: String,
    /// Organization that issued the token.
    pub iss: String,
    /// Recipients that the token is intended for.
    pub aud: String,
    /// Time at which the token was issued.
    pub iat: u64,
    /// Time after which the token must not be accepted.
    pub exp: u64,
    /// Everything else, sorted by name.
    #[serde(flatten)]
    pub custom: BTreeMap<String, ClaimValue>,
}

impl Claims {
    /// Custom claim by name.
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.custom.get(name)
    }

    /// Whether every claim of `set` is carried with the same value.
    pub fn contains(&self, set: &ClaimSet) -> bool {
        self.sub == set.subject
            && set
                .custom
                .iter()
                .all(|(name, value)| self.custom.get(name) == Some(value))
    }
}
