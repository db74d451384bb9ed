//! Configuration manager.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum::http::StatusCode;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::key::{DEFAULT_KID, KeyMaterialError, KeyPair, KeySource};
use crate::response::RejectionPolicy;
use crate::token::{DEFAULT_LIFETIME, TokenOptions};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_ISSUER: &str = "ExampleIssuer";
const DEFAULT_AUDIENCE: &str = "ExampleAudience";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that may occur during the configuration loading process.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to deserialize configuration: {0}")]
    Deserialize(#[from] serde_yaml::Error),
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("`invalid_token_status` must be 401 or 500, got {0}")]
    InvalidStatus(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket address to listen on.
    pub address: String,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to token issuance and validation.
    #[serde(skip_serializing)]
    pub token: TokenConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            version: VERSION.to_owned(),
            path: PathBuf::new(),
            token: TokenConfig::default(),
        }
    }
}

/// Token configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Expected and written `iss`.
    pub issuer: String,
    /// Expected and written `aud`.
    pub audience: String,
    /// Persisted key. An ephemeral key is generated when absent.
    pub key_file: Option<PathBuf>,
    /// Written in the token header and JWKS document.
    pub key_id: Option<String>,
    pub algorithm: Algorithm,
    /// Clock skew tolerance, in seconds.
    pub clock_skew: u64,
    /// Token lifetime, in seconds.
    pub lifetime: u64,
    /// Signatures are always checked; `false` only triggers a warning.
    pub validate_signature: bool,
    /// Status for invalid (not expired) tokens: 401 or 500.
    pub invalid_token_status: u16,
    /// Mount `POST /token`.
    pub issue_endpoint: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            key_file: None,
            key_id: None,
            algorithm: Algorithm::RS256,
            clock_skew: 0,
            lifetime: DEFAULT_LIFETIME.as_secs(),
            validate_signature: true,
            invalid_token_status: StatusCode::UNAUTHORIZED.as_u16(),
            issue_endpoint: false,
        }
    }
}

impl TokenConfig {
    pub fn key_source(&self) -> KeySource {
        match &self.key_file {
            Some(path) => KeySource::File(path.clone()),
            None => KeySource::Generate,
        }
    }

    pub fn key_id(&self) -> &str {
        self.key_id.as_deref().unwrap_or(DEFAULT_KID)
    }

    pub fn rejection_policy(&self) -> Result<RejectionPolicy, ConfigError> {
        let status = match self.invalid_token_status {
            401 => StatusCode::UNAUTHORIZED,
            500 => StatusCode::INTERNAL_SERVER_ERROR,
            other => return Err(ConfigError::InvalidStatus(other)),
        };

        Ok(RejectionPolicy {
            invalid_token_status: status,
        })
    }

    /// Build immutable options around the loaded key.
    pub fn options(
        &self,
        keys: &KeyPair,
    ) -> Result<TokenOptions, KeyMaterialError> {
        if !self.validate_signature {
            tracing::warn!(
                "`validate_signature: false` is ignored, signatures are always verified"
            );
        }

        Ok(TokenOptions {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            credential: keys.signing_credential(self.algorithm, self.key_id())?,
            clock_skew: Duration::from_secs(self.clock_skew),
            lifetime: Duration::from_secs(self.lifetime),
        })
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, ConfigError> {
        let file_path = if self.path.as_os_str().is_empty() {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        } else {
            self.path.clone()
        };

        match File::open(&file_path) {
            Ok(file) => {
                let mut config: Configuration = serde_yaml::from_reader(file)?;

                // set app version.
                config.version = VERSION.to_owned();
                config.path = file_path;
                // reject bad policies before any key is loaded.
                config.token.rejection_policy()?;

                Ok(Arc::new(config))
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Ok(Arc::new(self.error(err)))
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "configuration file not found, using defaults");
        Self {
            path: self.path.clone(),
            ..Default::default()
        }
    }
}
