//! Based on JWK (RFC 7517 <https://datatracker.ietf.org/doc/html/rfc7517>).
//!
//! Publishes the verification key so other services can validate tokens
//! without sharing the private key.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub keys: Vec<Key>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Key {
    pub kty: String,
    pub r#use: String,
    pub key_ops: Vec<String>,
    pub alg: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

pub async fn handler(State(state): State<AppState>) -> Json<Response> {
    let credential = &state.token.options().credential;

    let keys = vec![Key {
        kty: "RSA".into(),
        r#use: "sig".into(),
        key_ops: vec!["verify".to_string()],
        alg: format!("{:?}", credential.algorithm()),
        kid: credential.key_id().to_owned(),
        n: state.public_key.modulus().to_owned(),
        e: state.public_key.exponent().to_owned(),
    }];

    Json(Response { keys })
}
