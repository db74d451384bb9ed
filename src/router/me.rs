//! Protected route returning the caller's validated claims.

use axum::{Extension, Json};

use crate::token::Claims;

/// Claims are attached by [`crate::middleware::authenticate`].
pub async fn handler(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}
