//! HTTP routes calling into the token core.
pub mod me;
pub mod status;
pub mod token;
