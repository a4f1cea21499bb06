//! Token lifecycle management.
//!
//! This module provides:
//! - The [`TokenManager`] service owning a token's kind, credentials, expiry,
//!   and renewal policy
//! - The update observer callers use to persist tokens externally

mod manager;

pub use manager::{OnUpdate, TokenManager};
