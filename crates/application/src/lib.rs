//! Gatekey Application - Token lifecycle service
//!
//! This crate owns the token state machine: given whatever tokens are
//! currently held, decide whether they are still usable and, if not, how to
//! obtain new ones. All I/O goes through the ports defined here.

pub mod ports;
pub mod tokens;

pub use ports::{Clock, TokenTransport};
pub use tokens::{OnUpdate, TokenManager};
