//! REST API module for the storefront backend.
//!
//! This module provides:
//! - `Gateway`: the single path to the backend. Attaches the bearer
//!   credential from the `SessionStore` and renews it once on a 401.
//! - `StorefrontClient`: typed catalog, cart, order and back-office calls
//!   built on the gateway.
//!
//! The backend issues a short-lived access token and a longer-lived refresh
//! token at sign-in; only the refresh token can mint a new access token.

pub mod client;
pub mod error;
pub mod gateway;
pub mod request;

pub use client::StorefrontClient;
pub use error::ApiError;
pub use gateway::Gateway;
pub use request::{FormPart, PendingRequest, RequestBody};
