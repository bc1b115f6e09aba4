//! Core library for the storefront client.
//!
//! - `auth`: the persisted session store and its storage backends
//! - `api`: the request gateway (credential attachment, renewal) and the
//!   typed storefront API built on top of it
//! - `routes`: synchronous route authorization against the session store
//! - `config`: on-disk configuration
//! - `models`: storefront data types

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;

pub use api::{ApiError, Gateway, PendingRequest, StorefrontClient};
pub use auth::{Identity, SessionData, SessionEvent, SessionStore};
pub use config::Config;
pub use routes::{Navigation, Policy, Route};
