//! Authentication module for managing the signed-in session.
//!
//! This module provides:
//! - `SessionStore`: the single source of truth for who is signed in
//! - `SessionStorage`: where the session is persisted between runs
//!   (`FileStorage`, `KeyringStorage`, `MemoryStorage`)
//!
//! A session is persisted as three independent keys (identity, access
//! credential, refresh credential) that are either all present or all absent.

pub mod session;
pub mod storage;

pub use session::{Identity, SessionData, SessionEvent, SessionStore};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
