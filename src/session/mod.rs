//! Session persistence between runs
//!
//! This module keeps the portal login alive across process restarts:
//! - `FileKvStore`: an explicit key/value handle over a local directory
//! - `SessionStore`: saves and restores the browser's cookies through it

mod kv;
mod store;

pub use kv::FileKvStore;
pub use store::SessionStore;

use crate::browser::Cookie;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the session key/value store
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key '{0}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidKey(String),
}

/// Result type for session store operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Cookies representing an authenticated browser context
///
/// Serialized as a bare JSON array of cookie records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    cookies: Vec<Cookie>,
}

impl Session {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}
