//! Operator session state
//!
//! Tracks who is logged in, the auth token with its expiry, and whether the
//! client currently considers itself offline. The offline flag is derived:
//! it flips on the outcome of the most recent sync attempt, never set
//! directly by user action.

use chrono::{DateTime, Duration, Utc};

/// Auth token lifetime in minutes
pub const TOKEN_LIFETIME_MINUTES: i64 = 480;

/// Per-operator session context
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user_name: String,
    token: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
    offline: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful login. A `None` token means the server runs
    /// without authentication; the session is still considered active.
    pub fn begin(&mut self, user_name: impl Into<String>, token: Option<String>) {
        self.user_name = user_name.into();
        self.token_expiry = token
            .as_ref()
            .map(|_| Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINUTES));
        self.token = token;
    }

    /// End the session, dropping the token.
    pub fn end(&mut self) {
        self.user_name.clear();
        self.token = None;
        self.token_expiry = None;
    }

    pub fn is_active(&self) -> bool {
        !self.user_name.is_empty()
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Current token, or `None` when absent or past its lifetime.
    pub fn token(&self) -> Option<&str> {
        match self.token_expiry {
            Some(expiry) if Utc::now() >= expiry => None,
            _ => self.token.as_deref(),
        }
    }

    pub fn token_expired(&self) -> bool {
        matches!(self.token_expiry, Some(expiry) if Utc::now() >= expiry)
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Update the offline flag from a sync outcome. Returns `true` when the
    /// flag actually changed, so the caller can notify on transitions only.
    pub fn set_offline(&mut self, offline: bool) -> bool {
        let changed = self.offline != offline;
        self.offline = offline;
        changed
    }
}
