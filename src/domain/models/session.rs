//! Explicit session context threaded through every backend call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the user a gateway or aggregator call is made on behalf of.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque global user identifier
    pub user_id: String,

    /// Display name as it appears in conversation rosters
    #[serde(default)]
    pub username: Option<String>,

    /// Bearer token for the authenticated RPC channel
    #[serde(default)]
    pub token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: None,
            token: None,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Whether the session carries a usable user identifier.
    pub fn has_identity(&self) -> bool {
        !self.user_id.trim().is_empty()
    }

    /// Name used to find the user in a roster. Falls back to the user id.
    pub fn roster_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.user_id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
