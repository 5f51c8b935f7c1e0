//! Identity providers.
//!
//! The only client-local persisted artifact is the current user identifier,
//! kept as an opaque one-line cache file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::domain::models::{IdentityConfig, Session};
use crate::domain::ports::IdentityProvider;

/// A fixed session, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    session: Option<Session>,
}

impl StaticIdentity {
    pub fn new(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn anonymous() -> Self {
        Self { session: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_session(&self) -> Option<Session> {
        self.session.clone().filter(Session::has_identity)
    }
}

/// User id cached from a one-line file.
///
/// The file is read once when the provider is built; `store` writes it and
/// updates the cached id, so lookups never touch the filesystem.
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    path: PathBuf,
    username: Option<String>,
    token: Option<String>,
    user_id: Arc<RwLock<Option<String>>>,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let user_id = read_user_id(&path);
        Self {
            path,
            username: None,
            token: None,
            user_id: Arc::new(RwLock::new(user_id)),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a user id to the cache file.
    pub fn store(&self, user_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let user_id = user_id.trim();
        std::fs::write(&self.path, format!("{user_id}\n"))
            .with_context(|| format!("Failed to write identity cache {}", self.path.display()))?;

        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) =
            (!user_id.is_empty()).then(|| user_id.to_string());
        Ok(())
    }
}

fn read_user_id(path: &Path) -> Option<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no cached identity");
            return None;
        }
    };

    let user_id = raw.lines().next().unwrap_or_default().trim();
    (!user_id.is_empty()).then(|| user_id.to_string())
}

impl IdentityProvider for FileIdentityProvider {
    fn current_session(&self) -> Option<Session> {
        let user_id = self
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;

        Some(Session {
            user_id,
            username: self.username.clone(),
            token: self.token.clone(),
        })
    }
}

/// Build the identity provider described by configuration.
///
/// An explicit `user_id` wins over the cache file; with neither, the
/// session is anonymous and every eligibility check answers "no".
pub fn identity_from_config(config: &IdentityConfig) -> Arc<dyn IdentityProvider> {
    if let Some(user_id) = &config.user_id {
        let mut session = Session::new(user_id.clone());
        session.username.clone_from(&config.username);
        session.token.clone_from(&config.token);
        return Arc::new(StaticIdentity::new(session));
    }

    match &config.cache_file {
        Some(path) => Arc::new(
            FileIdentityProvider::new(path)
                .with_username(config.username.clone())
                .with_token(config.token.clone()),
        ),
        None => Arc::new(StaticIdentity::anonymous()),
    }
}
