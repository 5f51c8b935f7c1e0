//! Identity provider port.

use crate::domain::models::Session;

/// Supplies the current user's session.
///
/// Absence of a session means "not eligible", never a hard error.
pub trait IdentityProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
}
