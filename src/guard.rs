//! Required-auth route gate for dashboard pages.
//!
//! Every dashboard page sits behind this check. While the session is still
//! resolving the page shows a spinner; once settled, visitors without a
//! session are sent to the login route.

use crate::config::AuthConfig;
use crate::flag::{FlagStore, LoginFlag};
use crate::session::{Session, SessionState};

/// What a protected page should do for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; render a placeholder.
    Pending,
    /// Render the page for this user.
    Allow(Session),
    /// Navigate away to this route.
    Redirect(String),
}

#[must_use]
pub fn require_auth(state: &SessionState, config: &AuthConfig) -> GuardDecision {
    if state.loading {
        return GuardDecision::Pending;
    }
    match state.visible_user() {
        Some(user) => GuardDecision::Allow(user.clone()),
        None => GuardDecision::Redirect(config.login_route.clone()),
    }
}

/// Pre-render hint: a returning visitor carries the login flag before the
/// session itself is available. Never treat this as authentication.
#[must_use]
pub fn presumed_logged_in(flags: &dyn FlagStore, config: &AuthConfig) -> bool {
    LoginFlag::from_config(config).is_set(flags)
}
