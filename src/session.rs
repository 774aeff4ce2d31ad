//! Normalized session model.
//!
//! DESIGN
//! ======
//! A [`Session`] is built from a provider [`Principal`] plus a freshly fetched
//! bearer token and is never edited afterwards: every identity change produces
//! a new value. [`SessionState`] pairs it with the loading flag and is what
//! consumers observe.

use serde::{Deserialize, Serialize};

use crate::provider::Principal;

/// Provider id used when a principal carries no linked provider entries.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// The application's view of an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable identifier assigned by the identity provider.
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Short-lived bearer credential. Held in memory only.
    pub access_token: String,
    /// Sign-in method that produced the session (first linked provider).
    pub auth_provider: String,
    pub avatar_url: Option<String>,
}

impl Session {
    #[must_use]
    pub fn from_principal(principal: &Principal, access_token: String) -> Self {
        let auth_provider = principal
            .provider_data
            .first()
            .map_or_else(|| UNKNOWN_PROVIDER.to_owned(), |p| p.provider_id.clone());

        Self {
            id: principal.uid.clone(),
            display_name: principal.display_name.clone(),
            email: principal.email.clone(),
            access_token,
            auth_provider,
            avatar_url: principal.photo_url.clone(),
        }
    }
}

/// True when the principal can back a session (non-empty email).
#[must_use]
pub fn has_email(principal: Option<&Principal>) -> bool {
    principal
        .and_then(|p| p.email.as_deref())
        .is_some_and(|email| !email.is_empty())
}

/// Observable pair published to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<Session>,
    pub loading: bool,
}

impl Default for SessionState {
    /// Startup state: no user yet, loading until the initial determination settles.
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

impl SessionState {
    /// The user as consumers should see it: absent while loading.
    #[must_use]
    pub fn visible_user(&self) -> Option<&Session> {
        if self.loading { None } else { self.user.as_ref() }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
