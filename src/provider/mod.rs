//! Identity provider seam.
//!
//! DESIGN
//! ======
//! The session layer never talks to a hosted auth backend directly. Everything
//! it needs (account creation, sign-in, popup flows, token refresh, change
//! notifications) goes through [`IdentityProvider`], so tests and the demo
//! binary can swap in [`memory::MemoryIdentityProvider`].
//!
//! Change notifications are an explicit channel: subscribing returns the
//! receiving half plus an [`Unsubscribe`] handle that the owner fires exactly
//! once on teardown.

pub mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{AuthProviderError, ConfigError};

// =============================================================================
// PRINCIPAL
// =============================================================================

/// One linked sign-in method on a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Provider id, e.g. `"password"` or `"google.com"`.
    pub provider_id: String,
}

/// The provider's raw view of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Linked sign-in methods, most relevant first.
    pub provider_data: Vec<ProviderInfo>,
    pub photo_url: Option<String>,
}

/// Shortest password hosted email/password providers accept.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// FEDERATED PROVIDER KIND
// =============================================================================

/// Third-party single-sign-on method used by the popup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederatedProvider {
    Google,
    GitHub,
    Microsoft,
}

impl FederatedProvider {
    /// Provider id recorded on principals created through this method.
    #[must_use]
    pub fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::GitHub => "github.com",
            Self::Microsoft => "microsoft.com",
        }
    }
}

impl fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_id())
    }
}

impl FromStr for FederatedProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "google.com" => Ok(Self::Google),
            "github" | "github.com" => Ok(Self::GitHub),
            "microsoft" | "microsoft.com" => Ok(Self::Microsoft),
            other => Err(ConfigError::UnknownFederatedProvider(other.to_owned())),
        }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Cancellation handle for an id-token change subscription.
///
/// The wrapped callback runs at most once: either through [`Unsubscribe::cancel`]
/// or, if the owner forgets, when the handle is dropped.
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Handle that does nothing when fired.
    #[must_use]
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Live id-token change stream. `None` means the provider reports no principal.
#[derive(Debug)]
pub struct IdentitySubscription {
    pub changes: mpsc::UnboundedReceiver<Option<Principal>>,
    pub unsubscribe: Unsubscribe,
}

// =============================================================================
// IDENTITY PROVIDER TRAIT
// =============================================================================

/// Hosted identity backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] on conflicts, weak passwords, or transport failure.
    async fn create_account(&self, email: &str, password: &str) -> Result<Principal, AuthProviderError>;

    /// Sign in an existing email/password account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] on bad credentials or transport failure.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthProviderError>;

    /// Run the provider-hosted interactive consent flow.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] when the popup is closed or consent is denied.
    async fn sign_in_with_popup(&self, provider: FederatedProvider) -> Result<Principal, AuthProviderError>;

    /// End the provider-side session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] on transport failure.
    async fn sign_out(&self) -> Result<(), AuthProviderError>;

    /// Fetch a fresh bearer token for `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] if the principal is no longer signed in.
    async fn id_token(&self, principal: &Principal) -> Result<String, AuthProviderError>;

    /// Subscribe to id-token changes. Implementations deliver the current
    /// principal (or `None`) as the first notification.
    fn subscribe_id_token_changes(&self) -> IdentitySubscription;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
