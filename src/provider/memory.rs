//! In-process identity provider.
//!
//! ARCHITECTURE
//! ============
//! Accounts, the signed-in principal, and live subscribers share one mutex.
//! Every sign-in, sign-up, popup completion, and sign-out broadcasts the new
//! principal to subscribers, matching how hosted providers fire their
//! id-token listeners. A fresh subscriber receives the current principal
//! immediately.
//!
//! Popup flows are scripted with [`PopupOutcome`] so tests can drive consent,
//! cancellation, and denial without a browser.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    FederatedProvider, IdentityProvider, IdentitySubscription, MIN_PASSWORD_LEN, Principal, ProviderInfo, Unsubscribe,
};
use crate::error::AuthProviderError;

pub const PASSWORD_PROVIDER_ID: &str = "password";

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a random 32-byte hex bearer token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Scripted result of the next popup flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    /// User consents; the federated identity carries this profile.
    Approve { email: String, display_name: Option<String>, photo_url: Option<String> },
    /// User closed the popup.
    Closed,
    /// Federated provider refused consent.
    Denied,
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: Option<String>,
    display_name: Option<String>,
    email: String,
    photo_url: Option<String>,
    providers: Vec<String>,
}

impl Account {
    fn principal(&self) -> Principal {
        Principal {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            email: Some(self.email.clone()),
            provider_data: self
                .providers
                .iter()
                .map(|id| ProviderInfo { provider_id: id.clone() })
                .collect(),
            photo_url: self.photo_url.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    current: Option<Principal>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<Option<Principal>>>,
    next_subscriber: u64,
    subscriptions_opened: usize,
    subscriptions_closed: usize,
    popup_script: VecDeque<PopupOutcome>,
    offline: bool,
    tokens_issued: usize,
}

impl Inner {
    fn check_online(&self) -> Result<(), AuthProviderError> {
        if self.offline {
            return Err(AuthProviderError::Network("provider unreachable".into()));
        }
        Ok(())
    }

    fn set_current(&mut self, principal: Option<Principal>) {
        self.current = principal;
        let current = self.current.clone();
        self.subscribers
            .retain(|_, tx| tx.send(current.clone()).is_ok());
    }
}

/// Identity provider backed by process memory. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-update; the maps stay usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue the outcome of the next popup flow. Without a script, popups are closed.
    pub fn script_popup(&self, outcome: PopupOutcome) {
        self.lock().popup_script.push_back(outcome);
    }

    /// Simulate loss of connectivity: every async call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Force the provider-side principal, notifying subscribers (e.g. another tab signing out).
    pub fn force_current(&self, principal: Option<Principal>) {
        self.lock().set_current(principal);
    }

    #[must_use]
    pub fn current(&self) -> Option<Principal> {
        self.lock().current.clone()
    }

    #[must_use]
    pub fn active_subscribers(&self) -> usize {
        self.lock().subscribers.len()
    }

    #[must_use]
    pub fn subscriptions_opened(&self) -> usize {
        self.lock().subscriptions_opened
    }

    #[must_use]
    pub fn subscriptions_closed(&self) -> usize {
        self.lock().subscriptions_closed
    }

    #[must_use]
    pub fn tokens_issued(&self) -> usize {
        self.lock().tokens_issued
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Principal, AuthProviderError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let email = normalize_email(email).ok_or(AuthProviderError::InvalidEmail)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthProviderError::WeakPassword { min_len: MIN_PASSWORD_LEN });
        }
        if inner.accounts.contains_key(&email) {
            return Err(AuthProviderError::EmailAlreadyInUse);
        }

        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            password: Some(password.to_owned()),
            display_name: None,
            email: email.clone(),
            photo_url: None,
            providers: vec![PASSWORD_PROVIDER_ID.to_owned()],
        };
        let principal = account.principal();
        inner.accounts.insert(email, account);
        inner.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthProviderError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let email = normalize_email(email).ok_or(AuthProviderError::InvalidEmail)?;
        let principal = match inner.accounts.get(&email) {
            Some(account) if account.password.as_deref() == Some(password) => account.principal(),
            _ => return Err(AuthProviderError::InvalidCredential),
        };
        inner.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in_with_popup(&self, provider: FederatedProvider) -> Result<Principal, AuthProviderError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let (email, display_name, photo_url) = match inner.popup_script.pop_front() {
            Some(PopupOutcome::Approve { email, display_name, photo_url }) => (email, display_name, photo_url),
            Some(PopupOutcome::Denied) => return Err(AuthProviderError::PopupDenied),
            Some(PopupOutcome::Closed) | None => return Err(AuthProviderError::PopupClosed),
        };
        let email = normalize_email(&email).ok_or(AuthProviderError::InvalidEmail)?;
        let provider_id = provider.provider_id().to_owned();

        let account = inner
            .accounts
            .entry(email.clone())
            .or_insert_with(|| Account {
                uid: Uuid::new_v4().simple().to_string(),
                password: None,
                display_name: None,
                email,
                photo_url: None,
                providers: Vec::new(),
            });
        if !account.providers.contains(&provider_id) {
            account.providers.push(provider_id);
        }
        if display_name.is_some() {
            account.display_name = display_name;
        }
        if photo_url.is_some() {
            account.photo_url = photo_url;
        }

        let principal = account.principal();
        inner.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        let mut inner = self.lock();
        inner.check_online()?;
        inner.set_current(None);
        Ok(())
    }

    async fn id_token(&self, principal: &Principal) -> Result<String, AuthProviderError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let signed_in = inner
            .current
            .as_ref()
            .is_some_and(|current| current.uid == principal.uid);
        if !signed_in {
            return Err(AuthProviderError::Other {
                code: "auth/user-token-expired".into(),
                message: format!("principal {} is not signed in", principal.uid),
            });
        }
        inner.tokens_issued += 1;
        Ok(generate_token())
    }

    fn subscribe_id_token_changes(&self) -> IdentitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscriptions_opened += 1;
        let _ = tx.send(inner.current.clone());
        inner.subscribers.insert(id, tx);
        drop(inner);

        let shared = self.inner.clone();
        let unsubscribe = Unsubscribe::new(move || {
            let mut inner = shared
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.subscribers.remove(&id);
            inner.subscriptions_closed += 1;
        });

        IdentitySubscription { changes: rx, unsubscribe }
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
