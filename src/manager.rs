//! Session manager — the app-wide authentication façade.
//!
//! ARCHITECTURE
//! ============
//! One [`SessionManager`] is built at the application root and handed to every
//! consumer (route guard, header, sidebar) as an `Arc`. It owns the observable
//! [`SessionState`] on a `watch` channel and mirrors login state into the
//! client-readable [`LoginFlag`]. Identity changes reach it either through the
//! four operations or through the provider's id-token change stream, and both
//! paths funnel into [`SessionManager::configure_session`], the only place the
//! session is replaced.
//!
//! CONCURRENCY
//! ===========
//! Operations hold a `BusyGuard` for their whole duration; its `Drop`
//! clears the loading flag on success, error, and cancellation alike.
//! Overlapping operations are not serialized: each one publishes its own
//! result and the last write wins. The in-flight counter only exists to log
//! the overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthProviderError;
use crate::flag::{FlagStore, LoginFlag};
use crate::provider::{IdentityProvider, IdentitySubscription, Principal, Unsubscribe};
use crate::router::Navigator;
use crate::session::{Session, SessionState, has_email};

// =============================================================================
// BUSY GUARD
// =============================================================================

/// Marks the manager busy for the lifetime of one operation.
struct BusyGuard<'a> {
    manager: &'a SessionManager,
    op: &'static str,
}

impl<'a> BusyGuard<'a> {
    fn acquire(manager: &'a SessionManager, op: &'static str) -> Self {
        let prior = manager.in_flight.fetch_add(1, Ordering::SeqCst);
        if prior > 0 {
            warn!(op, in_flight = prior + 1, "overlapping session operation; last write wins");
        }
        manager.set_loading(true);
        debug!(op, "session operation started");
        Self { manager, op }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.manager.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.manager.set_loading(false);
        debug!(op = self.op, "session operation settled");
    }
}

fn log_failure(op: &'static str, err: &AuthProviderError) {
    warn!(op, code = err.code(), error = %err, "identity provider rejected request");
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    flags: Arc<dyn FlagStore>,
    navigator: Arc<dyn Navigator>,
    config: AuthConfig,
    login_flag: LoginFlag,
    state: watch::Sender<SessionState>,
    in_flight: AtomicUsize,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        flags: Arc<dyn FlagStore>,
        navigator: Arc<dyn Navigator>,
        config: AuthConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let login_flag = LoginFlag::from_config(&config);
        Self { provider, flags, navigator, config, login_flag, state, in_flight: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn login_flag(&self) -> &LoginFlag {
        &self.login_flag
    }

    /// Current snapshot of user + loading.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<Session> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Create an email/password account, establish its session, and go home.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthProviderError`] unmodified; nothing is navigated.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthProviderError> {
        let _busy = BusyGuard::acquire(self, "register");
        let result = self.provider.create_account(email, password).await;
        self.complete_sign_in("register", result).await
    }

    /// Sign in an existing email/password account and go home.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthProviderError`] unmodified; nothing is navigated.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthProviderError> {
        let _busy = BusyGuard::acquire(self, "login");
        let result = self.provider.sign_in(email, password).await;
        self.complete_sign_in("login", result).await
    }

    /// Run the configured federated popup flow and go home.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthProviderError`] when the popup is closed or denied.
    pub async fn login_with_federated_provider(&self) -> Result<(), AuthProviderError> {
        let _busy = BusyGuard::acquire(self, "login_with_federated_provider");
        let result = self
            .provider
            .sign_in_with_popup(self.config.federated_provider)
            .await;
        self.complete_sign_in("login_with_federated_provider", result).await
    }

    /// End the provider session and clear local state. Does not navigate;
    /// guards react to the user becoming absent.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`AuthProviderError`]; local state is left as is.
    pub async fn logout(&self) -> Result<(), AuthProviderError> {
        let _busy = BusyGuard::acquire(self, "logout");
        self.provider
            .sign_out()
            .await
            .inspect_err(|err| log_failure("logout", err))?;
        self.configure_session(None).await?;
        Ok(())
    }

    async fn complete_sign_in(
        &self,
        op: &'static str,
        result: Result<Principal, AuthProviderError>,
    ) -> Result<(), AuthProviderError> {
        let principal = result.inspect_err(|err| log_failure(op, err))?;
        self.configure_session(Some(principal)).await?;
        self.navigator.push(&self.config.home_route);
        Ok(())
    }

    /// Replace the session from a provider principal.
    ///
    /// A principal with an email becomes the current [`Session`] (with a fresh
    /// token) and sets the login flag; anything else clears both. Loading is
    /// cleared either way. Returns the session email, or `None` when cleared.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError`] if the token fetch fails; the previous
    /// session is kept and the flag is brought back in line with it.
    pub async fn configure_session(&self, principal: Option<Principal>) -> Result<Option<String>, AuthProviderError> {
        let Some(principal) = principal.filter(|p| has_email(Some(p))) else {
            self.publish(None);
            return Ok(None);
        };

        let token = match self.provider.id_token(&principal).await {
            Ok(token) => token,
            Err(err) => {
                log_failure("configure_session", &err);
                self.release_without_change();
                return Err(err);
            }
        };

        let session = Session::from_principal(&principal, token);
        let email = session.email.clone();
        self.publish(Some(session));
        Ok(email)
    }

    /// Flag and state change inside the watch write lock, so concurrent
    /// publishers cannot leave the flag describing a different session.
    fn publish(&self, user: Option<Session>) {
        self.state.send_modify(|state| {
            match (&user, state.user.is_some()) {
                (Some(session), _) => info!(uid = %session.id, provider = %session.auth_provider, "session established"),
                (None, true) => info!("session cleared"),
                (None, false) => debug!("no authenticated principal"),
            }
            self.login_flag.mark(self.flags.as_ref(), user.is_some());
            state.user = user;
            state.loading = false;
        });
    }

    /// Settle without a new session. The flag is re-derived from the kept
    /// session, which matters on startup where it may still claim a login.
    fn release_without_change(&self) {
        self.state.send_modify(|state| {
            let logged_in = state.user.is_some();
            if self.login_flag.is_set(self.flags.as_ref()) != logged_in {
                warn!(logged_in, "login flag out of step with session; resetting");
                self.login_flag.mark(self.flags.as_ref(), logged_in);
            }
            state.loading = false;
        });
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Resolve the startup session.
    ///
    /// A returning visitor (login flag present) gets a live subscription to the
    /// provider's id-token changes; every notification goes through
    /// [`configure_session`](Self::configure_session). Otherwise there is
    /// nothing to resolve and loading is cleared immediately. Must be called
    /// from within a tokio runtime.
    pub fn mount(self: &Arc<Self>) -> MountHandle {
        if !self.login_flag.is_set(self.flags.as_ref()) {
            debug!("no login flag; skipping identity subscription");
            self.set_loading(false);
            return MountHandle { subscription: None };
        }

        let IdentitySubscription { mut changes, unsubscribe } = self.provider.subscribe_id_token_changes();
        debug!("identity subscription opened");

        let manager = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(principal) = changes.recv().await {
                // Failures are logged inside configure_session.
                let _ = manager.configure_session(principal).await;
            }
        });

        MountHandle { subscription: Some(ActiveSubscription { task, unsubscribe }) }
    }
}

// =============================================================================
// MOUNT HANDLE
// =============================================================================

struct ActiveSubscription {
    task: JoinHandle<()>,
    unsubscribe: Unsubscribe,
}

/// Ties the identity subscription to the application root's lifetime.
#[must_use = "dropping the handle unmounts immediately"]
pub struct MountHandle {
    subscription: Option<ActiveSubscription>,
}

impl MountHandle {
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Cancel the subscription. Equivalent to dropping the handle.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(ActiveSubscription { task, unsubscribe }) = self.subscription.take() {
            task.abort();
            unsubscribe.cancel();
            debug!("identity subscription cancelled");
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
