//! Client-readable login flag.
//!
//! DESIGN
//! ======
//! The flag is a single `name=true` cookie with a multi-day expiry. It is a
//! hint, not a credential: route guards read it before the full session is
//! resolved to decide whether a returning visitor is worth waiting for.
//!
//! [`FlagStore`] abstracts where the flag lives. [`MemoryFlagStore`] keeps
//! entries in process memory; [`cookie::CookieFlagStore`] reads and emits real
//! cookies through an `axum_extra` jar for server-rendered shells.

pub mod cookie;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use time::{Duration, OffsetDateTime};

use crate::config::AuthConfig;

pub use cookie::CookieFlagStore;

/// Key-value store with per-entry expiry, scoped to one client.
pub trait FlagStore: Send + Sync {
    fn set(&self, name: &str, value: &str, expires_in_days: u32);
    fn remove(&self, name: &str);
    fn get(&self, name: &str) -> Option<String>;
}

// =============================================================================
// LOGIN FLAG
// =============================================================================

/// Name and lifetime of the presumed-login cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFlag {
    name: String,
    ttl_days: u32,
}

impl LoginFlag {
    pub const VALUE: &'static str = "true";

    #[must_use]
    pub fn new(name: impl Into<String>, ttl_days: u32) -> Self {
        Self { name: name.into(), ttl_days }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.flag_cookie.clone(), config.flag_ttl_days)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn ttl_days(&self) -> u32 {
        self.ttl_days
    }

    /// Set the flag when logged in, remove it otherwise.
    pub fn mark(&self, store: &dyn FlagStore, logged_in: bool) {
        if logged_in {
            store.set(&self.name, Self::VALUE, self.ttl_days);
        } else {
            store.remove(&self.name);
        }
    }

    #[must_use]
    pub fn is_set(&self, store: &dyn FlagStore) -> bool {
        store.get(&self.name).is_some_and(|v| !v.is_empty())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: OffsetDateTime,
}

/// Flag store kept in process memory. Expired entries read as absent.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryFlagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn expires_at(&self, name: &str) -> Option<OffsetDateTime> {
        self.lock().get(name).map(|e| e.expires_at)
    }

    pub(crate) fn get_at(&self, name: &str, now: OffsetDateTime) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(name) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(name);
                None
            }
            None => None,
        }
    }
}

impl FlagStore for MemoryFlagStore {
    fn set(&self, name: &str, value: &str, expires_in_days: u32) {
        let expires_at = OffsetDateTime::now_utc() + Duration::days(i64::from(expires_in_days));
        self.lock()
            .insert(name.to_owned(), Entry { value: value.to_owned(), expires_at });
    }

    fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    fn get(&self, name: &str) -> Option<String> {
        self.get_at(name, OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
