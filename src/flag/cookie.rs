//! Cookie-backed flag store for server-rendered shells.
//!
//! The jar starts from the request's `Cookie` header and accumulates
//! `Set-Cookie` changes; hand [`CookieFlagStore::jar`] back to axum as a
//! response part. Flag cookies stay readable from client scripts, so they are
//! never `HttpOnly`.

use std::sync::{Mutex, MutexGuard};

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::FlagStore;

#[derive(Debug)]
pub struct CookieFlagStore {
    jar: Mutex<CookieJar>,
    secure: bool,
}

impl CookieFlagStore {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { jar: Mutex::new(CookieJar::new()), secure }
    }

    /// Seed the store with the cookies a request arrived with.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
        Self { jar: Mutex::new(CookieJar::from_headers(headers)), secure }
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        self.jar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of the jar including pending `Set-Cookie` changes.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        self.lock().clone()
    }

    fn build(&self, name: &str, value: &str, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_owned(), value.to_owned()))
            .path("/")
            .http_only(false)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }

    fn add(&self, cookie: Cookie<'static>) {
        let mut guard = self.lock();
        let jar = std::mem::replace(&mut *guard, CookieJar::new());
        *guard = jar.add(cookie);
    }
}

impl FlagStore for CookieFlagStore {
    fn set(&self, name: &str, value: &str, expires_in_days: u32) {
        let cookie = self.build(name, value, Duration::days(i64::from(expires_in_days)));
        self.add(cookie);
    }

    fn remove(&self, name: &str) {
        let cookie = self.build(name, "", Duration::ZERO);
        self.add(cookie);
    }

    fn get(&self, name: &str) -> Option<String> {
        let jar = self.lock();
        let cookie = jar.get(name)?;
        if cookie.value().is_empty() || cookie.max_age() == Some(Duration::ZERO) {
            return None;
        }
        Some(cookie.value().to_owned())
    }
}

#[cfg(test)]
#[path = "cookie_test.rs"]
mod tests;
