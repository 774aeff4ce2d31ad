//! Session layer configuration parsed from environment variables.

use crate::error::ConfigError;
use crate::provider::FederatedProvider;

pub const DEFAULT_FLAG_COOKIE: &str = "admin-template-auth";
pub const DEFAULT_FLAG_TTL_DAYS: u32 = 7;
pub const DEFAULT_HOME_ROUTE: &str = "/";
pub const DEFAULT_LOGIN_ROUTE: &str = "/authentication";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Name of the client-readable login flag cookie.
    pub flag_cookie: String,
    /// Lifetime of the login flag, in days.
    pub flag_ttl_days: u32,
    /// Route pushed after a successful register/login.
    pub home_route: String,
    /// Route the guard redirects unauthenticated visitors to.
    pub login_route: String,
    /// Provider used by `login_with_federated_provider`.
    pub federated_provider: FederatedProvider,
    /// Mark the flag cookie `Secure`.
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            flag_cookie: DEFAULT_FLAG_COOKIE.to_owned(),
            flag_ttl_days: DEFAULT_FLAG_TTL_DAYS,
            home_route: DEFAULT_HOME_ROUTE.to_owned(),
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            federated_provider: FederatedProvider::Google,
            cookie_secure: false,
        }
    }
}

impl AuthConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_FLAG_COOKIE`: default `admin-template-auth`
    /// - `AUTH_FLAG_TTL_DAYS`: default 7
    /// - `AUTH_HOME_ROUTE`: default `/`
    /// - `AUTH_LOGIN_ROUTE`: default `/authentication`
    /// - `AUTH_FEDERATED_PROVIDER`: `google` (default), `github`, or `microsoft`
    /// - `COOKIE_SECURE`: default false
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let flag_ttl_days = match env_nonempty("AUTH_FLAG_TTL_DAYS") {
            Some(raw) => parse_ttl_days(&raw)?,
            None => defaults.flag_ttl_days,
        };
        let federated_provider = match env_nonempty("AUTH_FEDERATED_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.federated_provider,
        };

        Ok(Self {
            flag_cookie: env_nonempty("AUTH_FLAG_COOKIE").unwrap_or(defaults.flag_cookie),
            flag_ttl_days,
            home_route: env_nonempty("AUTH_HOME_ROUTE").unwrap_or(defaults.home_route),
            login_route: env_nonempty("AUTH_LOGIN_ROUTE").unwrap_or(defaults.login_route),
            federated_provider,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(defaults.cookie_secure),
        })
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_ttl_days(raw: &str) -> Result<u32, ConfigError> {
    raw.parse::<u32>()
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| ConfigError::InvalidNumber { var: "AUTH_FLAG_TTL_DAYS", value: raw.to_owned() })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
