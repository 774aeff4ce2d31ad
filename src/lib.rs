//! # dashboard-session
//!
//! Authentication session layer for the admin dashboard. Wraps a hosted
//! identity provider behind [`provider::IdentityProvider`], keeps the current
//! user and loading flag observable through [`manager::SessionManager`], and
//! mirrors login state into a client-readable cookie flag so route guards can
//! decide before the full session resolves.
//!
//! The crate does no token verification or protocol work of its own; all of
//! that belongs to the provider.

pub mod config;
pub mod error;
pub mod flag;
pub mod guard;
pub mod manager;
pub mod provider;
pub mod router;
pub mod session;

pub use config::AuthConfig;
pub use error::AuthProviderError;
pub use manager::{MountHandle, SessionManager};
pub use session::{Session, SessionState};
