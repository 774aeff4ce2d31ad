//! Identity provider failure taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Every failure the session layer can observe originates in the identity
//! provider. Operations release the busy flag and hand the error back to the
//! caller unmodified; forms and buttons decide what message to render.

/// Failure reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthProviderError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("malformed email address")]
    InvalidEmail,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("password is too weak (minimum {min_len} characters)")]
    WeakPassword { min_len: usize },
    #[error("no account for this email")]
    UserNotFound,
    #[error("popup closed before sign-in completed")]
    PopupClosed,
    #[error("sign-in was denied by the federated provider")]
    PopupDenied,
    #[error("network failure: {0}")]
    Network(String),
    #[error("provider error {code}: {message}")]
    Other { code: String, message: String },
}

impl AuthProviderError {
    /// Stable provider-style error code, e.g. `auth/invalid-credential`.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidCredential => "auth/invalid-credential",
            Self::InvalidEmail => "auth/invalid-email",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword { .. } => "auth/weak-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::PopupClosed => "auth/popup-closed-by-user",
            Self::PopupDenied => "auth/user-cancelled",
            Self::Network(_) => "auth/network-request-failed",
            Self::Other { code, .. } => code,
        }
    }

    /// Map a raw provider code back onto a variant. Unknown codes keep their text.
    #[must_use]
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "auth/invalid-credential" | "auth/wrong-password" => Self::InvalidCredential,
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/weak-password" => Self::WeakPassword { min_len: crate::provider::MIN_PASSWORD_LEN },
            "auth/user-not-found" => Self::UserNotFound,
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => Self::PopupClosed,
            "auth/user-cancelled" => Self::PopupDenied,
            "auth/network-request-failed" => Self::Network(message.to_owned()),
            _ => Self::Other { code: code.to_owned(), message: message.to_owned() },
        }
    }
}

/// Invalid configuration value read from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown federated provider '{0}' (expected google, github, or microsoft)")]
    UnknownFederatedProvider(String),
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
