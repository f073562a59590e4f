use revu_flux::QueueClosed;
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Front ends match on these,
// never on the message text.

pub mod error_code {
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const NETWORK: &str = "NETWORK";
    pub const BACKEND: &str = "BACKEND";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
    pub const UNAVAILABLE: &str = "UNAVAILABLE";
}

// ── SessionError ────────────────────────────────────────────────────

/// Every failure the controller reports to callers.
///
/// Variants that carry a message carry the backend's own wording, which is
/// what the user sees. `Display` is that message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Wrong password, unknown email, unconfirmed account.
    #[error("{0}")]
    Credentials(String),

    /// Input rejected by the backend (e.g. email already registered).
    #[error("{0}")]
    Validation(String),

    /// Operation needs a signed-in user.
    #[error("{0}")]
    Unauthenticated(String),

    /// Referenced project or record does not exist for this user.
    #[error("{0}")]
    NotFound(String),

    /// Transport failure talking to the backend.
    #[error("{0}")]
    Network(String),

    /// Backend answered with an error of its own.
    #[error("{0}")]
    Backend(String),

    /// Persisting a change failed.
    #[error("{0}")]
    Storage(String),

    /// Unexpected failure inside the controller.
    #[error("{0}")]
    Internal(String),

    /// The controller has been shut down.
    #[error("session controller is not running")]
    Unavailable,
}

impl SessionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Credentials(_) => error_code::INVALID_CREDENTIALS,
            SessionError::Validation(_) => error_code::VALIDATION_FAILED,
            SessionError::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            SessionError::NotFound(_) => error_code::NOT_FOUND,
            SessionError::Network(_) => error_code::NETWORK,
            SessionError::Backend(_) => error_code::BACKEND,
            SessionError::Storage(_) => error_code::STORAGE_ERROR,
            SessionError::Internal(_) => error_code::INTERNAL,
            SessionError::Unavailable => error_code::UNAVAILABLE,
        }
    }

    /// The message to show the user: the backend's text when it has one,
    /// otherwise `fallback`.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            SessionError::Credentials(m)
            | SessionError::Validation(m)
            | SessionError::Unauthenticated(m)
            | SessionError::NotFound(m)
            | SessionError::Network(m)
            | SessionError::Backend(m)
            | SessionError::Storage(m)
                if !m.trim().is_empty() =>
            {
                m
            }
            _ => fallback,
        }
    }
}

impl From<QueueClosed> for SessionError {
    fn from(_: QueueClosed) -> Self {
        SessionError::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            SessionError::Credentials("x".into()).error_code(),
            "INVALID_CREDENTIALS"
        );
        assert_eq!(SessionError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(SessionError::Unavailable.error_code(), "UNAVAILABLE");
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = SessionError::Credentials("Invalid login credentials".into());
        assert_eq!(err.user_message("Something went wrong"), "Invalid login credentials");
    }

    #[test]
    fn user_message_falls_back_for_blank_or_internal() {
        assert_eq!(
            SessionError::Network("  ".into()).user_message("fallback"),
            "fallback"
        );
        assert_eq!(
            SessionError::Internal("panic in handler".into()).user_message("fallback"),
            "fallback"
        );
        assert_eq!(SessionError::Unavailable.user_message("fallback"), "fallback");
    }

    #[test]
    fn queue_closed_maps_to_unavailable() {
        assert_eq!(SessionError::from(QueueClosed), SessionError::Unavailable);
    }
}
