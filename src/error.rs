//! # Errors
//!
//! Error taxonomy shared by the backend registry, the adapters and the
//! secret materializer.
//!
//! Every variant carries the identifier it is about (backend type, parameter,
//! instance name or key) so callers can branch on the variant and still show a
//! useful message. Nothing here is fatal to the process: each error is scoped
//! to one reconciliation attempt and can be retried on the next pass.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// No constructor is registered for the requested backend kind
    #[error("unknown backend type: '{0}'")]
    UnknownBackendType(String),

    /// An adapter's `init` failed; the instance was not published
    #[error("backend instance '{instance}' init failed: {source}")]
    BackendInitFailed {
        instance: String,
        #[source]
        source: Box<Error>,
    },

    /// A required parameter was absent from both parameters and credentials
    #[error("expected parameter '{0}'")]
    MissingParameter(String),

    /// `get` was called on an adapter that has not been initialized
    #[error("{0} backend not initialized")]
    BackendNotInitialized(String),

    /// No instance is registered under this name
    #[error("cannot find backend instance: '{0}'")]
    BackendInstanceNotFound(String),

    /// The backing store has no such key (or version)
    #[error("secret '{key}' not found{}", .version.as_deref().map(|v| format!(" (version '{v}')")).unwrap_or_default())]
    SecretNotFound {
        key: String,
        version: Option<String>,
    },

    /// Materialization could not fetch the value
    #[error("failed to fetch secret '{key}' from backend instance '{instance}': {source}")]
    SecretFetchFailed {
        instance: String,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// The process-wide configuration variable is not set
    #[error("cannot find config: environment variable '{0}' is not set")]
    ConfigNotFound(String),

    /// Configuration or credentials payload does not have the expected shape
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// A backend call did not complete within its deadline
    #[error("{operation} cancelled after {}s", .timeout.as_secs())]
    Cancelled {
        operation: String,
        timeout: Duration,
    },

    /// Adapter-specific failure talking to the backing store
    #[error("{backend} backend {context} failed: {source}")]
    Transport {
        backend: &'static str,
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// A declarative resource lacks the identity needed to own a secret
    #[error("invalid resource '{name}': {reason}")]
    InvalidResource { name: String, reason: String },
}

impl Error {
    /// Stable `CamelCase` reason, used for status conditions and metrics labels
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Error::UnknownBackendType(_) => "UnknownBackendType",
            Error::BackendInitFailed { .. } => "BackendInitFailed",
            Error::MissingParameter(_) => "MissingParameter",
            Error::BackendNotInitialized(_) => "BackendNotInitialized",
            Error::BackendInstanceNotFound(_) => "BackendInstanceNotFound",
            Error::SecretNotFound { .. } => "SecretNotFound",
            Error::SecretFetchFailed { .. } => "SecretFetchFailed",
            Error::ConfigNotFound(_) => "ConfigNotFound",
            Error::ConfigInvalid(_) => "ConfigInvalid",
            Error::Cancelled { .. } => "Cancelled",
            Error::Transport { .. } => "TransportError",
            Error::InvalidResource { .. } => "InvalidResource",
        }
    }

    pub(crate) fn transport(
        backend: &'static str,
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::Transport {
            backend,
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn secret_not_found(key: &str, version: Option<&str>) -> Self {
        Error::SecretNotFound {
            key: key.to_string(),
            version: version.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_offending_identifier() {
        assert_eq!(
            Error::UnknownBackendType("mock-wrong-label".into()).to_string(),
            "unknown backend type: 'mock-wrong-label'"
        );
        assert_eq!(
            Error::MissingParameter("email".into()).to_string(),
            "expected parameter 'email'"
        );
        assert_eq!(
            Error::BackendInstanceNotFound("dummy1".into()).to_string(),
            "cannot find backend instance: 'dummy1'"
        );
        assert_eq!(
            Error::secret_not_found("db-password", Some("2")).to_string(),
            "secret 'db-password' not found (version '2')"
        );
        assert_eq!(
            Error::secret_not_found("db-password", None).to_string(),
            "secret 'db-password' not found"
        );
    }

    #[test]
    fn test_wrapped_errors_expose_their_cause() {
        let err = Error::SecretFetchFailed {
            instance: "asm-prod".into(),
            key: "db-password".into(),
            source: Box::new(Error::BackendNotInitialized("asm".into())),
        };

        assert_eq!(err.reason(), "SecretFetchFailed");
        let source = err.source().expect("wrapped cause");
        assert_eq!(source.to_string(), "asm backend not initialized");
    }

    #[test]
    fn test_transport_error_message() {
        let err = Error::transport(
            "1password",
            "get 'nonExistentItem'",
            anyhow::anyhow!("mock op get item failed"),
        );
        assert_eq!(
            err.to_string(),
            "1password backend get 'nonExistentItem' failed: mock op get item failed"
        );
        assert_eq!(err.reason(), "TransportError");
    }
}
