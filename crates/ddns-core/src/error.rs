//! Error types for the DDNS system
//!
//! One error type crosses every layer. Drivers never inspect causes themselves;
//! the reconciliation loop uses [`Error::is_auth_failure`] and
//! [`Error::aborts_record_loop`] to decide how far a failure spreads.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Distinct causes of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS lookup failure, TLS failure
    Network,
    /// The request exceeded the transport timeout
    Timeout,
    /// The response body was not the expected JSON
    Decode,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
        };
        f.write_str(s)
    }
}

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Address lookup failed for a family
    #[error("Address resolution failed: {0}")]
    Resolution(String),

    /// Credentials were rejected by the provider
    #[error("Authentication failed ({provider}): {message}")]
    Authentication {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// A request could not be signed (missing credentials, bad key)
    #[error("Signing error: {0}")]
    Signing(String),

    /// Network, timeout or decode failure
    #[error("Transport error ({kind}): {message}")]
    Transport {
        /// Failure cause
        kind: TransportErrorKind,
        /// Error message
        message: String,
    },

    /// Provider answered with a non-2xx status
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Provider accepted the call but did not echo the submitted value
    #[error("Provider logic error ({provider}): {message}")]
    ProviderLogic {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an authentication error
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a signing error
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    /// Create a transport error
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::transport(TransportErrorKind::Decode, message)
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a provider logic error
    pub fn provider_logic(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderLogic {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Credentials or signature were rejected
    ///
    /// # Returns
    ///
    /// `true` for authentication and signing errors and HTTP 401/403
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Authentication { .. } | Self::Signing(_) => true,
            Self::HttpStatus { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// The remaining domains of the current record type should not be attempted
    ///
    /// # Returns
    ///
    /// `true` for transport failures, HTTP 429 and any 5xx status
    pub fn aborts_record_loop(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
