//! Authentication and session error types.
//!
//! Cache faults never appear here: the cache layer degrades to the store on its
//! own. Everything else propagates to the caller through [`AuthError`].

use std::fmt;

/// Which token of a session pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Errors that can occur during registration, login and session handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No such session, candidate or token.
    #[error("Not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// The presented credentials do not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// The presented token is past its expiry.
    #[error("{kind} token expired")]
    TokenExpired {
        /// Which token expired.
        kind: TokenKind,
    },

    /// The email or phone already belongs to a candidate.
    #[error("Duplicate resource: {message}")]
    DuplicateResource {
        /// Which identifier collided.
        message: String,
    },

    /// No unique token could be produced within the retry budget.
    #[error("Token generation failed after {attempts} attempts")]
    GenerationFailure {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Input rejected by validation.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of why the input is invalid.
        message: String,
    },

    /// An error occurred while storing or retrieving data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred (serialization, hashing).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a new `TokenExpired` error.
    #[must_use]
    pub fn token_expired(kind: TokenKind) -> Self {
        Self::TokenExpired { kind }
    }

    /// Creates a new `DuplicateResource` error.
    #[must_use]
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateResource {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Unauthorized
                | Self::TokenExpired { .. }
                | Self::DuplicateResource { .. }
                | Self::InvalidInput { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::GenerationFailure { .. } | Self::Storage { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if this error means the caller is not authenticated.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Unauthorized | Self::TokenExpired { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::Authentication,
            Self::Unauthorized => ErrorCategory::Authentication,
            Self::TokenExpired { .. } => ErrorCategory::Token,
            Self::DuplicateResource { .. } => ErrorCategory::Conflict,
            Self::GenerationFailure { .. } => ErrorCategory::Token,
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Message safe to show to the end user.
    ///
    /// Authentication failures share one message so a caller cannot tell a
    /// missing account from a wrong password or a stale token.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound { .. } | Self::Unauthorized | Self::TokenExpired { .. } => {
                "invalid credentials or token".to_string()
            }
            Self::DuplicateResource { message } | Self::InvalidInput { message } => {
                message.clone()
            }
            Self::GenerationFailure { .. } | Self::Storage { .. } | Self::Internal { .. } => {
                "internal server error".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialization: {e}"))
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity could not be established.
    Authentication,
    /// Token validity (expiry, generation).
    Token,
    /// Request validation errors.
    Validation,
    /// Uniqueness conflicts.
    Conflict,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
