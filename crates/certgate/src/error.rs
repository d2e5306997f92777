//! Error types for the trust gate.

/// Trust gate errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Content could not be parsed or validated as signed content.
    #[error("signed content error in {artifact}: {reason}")]
    Verification { artifact: String, reason: String },

    /// Artifact could not be read.
    #[error("failed to read {artifact}: {message}")]
    Io { artifact: String, message: String },

    /// Trust store could not be consulted or written.
    #[error("trust store connection error: {message}")]
    StoreConnection { message: String },

    /// Trust store rejected a certificate or holds invalid data.
    #[error("trust store security error: {message}")]
    StoreSecurity { message: String },

    /// Unsigned content is present and the policy forbids it.
    #[error("unsigned content is not allowed: [{}]", artifacts.join(", "))]
    UnsignedNotAllowed { artifacts: Vec<String> },

    /// The consent provider failed to produce a decision.
    #[error("consent request failed: {message}")]
    Consent { message: String },

    /// Strict mode is on and no consent provider is registered.
    #[error("no consent provider registered and strict mode requires one")]
    NoConsentProvider,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl TrustError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,

            Self::Io { .. } => 2,
            Self::StoreConnection { .. } => 2,

            // Security issues
            Self::Verification { .. } => 4,
            Self::StoreSecurity { .. } => 4,
            Self::UnsignedNotAllowed { .. } => 4,
            Self::NoConsentProvider => 4,

            Self::Consent { .. } => 5,
        }
    }

    /// Whether the error reflects a security failure rather than plumbing.
    pub fn is_security_failure(&self) -> bool {
        matches!(
            self,
            Self::Verification { .. }
                | Self::StoreSecurity { .. }
                | Self::UnsignedNotAllowed { .. }
                | Self::NoConsentProvider
        )
    }

    pub(crate) fn verification(artifact: impl ToString, reason: impl Into<String>) -> Self {
        Self::Verification {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn store_connection(message: impl Into<String>) -> Self {
        Self::StoreConnection {
            message: message.into(),
        }
    }

    pub(crate) fn store_security(message: impl Into<String>) -> Self {
        Self::StoreSecurity {
            message: message.into(),
        }
    }
}

/// Result type for trust gate operations.
pub type TrustResult<T> = Result<T, TrustError>;
