//! Error types for the Snowbroker broker.
//!
//! All errors use the `SB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request decoding errors (the caller sent something malformed)
//! - 9xx: General / internal errors
//!
//! Matching outcomes such as "no match" or "client gone" are not errors and
//! never appear here; see [`crate::outcome`].

use thiserror::Error;

/// Central error enum for all Snowbroker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    // =================================================================
    // Decode Errors (1xx)
    // =================================================================
    /// The body is not valid JSON or has the wrong shape.
    #[error("SB_ERR_100: Malformed message: {reason}")]
    Malformed { reason: String },

    /// The message carries a protocol version this broker does not speak.
    #[error("SB_ERR_101: Unsupported message version: {0:?}")]
    UnsupportedVersion(String),

    /// A field required by the protocol is absent or empty.
    #[error("SB_ERR_102: Missing required field: {0}")]
    MissingField(&'static str),

    /// The NAT field holds something other than unknown/restricted/unrestricted.
    #[error("SB_ERR_103: Invalid NAT type: {0:?}")]
    InvalidNatType(String),

    /// The bridge fingerprint is not 20 hex-encoded bytes.
    #[error("SB_ERR_104: Invalid bridge fingerprint: {reason}")]
    InvalidFingerprint { reason: String },

    /// The body exceeds the accepted request size.
    #[error("SB_ERR_105: Message too large: {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    /// The client named a bridge that is not on the broker's bridge list.
    #[error("SB_ERR_106: Unknown bridge: {0}")]
    UnknownBridge(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Building a response body failed.
    #[error("SB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("SB_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (config file, log sink).
    #[error("SB_ERR_903: I/O error: {0}")]
    Io(String),
}

/// How the transport layer should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The request was malformed; it never reached shared state.
    BadRequest,
    /// The broker failed to do its job.
    Internal,
}

impl BrokerError {
    /// Transport class of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed { .. }
            | Self::UnsupportedVersion(_)
            | Self::MissingField(_)
            | Self::InvalidNatType(_)
            | Self::InvalidFingerprint { .. }
            | Self::MessageTooLarge { .. }
            | Self::UnknownBridge(_) => ErrorClass::BadRequest,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) | Self::Io(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Shorthand for checking the bad-request class.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        self.class() == ErrorClass::BadRequest
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BrokerError>;

// Conversion from std::io::Error
impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
