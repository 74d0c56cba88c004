//! Error types for the Coffre SDK.
//!
//! One closed taxonomy for every fallible operation. The core never
//! recovers locally: each error is surfaced verbatim to the caller, who
//! owns retry policy. Malformed inputs are rejected synchronously, before
//! any backend round-trip.

use std::io;

use thiserror::Error;

use coffre_crypto::SealError;

/// Errors surfaced by every layer of the SDK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied value is malformed, absent, or out of contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A failure inside the SDK or the backend that the caller cannot fix.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The backend was unreachable or the connection failed mid-operation.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The operation is not valid in the current session state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The operation was abandoned before a result was delivered.
    #[error("operation canceled: {0}")]
    OperationCanceled(String),

    /// The caller holds no usable key for a well-formed ciphertext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The group would exceed the backend's member limit.
    #[error("group too big: {0}")]
    GroupTooBig(String),

    /// A verification proof did not match the registered method.
    #[error("invalid verification: {0}")]
    InvalidVerification(String),

    /// Too many failed verification attempts; the backend is rate limiting.
    #[error("too many attempts: {0}")]
    TooManyAttempts(String),

    /// A verification code outlived its validity window.
    #[error("expired verification: {0}")]
    ExpiredVerification(String),

    /// An I/O failure in a caller-supplied reader or writer.
    #[error("io error: {0}")]
    IoError(String),

    /// This device has been revoked; the backend refuses all operations.
    #[error("device revoked")]
    DeviceRevoked,
}

/// Discriminant-only view of [`Error`] for matching on the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// See [`Error::InternalError`]
    InternalError,
    /// See [`Error::NetworkError`]
    NetworkError,
    /// See [`Error::PreconditionFailed`]
    PreconditionFailed,
    /// See [`Error::OperationCanceled`]
    OperationCanceled,
    /// See [`Error::DecryptionFailed`]
    DecryptionFailed,
    /// See [`Error::GroupTooBig`]
    GroupTooBig,
    /// See [`Error::InvalidVerification`]
    InvalidVerification,
    /// See [`Error::TooManyAttempts`]
    TooManyAttempts,
    /// See [`Error::ExpiredVerification`]
    ExpiredVerification,
    /// See [`Error::IoError`]
    IoError,
    /// See [`Error::DeviceRevoked`]
    DeviceRevoked,
}

impl Error {
    /// The kind of this error, for matching without its message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InternalError(_) => ErrorKind::InternalError,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::OperationCanceled(_) => ErrorKind::OperationCanceled,
            Self::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
            Self::GroupTooBig(_) => ErrorKind::GroupTooBig,
            Self::InvalidVerification(_) => ErrorKind::InvalidVerification,
            Self::TooManyAttempts(_) => ErrorKind::TooManyAttempts,
            Self::ExpiredVerification(_) => ErrorKind::ExpiredVerification,
            Self::IoError(_) => ErrorKind::IoError,
            Self::DeviceRevoked => ErrorKind::DeviceRevoked,
        }
    }

    /// Returns true if this error is presumed transient and may succeed on
    /// retry.
    ///
    /// The core never retries on its own; this is advisory for callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }
}

/// Structural seal errors are argument errors; a failed tag is a key
/// problem.
impl From<SealError> for Error {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Truncated { .. }
            | SealError::UnsupportedVersion(_)
            | SealError::MalformedResourceId(_) => Self::InvalidArgument(err.to_string()),
            SealError::DecryptionFailed { .. } => Self::DecryptionFailed(err.to_string()),
        }
    }
}

/// Convert `io::Error` from caller-supplied readers.
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Convert [`Error`] to `io::Error` for the `std::io::Read` boundary on
/// output streams.
///
/// This is only for boundary conversion - internally the SDK uses [`Error`].
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Error::DecryptionFailed(_) => io::ErrorKind::InvalidData,
            Error::PreconditionFailed(_) | Error::DeviceRevoked => io::ErrorKind::PermissionDenied,
            Error::NetworkError(_) => io::ErrorKind::ConnectionAborted,
            Error::OperationCanceled(_) => io::ErrorKind::Interrupted,
            Error::InternalError(_)
            | Error::GroupTooBig(_)
            | Error::InvalidVerification(_)
            | Error::TooManyAttempts(_)
            | Error::ExpiredVerification(_)
            | Error::IoError(_) => io::ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}
