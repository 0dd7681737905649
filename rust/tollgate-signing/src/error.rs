//! Error types for signed URL issuance.

use thiserror::Error;

/// Errors that can occur while loading keys or signing a URL.
///
/// Every variant is deterministic in its inputs: retrying the same call
/// reproduces the same failure, so none of them are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    /// The PEM envelope or the PKCS#8 structure inside it could not be decoded.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The key decoded fine but is not an RSA key.
    #[error("Unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    /// A signer that requires RSA was handed a key of another algorithm.
    #[error("Key algorithm mismatch: expected RSA, got {0}")]
    KeyAlgorithmMismatch(String),

    /// A required part of the signing identity is empty.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The requested time-to-live is outside the protocol's accepted window.
    #[error("Expiry of {seconds}s is out of range (1..={max}s)", max = crate::s3::MAX_EXPIRES)]
    ExpiryOutOfRange {
        /// Requested time-to-live in whole seconds.
        seconds: i64,
    },

    /// The absolute expiry is not after the current clock reading.
    #[error("Expiry {expires} is not after the current time {now}")]
    ExpiryInPast {
        /// Requested expiry in epoch seconds.
        expires: i64,
        /// Clock reading in epoch seconds.
        now: i64,
    },

    /// The clock reading cannot be expressed in the signing protocol's
    /// timestamp format.
    #[error("Clock reading {now} is outside the signable range")]
    ClockOutOfRange {
        /// Clock reading in epoch seconds.
        now: i64,
    },

    /// A cryptographic primitive reported an error.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// An endpoint or distribution URL could not be used to build a request URL.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SignError {
    /// The discriminant of this error, for callers that map failures to
    /// transport responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyFormat(_) => ErrorKind::InvalidKeyFormat,
            Self::UnsupportedKeyAlgorithm(_) => ErrorKind::UnsupportedKeyAlgorithm,
            Self::KeyAlgorithmMismatch(_) => ErrorKind::KeyAlgorithmMismatch,
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::ExpiryOutOfRange { .. } => ErrorKind::ExpiryOutOfRange,
            Self::ExpiryInPast { .. } => ErrorKind::ExpiryInPast,
            Self::ClockOutOfRange { .. } => ErrorKind::ClockOutOfRange,
            Self::SigningFailure(_) => ErrorKind::SigningFailure,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Payload-free discriminant of [`SignError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidKeyFormat,
    UnsupportedKeyAlgorithm,
    KeyAlgorithmMismatch,
    MissingCredential,
    ExpiryOutOfRange,
    ExpiryInPast,
    ClockOutOfRange,
    SigningFailure,
    Configuration,
}

impl ErrorKind {
    /// HTTP status code a transport layer should answer with.
    ///
    /// Expiry problems come from the caller's request; everything else is a
    /// server-side misconfiguration or fault.
    pub fn status(&self) -> u16 {
        match self {
            Self::ExpiryOutOfRange | Self::ExpiryInPast => 400,
            _ => 500,
        }
    }
}
