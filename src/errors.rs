//! Error types for the device identity service.
//!
//! Only certificate *generation* and configuration surface these errors.
//! Verification reports its failures as a [`VerificationResult`] instead.
//!
//! [`VerificationResult`]: crate::verification::VerificationResult

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Reading or writing the certificate files failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// No home directory could be resolved for the default storage location.
    #[error("could not determine a storage directory for device certificates")]
    NoStorageDirectory,
}

pub type IdentityResult<T> = Result<T, IdentityError>;
