//! Outcome of checking the stored certificate against live hardware.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::Fingerprint;

/// Why a certificate failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationError {
    /// `device.cert` does not exist; the device was never registered.
    NoCertificate,
    /// `device.cert` exists but `device.fp` does not.
    NoFingerprint,
    /// Live hardware does not match the stored certificate.
    FingerprintMismatch,
    /// The certificate blob could not be parsed or decrypted.
    DecryptFailed,
    /// The decrypted certificate's signature is wrong.
    SignatureInvalid,
    /// Anything else that went wrong while verifying.
    VerificationError,
}

impl VerificationError {
    /// The wire code, e.g. `FINGERPRINT_MISMATCH`.
    pub fn code(&self) -> &'static str {
        match self {
            VerificationError::NoCertificate => "NO_CERTIFICATE",
            VerificationError::NoFingerprint => "NO_FINGERPRINT",
            VerificationError::FingerprintMismatch => "FINGERPRINT_MISMATCH",
            VerificationError::DecryptFailed => "DECRYPT_FAILED",
            VerificationError::SignatureInvalid => "SIGNATURE_INVALID",
            VerificationError::VerificationError => "VERIFICATION_ERROR",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            VerificationError::NoCertificate => "Device is not registered",
            VerificationError::NoFingerprint => "Device fingerprint record is missing",
            VerificationError::FingerprintMismatch => {
                "Device hardware has changed or certificate was copied from another device"
            }
            VerificationError::DecryptFailed => "Device certificate could not be decrypted",
            VerificationError::SignatureInvalid => "Device certificate signature is invalid",
            VerificationError::VerificationError => "Device certificate could not be verified",
        }
    }

    /// Returns true if the failure suggests the certificate was copied or
    /// modified rather than simply missing.
    pub fn is_tamper_signal(&self) -> bool {
        matches!(
            self,
            VerificationError::FingerprintMismatch
                | VerificationError::DecryptFailed
                | VerificationError::SignatureInvalid
        )
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of [`verify_certificate`](crate::service::DeviceIdentityService::verify_certificate).
///
/// Serializes to the shape the UI shell expects:
///
/// ```json
/// { "valid": false, "error": "FINGERPRINT_MISMATCH", "details": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VerificationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl VerificationResult {
    pub fn valid(fingerprint: Fingerprint, hostname: String, timestamp: String) -> Self {
        Self {
            valid: true,
            fingerprint: Some(fingerprint),
            hostname: Some(hostname),
            timestamp: Some(timestamp),
            error: None,
            details: None,
        }
    }

    pub fn invalid(error: VerificationError) -> Self {
        Self {
            valid: false,
            fingerprint: None,
            hostname: None,
            timestamp: None,
            error: Some(error),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
