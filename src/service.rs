//! The device identity service.
//!
//! Issues a hardware-bound certificate on first login and re-checks it on
//! every later login:
//!
//! 1. The live fingerprint must equal `device.fp` (copy/clone detection)
//! 2. `device.cert` must decrypt under `SHA-256(live fingerprint)`
//! 3. The decrypted certificate's HMAC must verify
//!
//! All calls are synchronous and touch only the two files in the store.

use std::fmt;

use crate::certificate::Certificate;
use crate::config::DeviceIdentityConfig;
use crate::encryption::EncryptedBlob;
use crate::errors::{IdentityError, IdentityResult};
use crate::fingerprint::{self, Fingerprint};
use crate::hardware::{HardwareProbe, SystemProbe};
use crate::signing::CertificateSigner;
use crate::storage::CertificateStore;
use crate::verification::{VerificationError, VerificationResult};

const MISMATCH_DETAILS: &str = "hardware changed or certificate copied";

pub struct DeviceIdentityService<P = SystemProbe> {
    probe: P,
    store: CertificateStore,
    signer: CertificateSigner,
}

impl DeviceIdentityService<SystemProbe> {
    /// Service over the real hardware, storing under the configured directory
    /// (or `~/.srams`).
    pub fn from_config(config: &DeviceIdentityConfig) -> IdentityResult<Self> {
        let store = match config.storage.dir() {
            Some(dir) => CertificateStore::new(dir),
            None => CertificateStore::default_location()?,
        };
        Ok(Self::new(
            SystemProbe::new(),
            store,
            CertificateSigner::new(&config.signing.secret_seed),
        ))
    }
}

impl<P: HardwareProbe> DeviceIdentityService<P> {
    pub fn new(probe: P, store: CertificateStore, signer: CertificateSigner) -> Self {
        Self {
            probe,
            store,
            signer,
        }
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Fingerprint of the hardware as it is right now.
    pub fn current_fingerprint(&self) -> Fingerprint {
        fingerprint::collect(&self.probe)
    }

    /// Issue and store a certificate for this machine, replacing any existing
    /// one. Returns the fingerprint the certificate is bound to.
    pub fn generate_certificate(&self) -> IdentityResult<Fingerprint> {
        let fingerprint = self.current_fingerprint();
        let certificate = Certificate::issue(&fingerprint, &self.signer);

        let plaintext = serde_json::to_vec(&certificate)?;
        let blob = EncryptedBlob::seal(&plaintext, &fingerprint.storage_key())?;

        self.store.save(&blob, &fingerprint)?;
        log::info!("Device certificate generated for {}", certificate.hostname);

        Ok(fingerprint)
    }

    /// Check the stored certificate against live hardware.
    ///
    /// Never fails: every problem is reported through the result's `error`.
    pub fn verify_certificate(&self) -> VerificationResult {
        let result = match self.try_verify() {
            Ok(result) => result,
            Err(e) => VerificationResult::invalid(VerificationError::VerificationError)
                .with_details(e.to_string()),
        };

        match result.error {
            None => log::info!("Device certificate verified"),
            Some(code) if code.is_tamper_signal() => {
                log::warn!("Device certificate rejected: {code}")
            }
            Some(code) => log::warn!("Device certificate unavailable: {code}"),
        }

        result
    }

    fn try_verify(&self) -> IdentityResult<VerificationResult> {
        if !self.store.certificate_exists() {
            return Ok(VerificationResult::invalid(VerificationError::NoCertificate));
        }

        let live = self.current_fingerprint();

        let Some(stored) = self.store.load_fingerprint()? else {
            return Ok(VerificationResult::invalid(VerificationError::NoFingerprint));
        };

        if live != stored {
            return Ok(
                VerificationResult::invalid(VerificationError::FingerprintMismatch)
                    .with_details(MISMATCH_DETAILS),
            );
        }

        let Some(raw_blob) = self.store.load_certificate()? else {
            return Ok(VerificationResult::invalid(VerificationError::NoCertificate));
        };

        let certificate = match decrypt_certificate(&raw_blob, &live) {
            Ok(certificate) => certificate,
            Err(e) => {
                log::debug!("Device certificate decryption failed: {e}");
                return Ok(VerificationResult::invalid(VerificationError::DecryptFailed));
            }
        };

        if !certificate.has_valid_signature(&self.signer) {
            return Ok(VerificationResult::invalid(
                VerificationError::SignatureInvalid,
            ));
        }

        if live != certificate.fingerprint.as_str() {
            return Ok(
                VerificationResult::invalid(VerificationError::FingerprintMismatch)
                    .with_details("certificate payload is bound to a different fingerprint"),
            );
        }

        Ok(VerificationResult::valid(
            live,
            certificate.hostname,
            certificate.timestamp,
        ))
    }

    /// Both certificate files are present. Contents are not checked.
    pub fn has_certificate(&self) -> bool {
        self.store.certificate_exists() && self.store.fingerprint_exists()
    }

    /// The fingerprint recorded at generation time, if any.
    pub fn get_stored_fingerprint(&self) -> Option<Fingerprint> {
        match self.store.load_fingerprint() {
            Ok(fp) => fp,
            Err(e) => {
                log::warn!("Failed to read stored fingerprint: {e}");
                None
            }
        }
    }

    /// Delete the certificate pair. Returns `false` if anything could not be
    /// removed.
    pub fn remove_certificate(&self) -> bool {
        match self.store.clear() {
            Ok(()) => {
                log::info!("Device certificate removed");
                true
            }
            Err(e) => {
                log::error!("Failed to remove device certificate: {e}");
                false
            }
        }
    }

    /// Device check run before a Super Admin login.
    ///
    /// A device with no certificate is enrolled on the spot (first run after
    /// installation). Any other verification failure rejects the login.
    pub fn authenticate(&self) -> Result<DeviceAuthentication, DeviceAuthError> {
        let result = self.verify_certificate();

        if result.valid {
            if let Some(fingerprint) = result.fingerprint {
                return Ok(DeviceAuthentication {
                    fingerprint,
                    enrolled: false,
                });
            }
        }

        match result.error {
            Some(VerificationError::NoCertificate) => {
                log::info!("No device certificate found, enrolling this device");
                let fingerprint = self
                    .generate_certificate()
                    .map_err(DeviceAuthError::RegistrationFailed)?;
                Ok(DeviceAuthentication {
                    fingerprint,
                    enrolled: true,
                })
            }
            Some(VerificationError::FingerprintMismatch) => Err(DeviceAuthError::HardwareMismatch),
            Some(code) => Err(DeviceAuthError::Rejected(code)),
            None => Err(DeviceAuthError::Rejected(VerificationError::VerificationError)),
        }
    }
}

fn decrypt_certificate(raw_blob: &[u8], fingerprint: &Fingerprint) -> IdentityResult<Certificate> {
    let blob = EncryptedBlob::from_slice(raw_blob)?;
    let plaintext = blob.open(&fingerprint.storage_key())?;
    serde_json::from_slice(&plaintext)
        .map_err(|e| IdentityError::Decryption(format!("malformed certificate: {e}")))
}

impl<P: fmt::Debug> fmt::Debug for DeviceIdentityService<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentityService")
            .field("probe", &self.probe)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A device that passed the login check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthentication {
    /// Fingerprint to present to the backend as `device_fingerprint`.
    pub fingerprint: Fingerprint,
    /// The certificate was issued during this call.
    pub enrolled: bool,
}

/// Why a device was refused at login.
#[derive(Debug, thiserror::Error)]
pub enum DeviceAuthError {
    /// Enrolling a new device failed, typically for lack of permissions.
    #[error("Failed to register device. Please run as Administrator.")]
    RegistrationFailed(#[source] IdentityError),

    #[error("Security Alert: Device hardware mismatch detected. Login denied.")]
    HardwareMismatch,

    #[error("Certificate error: {0}")]
    Rejected(VerificationError),
}

impl DeviceAuthError {
    /// The verification code behind the refusal, if there is one.
    pub fn code(&self) -> Option<VerificationError> {
        match self {
            DeviceAuthError::RegistrationFailed(_) => None,
            DeviceAuthError::HardwareMismatch => Some(VerificationError::FingerprintMismatch),
            DeviceAuthError::Rejected(code) => Some(*code),
        }
    }
}
