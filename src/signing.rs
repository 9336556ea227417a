//! HMAC-SHA256 signatures over certificate contents.
//!
//! The HMAC key is `SHA-256(seed)`. Launchers in the field were built with
//! [`DEFAULT_SECRET_SEED`]; since anyone holding the binary can recover that
//! seed, deployments should provision their own through configuration.

use ring::hmac;
use sha2::{Digest, Sha256};

/// Seed compiled into existing launchers.
pub const DEFAULT_SECRET_SEED: &str = "SRAMS_DEVICE_CERT_SECRET_2024";

/// Signs and checks `fingerprint:timestamp` payloads.
pub struct CertificateSigner {
    key: hmac::Key,
}

impl CertificateSigner {
    pub fn new(seed: &str) -> Self {
        let secret = Sha256::digest(seed.as_bytes());
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &secret),
        }
    }

    /// The message a certificate signature covers.
    pub fn payload(fingerprint: &str, timestamp: &str) -> String {
        format!("{fingerprint}:{timestamp}")
    }

    /// Lowercase hex HMAC over `fingerprint:timestamp`.
    pub fn sign(&self, fingerprint: &str, timestamp: &str) -> String {
        let tag = hmac::sign(&self.key, Self::payload(fingerprint, timestamp).as_bytes());
        hex::encode(tag.as_ref())
    }

    /// Constant-time check of a hex signature.
    pub fn verify(&self, fingerprint: &str, timestamp: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        hmac::verify(
            &self.key,
            Self::payload(fingerprint, timestamp).as_bytes(),
            &expected,
        )
        .is_ok()
    }
}

impl Default for CertificateSigner {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_SEED)
    }
}

impl std::fmt::Debug for CertificateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

    #[test]
    fn default_seed_matches_known_signature() {
        let signer = CertificateSigner::default();
        assert_eq!(
            signer.sign("abc", TIMESTAMP),
            "049a5f442a6f13597d37cba557ed0de2581bd3758ba375190f33764451fa0c2b"
        );
    }

    #[test]
    fn verify_accepts_own_signature() {
        let signer = CertificateSigner::default();
        let sig = signer.sign("abc", TIMESTAMP);
        assert!(signer.verify("abc", TIMESTAMP, &sig));
    }

    #[test]
    fn verify_rejects_altered_payload_or_signature() {
        let signer = CertificateSigner::default();
        let sig = signer.sign("abc", TIMESTAMP);

        assert!(!signer.verify("abd", TIMESTAMP, &sig));
        assert!(!signer.verify("abc", "2024-01-02T00:00:00.000Z", &sig));
        assert!(!signer.verify("abc", TIMESTAMP, "not-hex"));
        assert!(!signer.verify("abc", TIMESTAMP, &"0".repeat(64)));
    }

    #[test]
    fn different_seed_different_signature() {
        let a = CertificateSigner::default().sign("abc", TIMESTAMP);
        let b = CertificateSigner::new("site-provisioned-seed").sign("abc", TIMESTAMP);
        assert_ne!(a, b);
    }
}
