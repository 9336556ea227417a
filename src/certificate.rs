//! The device certificate record.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::signing::CertificateSigner;

/// Format version written into new certificates.
pub const CERTIFICATE_VERSION: &str = "1.0";

/// Issuance record binding a fingerprint to this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub version: String,
    pub fingerprint: String,
    /// ISO-8601 UTC creation time, millisecond precision.
    pub timestamp: String,
    pub hostname: String,
    pub platform: String,
    #[serde(rename = "arch")]
    pub architecture: String,
    /// Hex HMAC over `fingerprint:timestamp`.
    pub signature: String,
}

impl Certificate {
    /// Issue a certificate for `fingerprint` stamped with the current time.
    pub fn issue(fingerprint: &Fingerprint, signer: &CertificateSigner) -> Self {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::issue_at(fingerprint, timestamp, signer)
    }

    pub fn issue_at(
        fingerprint: &Fingerprint,
        timestamp: impl Into<String>,
        signer: &CertificateSigner,
    ) -> Self {
        let timestamp = timestamp.into();
        let signature = signer.sign(fingerprint.as_str(), &timestamp);
        Self {
            version: CERTIFICATE_VERSION.to_string(),
            fingerprint: fingerprint.to_string(),
            timestamp,
            hostname: local_hostname(),
            platform: platform_name().to_string(),
            architecture: arch_name().to_string(),
            signature,
        }
    }

    /// Whether the signature matches the certificate's own fingerprint and
    /// timestamp.
    pub fn has_valid_signature(&self, signer: &CertificateSigner) -> bool {
        signer.verify(&self.fingerprint, &self.timestamp, &self.signature)
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// OS name in the launcher's vocabulary.
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// CPU architecture in the launcher's vocabulary.
pub fn arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}
