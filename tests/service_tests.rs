use std::fs;

use tempfile::TempDir;

use device_identity::encryption::EncryptedBlob;
use device_identity::certificate::Certificate;
use device_identity::hardware::{HardwareProbe, NetworkAdapter};
use device_identity::service::{DeviceAuthError, DeviceIdentityService};
use device_identity::signing::CertificateSigner;
use device_identity::storage::CertificateStore;
use device_identity::verification::VerificationError;

/// Hardware with fixed identifiers.
#[derive(Debug, Clone)]
struct StaticProbe {
    guid: Option<String>,
    cpu: Option<String>,
    volume: Option<String>,
    mac: Option<String>,
    bios: Option<String>,
}

impl StaticProbe {
    fn machine_a() -> Self {
        Self {
            guid: Some("4c4c4544-0042-3510-8050-b4c04f564433".to_string()),
            cpu: Some("BFEBFBFF000906EA".to_string()),
            volume: Some("A1B2C3D4".to_string()),
            mac: Some("a4:bb:6d:11:22:33".to_string()),
            bios: Some("5CG1234XYZ".to_string()),
        }
    }

    fn machine_b() -> Self {
        Self {
            guid: Some("9f1e2d3c-0000-4111-8222-123456789abc".to_string()),
            cpu: Some("178BFBFF00A20F12".to_string()),
            volume: Some("0E5F77AA".to_string()),
            mac: Some("3c:7c:3f:aa:bb:cc".to_string()),
            bios: None,
        }
    }
}

impl HardwareProbe for StaticProbe {
    fn machine_guid(&self) -> Option<String> {
        self.guid.clone()
    }

    fn cpu_id(&self) -> Option<String> {
        self.cpu.clone()
    }

    fn volume_serial(&self) -> Option<String> {
        self.volume.clone()
    }

    fn network_adapters(&self) -> Vec<NetworkAdapter> {
        self.mac
            .iter()
            .map(|mac| NetworkAdapter::new("Ethernet", mac.clone()))
            .collect()
    }

    fn bios_serial(&self) -> Option<String> {
        self.bios.clone()
    }
}

fn service_in(dir: &TempDir, probe: StaticProbe) -> DeviceIdentityService<StaticProbe> {
    DeviceIdentityService::new(
        probe,
        CertificateStore::new(dir.path().join(".srams")),
        CertificateSigner::default(),
    )
}

#[test]
fn generate_then_verify_round_trip() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());

    let fingerprint = service.generate_certificate().expect("generate should succeed");
    assert_eq!(fingerprint.as_str().len(), 64);

    let result = service.verify_certificate();
    assert!(result.valid, "unexpected result: {result:?}");
    assert_eq!(result.fingerprint, Some(fingerprint));
    assert!(result.timestamp.is_some());
    assert!(result.hostname.is_some());
    assert!(result.error.is_none());
}

#[test]
fn verify_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    assert_eq!(service.verify_certificate(), service.verify_certificate());

    service.remove_certificate();
    assert_eq!(service.verify_certificate(), service.verify_certificate());
}

#[test]
fn no_certificate_when_nothing_stored() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());

    let result = service.verify_certificate();
    assert!(!result.valid);
    assert_eq!(result.error, Some(VerificationError::NoCertificate));
    assert!(!service.has_certificate());
    assert!(service.get_stored_fingerprint().is_none());
}

#[test]
fn missing_certificate_file_only() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    fs::remove_file(service.store().certificate_path()).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::NoCertificate)
    );
    assert!(!service.has_certificate());
}

#[test]
fn missing_fingerprint_file_only() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    fs::remove_file(service.store().fingerprint_path()).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::NoFingerprint)
    );
    assert!(!service.has_certificate());
}

#[test]
fn overwritten_fingerprint_file_is_a_mismatch() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    fs::write(service.store().fingerprint_path(), "0".repeat(64)).unwrap();

    let result = service.verify_certificate();
    assert!(!result.valid);
    assert_eq!(result.error, Some(VerificationError::FingerprintMismatch));
    assert!(result.details.is_some());
}

#[test]
fn copied_certificate_fails_on_other_machine() {
    let tmp = TempDir::new().unwrap();
    let original = service_in(&tmp, StaticProbe::machine_a());
    original.generate_certificate().unwrap();

    // Same files, different hardware.
    let clone = service_in(&tmp, StaticProbe::machine_b());
    let result = clone.verify_certificate();

    assert!(!result.valid);
    assert_eq!(result.error, Some(VerificationError::FingerprintMismatch));
}

#[test]
fn hardware_change_fails_verification() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    let mut changed = StaticProbe::machine_a();
    changed.mac = None;
    let after_change = service_in(&tmp, changed);

    assert_eq!(
        after_change.verify_certificate().error,
        Some(VerificationError::FingerprintMismatch)
    );
}

#[test]
fn corrupted_ciphertext_fails_decryption() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    let path = service.store().certificate_path();
    let mut blob = EncryptedBlob::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
    blob.data.truncate(blob.data.len() / 2);
    fs::write(&path, blob.to_json().unwrap()).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::DecryptFailed)
    );
}

#[test]
fn garbage_certificate_file_fails_decryption() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    fs::write(service.store().certificate_path(), "not a certificate").unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::DecryptFailed)
    );
}

#[test]
fn non_utf8_certificate_byte_fails_decryption() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    let path = service.store().certificate_path();
    let mut raw = fs::read(&path).unwrap();
    raw[10] = 0xFF;
    fs::write(&path, raw).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::DecryptFailed)
    );
}

#[test]
fn non_utf8_fingerprint_file_is_a_mismatch() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    fs::write(service.store().fingerprint_path(), [0xFF, 0xFE, 0x00]).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::FingerprintMismatch)
    );
    assert!(service.has_certificate());
    assert!(service.get_stored_fingerprint().is_some());
}

#[test]
fn forged_signature_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    let fingerprint = service.generate_certificate().unwrap();

    // Re-encrypt a certificate signed with a different secret.
    let forged = Certificate::issue(&fingerprint, &CertificateSigner::new("attacker-guess"));
    let blob = EncryptedBlob::seal(
        &serde_json::to_vec(&forged).unwrap(),
        &fingerprint.storage_key(),
    )
    .unwrap();
    fs::write(service.store().certificate_path(), blob.to_json().unwrap()).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::SignatureInvalid)
    );
}

#[test]
fn payload_bound_to_other_fingerprint_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    let fingerprint = service.generate_certificate().unwrap();

    // Validly signed, but for machine B, sealed under machine A's key.
    let other = device_identity::fingerprint::collect(&StaticProbe::machine_b());
    let cert = Certificate::issue(&other, &CertificateSigner::default());
    let blob = EncryptedBlob::seal(
        &serde_json::to_vec(&cert).unwrap(),
        &fingerprint.storage_key(),
    )
    .unwrap();
    fs::write(service.store().certificate_path(), blob.to_json().unwrap()).unwrap();

    assert_eq!(
        service.verify_certificate().error,
        Some(VerificationError::FingerprintMismatch)
    );
}

#[test]
fn certificate_from_other_signing_seed_is_rejected() {
    let tmp = TempDir::new().unwrap();
    service_in(&tmp, StaticProbe::machine_a())
        .generate_certificate()
        .unwrap();

    let provisioned = DeviceIdentityService::new(
        StaticProbe::machine_a(),
        CertificateStore::new(tmp.path().join(".srams")),
        CertificateSigner::new("site-provisioned-seed"),
    );
    assert_eq!(
        provisioned.verify_certificate().error,
        Some(VerificationError::SignatureInvalid)
    );
}

#[test]
fn generate_overwrites_existing_certificate() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();
    let first = fs::read_to_string(service.store().certificate_path()).unwrap();

    service.generate_certificate().unwrap();
    let second = fs::read_to_string(service.store().certificate_path()).unwrap();

    assert_ne!(first, second, "a fresh IV should produce a new blob");
    assert!(service.verify_certificate().valid);
}

#[test]
fn stored_fingerprint_matches_generated() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    let fingerprint = service.generate_certificate().unwrap();

    assert!(service.has_certificate());
    assert_eq!(service.get_stored_fingerprint(), Some(fingerprint.clone()));
    assert_eq!(service.current_fingerprint(), fingerprint);
}

#[test]
fn remove_then_has_certificate_is_false() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();

    assert!(service.remove_certificate());
    assert!(!service.has_certificate());
    assert!(service.get_stored_fingerprint().is_none());

    // Nothing left to delete is still a success.
    assert!(service.remove_certificate());
}

#[test]
fn machine_without_identifiers_still_round_trips() {
    let tmp = TempDir::new().unwrap();
    let empty = StaticProbe {
        guid: None,
        cpu: None,
        volume: None,
        mac: None,
        bios: None,
    };
    let service = service_in(&tmp, empty);

    let fingerprint = service.generate_certificate().unwrap();
    assert_eq!(
        fingerprint,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert!(service.verify_certificate().valid);
}

#[test]
fn authenticate_enrolls_on_first_run() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());

    let first = service.authenticate().expect("first run should enroll");
    assert!(first.enrolled);
    assert!(service.has_certificate());

    let second = service.authenticate().expect("second run should verify");
    assert!(!second.enrolled);
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn authenticate_refuses_cloned_device() {
    let tmp = TempDir::new().unwrap();
    service_in(&tmp, StaticProbe::machine_a())
        .authenticate()
        .unwrap();

    let err = service_in(&tmp, StaticProbe::machine_b())
        .authenticate()
        .unwrap_err();

    assert!(matches!(err, DeviceAuthError::HardwareMismatch));
    assert_eq!(err.code(), Some(VerificationError::FingerprintMismatch));
    assert!(err.to_string().contains("hardware mismatch"));
}

#[test]
fn authenticate_reports_other_codes() {
    let tmp = TempDir::new().unwrap();
    let service = service_in(&tmp, StaticProbe::machine_a());
    service.generate_certificate().unwrap();
    fs::remove_file(service.store().fingerprint_path()).unwrap();

    let err = service.authenticate().unwrap_err();
    assert_eq!(err.code(), Some(VerificationError::NoFingerprint));
    assert_eq!(err.to_string(), "Certificate error: NO_FINGERPRINT");
}

#[cfg(unix)]
#[test]
fn authenticate_reports_registration_failure() {
    let tmp = TempDir::new().unwrap();
    // A regular file where the storage directory should be.
    let blocker = tmp.path().join("blocked");
    fs::write(&blocker, b"").unwrap();

    let service = DeviceIdentityService::new(
        StaticProbe::machine_a(),
        CertificateStore::new(blocker.join(".srams")),
        CertificateSigner::default(),
    );

    assert!(service.generate_certificate().is_err());
    let err = service.authenticate().unwrap_err();
    assert!(matches!(err, DeviceAuthError::RegistrationFailed(_)));
    assert!(err.to_string().contains("Administrator"));
}
