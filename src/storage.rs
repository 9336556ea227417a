//! On-disk certificate storage.
//!
//! Two files live side by side in the storage directory:
//!
//! - `device.cert` - JSON [`EncryptedBlob`] holding the certificate
//! - `device.fp` - the plaintext fingerprint, used as a pre-check
//!
//! The default directory is `~/.srams`. The pair is only meaningful together:
//! if either file is missing the device has no certificate.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::encryption::EncryptedBlob;
use crate::errors::{IdentityError, IdentityResult};
use crate::fingerprint::Fingerprint;

/// File names for stored data.
pub const CERTIFICATE_FILE: &str = "device.cert";
pub const FINGERPRINT_FILE: &str = "device.fp";

/// Name of the default storage directory under the user's home.
const APP_DIR: &str = ".srams";

/// Get the default storage directory (`~/.srams`).
pub fn default_storage_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

/// Location of the certificate pair.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    dir: PathBuf,
}

impl CertificateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at [`default_storage_dir`].
    pub fn default_location() -> IdentityResult<Self> {
        default_storage_dir()
            .map(Self::new)
            .ok_or(IdentityError::NoStorageDirectory)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn certificate_path(&self) -> PathBuf {
        self.dir.join(CERTIFICATE_FILE)
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.dir.join(FINGERPRINT_FILE)
    }

    pub fn certificate_exists(&self) -> bool {
        self.certificate_path().exists()
    }

    pub fn fingerprint_exists(&self) -> bool {
        self.fingerprint_path().exists()
    }

    /// Write both files, creating the directory if needed. Existing files are
    /// overwritten.
    pub fn save(&self, blob: &EncryptedBlob, fingerprint: &Fingerprint) -> IdentityResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.certificate_path(), blob.to_json()?)?;
        fs::write(self.fingerprint_path(), fingerprint.as_str())?;
        log::debug!("Saved device certificate to {}", self.dir.display());
        Ok(())
    }

    /// Raw bytes of `device.cert`, `None` if it does not exist.
    pub fn load_certificate(&self) -> IdentityResult<Option<Vec<u8>>> {
        read_optional(&self.certificate_path())
    }

    /// Trimmed contents of `device.fp`, `None` if it does not exist.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, so a damaged file reads
    /// as a fingerprint that will not match.
    pub fn load_fingerprint(&self) -> IdentityResult<Option<Fingerprint>> {
        Ok(read_optional(&self.fingerprint_path())?
            .map(|raw| Fingerprint::from_hex(String::from_utf8_lossy(&raw).trim())))
    }

    /// Delete both files. Files that are already gone are not an error.
    ///
    /// Both deletions are attempted; the first failure is returned.
    pub fn clear(&self) -> IdentityResult<()> {
        let cert = remove_if_present(&self.certificate_path());
        let fp = remove_if_present(&self.fingerprint_path());
        cert.and(fp)
    }
}

fn read_optional(path: &Path) -> IdentityResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IdentityError::Storage(e)),
    }
}

fn remove_if_present(path: &Path) -> IdentityResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IdentityError::Storage(e)),
    }
}
