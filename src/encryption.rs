//! Symmetric encryption of certificates at rest.
//!
//! AES-256-GCM with a random 96-bit IV. The on-disk form keeps IV, auth tag
//! and ciphertext as separate hex strings:
//!
//! ```json
//! { "iv": "<24 hex>", "tag": "<32 hex>", "data": "<hex>" }
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use rand::rngs::OsRng;
use rand::TryRngCore;

use serde::{Deserialize, Serialize};

use crate::errors::{IdentityError, IdentityResult};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// GCM nonce size in bytes (96-bit).
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypted certificate as stored in `device.cert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Hex-encoded 12-byte IV.
    pub iv: String,
    /// Hex-encoded GCM authentication tag.
    pub tag: String,
    /// Hex-encoded ciphertext.
    pub data: String,
}

impl EncryptedBlob {
    /// Encrypt `plaintext` under `key` with a fresh random IV.
    pub fn seal(plaintext: &[u8], key: &[u8]) -> IdentityResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(IdentityError::Encryption(format!(
                "invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

        let mut iv = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| IdentityError::Encryption(format!("failed to generate IV: {e}")))?;

        let mut ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| IdentityError::Encryption(format!("encryption failed: {e}")))?;

        // aes-gcm appends the tag to the ciphertext.
        let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

        Ok(Self {
            iv: hex::encode(iv),
            tag: hex::encode(tag),
            data: hex::encode(ciphertext),
        })
    }

    /// Decrypt and authenticate the blob.
    pub fn open(&self, key: &[u8]) -> IdentityResult<Vec<u8>> {
        if key.len() != KEY_SIZE {
            return Err(IdentityError::Decryption(format!(
                "invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let iv = decode_field("iv", &self.iv)?;
        if iv.len() != NONCE_SIZE {
            return Err(IdentityError::Decryption(format!(
                "invalid IV length: expected {} bytes, got {}",
                NONCE_SIZE,
                iv.len()
            )));
        }

        let tag = decode_field("tag", &self.tag)?;
        if tag.len() != TAG_SIZE {
            return Err(IdentityError::Decryption(format!(
                "invalid tag length: expected {} bytes, got {}",
                TAG_SIZE,
                tag.len()
            )));
        }

        let mut sealed = decode_field("data", &self.data)?;
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|e| IdentityError::Decryption(format!("decryption failed: {e}")))
    }

    /// Parse the JSON stored in `device.cert`.
    pub fn from_json(json: &str) -> IdentityResult<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse raw file bytes. Invalid UTF-8 is reported like any other
    /// malformed blob.
    pub fn from_slice(bytes: &[u8]) -> IdentityResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| IdentityError::Decryption(format!("malformed certificate blob: {e}")))
    }

    pub fn to_json(&self) -> IdentityResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn decode_field(name: &str, value: &str) -> IdentityResult<Vec<u8>> {
    hex::decode(value)
        .map_err(|e| IdentityError::Decryption(format!("{name} is not valid hex: {e}")))
}
