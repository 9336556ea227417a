//! Hardware fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the present hardware components,
//! tagged and joined with `|` in the fixed order MG, CPU, VOL, MAC, BIOS:
//!
//! ```text
//! sha256("MG:<guid>|CPU:<id>|VOL:<serial>|MAC:<mac>|BIOS:<serial>")
//! ```
//!
//! Absent components are left out entirely, so a machine that loses a network
//! adapter gets a different fingerprint. With no components at all the
//! fingerprint is the digest of the empty string.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hardware::HardwareProbe;

/// Identifier kinds, in fingerprint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    MachineGuid,
    Cpu,
    Volume,
    Mac,
    Bios,
}

impl ComponentTag {
    pub const ALL: [ComponentTag; 5] = [
        ComponentTag::MachineGuid,
        ComponentTag::Cpu,
        ComponentTag::Volume,
        ComponentTag::Mac,
        ComponentTag::Bios,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentTag::MachineGuid => "MG",
            ComponentTag::Cpu => "CPU",
            ComponentTag::Volume => "VOL",
            ComponentTag::Mac => "MAC",
            ComponentTag::Bios => "BIOS",
        }
    }
}

impl fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `"<TAG>:<value>"` fingerprint input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareComponent {
    pub tag: ComponentTag,
    pub value: String,
}

impl HardwareComponent {
    pub fn new(tag: ComponentTag, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

impl fmt::Display for HardwareComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.value)
    }
}

/// Lowercase hex SHA-256 fingerprint of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash an ordered list of components.
    pub fn from_components(components: &[HardwareComponent]) -> Self {
        let joined = components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        Self(hex::encode(Sha256::digest(joined.as_bytes())))
    }

    /// Wrap an already computed fingerprint string, e.g. one read from disk.
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// AES-256 key for certificates bound to this fingerprint:
    /// `SHA-256(fingerprint hex string)`.
    pub fn storage_key(&self) -> [u8; 32] {
        Sha256::digest(self.0.as_bytes()).into()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Fingerprint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Fingerprint {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Query every probe and keep the components that are present, in
/// fingerprint order.
pub fn collect_components<P: HardwareProbe + ?Sized>(probe: &P) -> Vec<HardwareComponent> {
    ComponentTag::ALL
        .iter()
        .filter_map(|&tag| {
            let value = match tag {
                ComponentTag::MachineGuid => probe.machine_guid(),
                ComponentTag::Cpu => probe.cpu_id(),
                ComponentTag::Volume => probe.volume_serial(),
                ComponentTag::Mac => probe.mac_address(),
                ComponentTag::Bios => probe.bios_serial(),
            };
            if value.is_none() {
                log::debug!("hardware component {tag} unavailable");
            }
            value.map(|v| HardwareComponent::new(tag, v))
        })
        .collect()
}

/// Compute the live fingerprint of the machine behind `probe`.
pub fn collect<P: HardwareProbe + ?Sized>(probe: &P) -> Fingerprint {
    Fingerprint::from_components(&collect_components(probe))
}
