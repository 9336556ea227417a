//! SRAMS device identity - hardware-bound certificates for Super Admin login.
//!
//! The launcher only lets a Super Admin log in from a registered machine. On
//! first login a certificate is issued that binds the machine's hardware
//! fingerprint; later logins re-derive the fingerprint and check it against
//! the stored certificate.
//!
//! # Example
//!
//! ```no_run
//! use device_identity::config::DeviceIdentityConfig;
//! use device_identity::service::DeviceIdentityService;
//!
//! let config = DeviceIdentityConfig::load()?;
//! let service = DeviceIdentityService::from_config(&config)?;
//!
//! match service.authenticate() {
//!     Ok(device) => println!("device {} ok", device.fingerprint),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # Ok::<(), device_identity::errors::IdentityError>(())
//! ```

pub mod certificate;
pub mod config;
pub mod encryption;
pub mod errors;
pub mod fingerprint;
pub mod hardware;
pub mod service;
pub mod signing;
pub mod storage;
pub mod verification;

pub use errors::{IdentityError, IdentityResult};
pub use fingerprint::Fingerprint;
pub use hardware::{HardwareProbe, NetworkAdapter, SystemProbe};
pub use service::{DeviceAuthError, DeviceAuthentication, DeviceIdentityService};
pub use verification::{VerificationError, VerificationResult};
