//! Hardware identifier probes.
//!
//! Each probe answers with `Some(value)` or `None`. A missing command, a
//! failed query or a known placeholder value are all reported as `None`;
//! probing never fails.

use std::process::Command;

use sysinfo::Networks;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as platform;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as platform;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod platform {
    pub fn machine_guid() -> Option<String> {
        None
    }

    pub fn cpu_id() -> Option<String> {
        None
    }

    pub fn volume_serial() -> Option<String> {
        None
    }

    pub fn bios_serial() -> Option<String> {
        None
    }
}

/// BIOS serial values that firmware vendors ship unconfigured.
const BIOS_PLACEHOLDERS: &[&str] = &["To Be Filled By O.E.M.", "Default string"];

/// One entry of the network adapter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    /// Adapter name as reported by the OS.
    pub name: String,
    /// MAC address in `aa:bb:cc:dd:ee:ff` form.
    pub mac: String,
    /// Internal (loopback) adapter.
    pub internal: bool,
}

impl NetworkAdapter {
    pub fn new(name: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mac: mac.into(),
            internal: false,
        }
    }
}

/// Source of the raw hardware identifiers a fingerprint is built from.
pub trait HardwareProbe {
    fn machine_guid(&self) -> Option<String>;

    fn cpu_id(&self) -> Option<String>;

    /// Serial number of the primary (system) volume.
    fn volume_serial(&self) -> Option<String>;

    fn network_adapters(&self) -> Vec<NetworkAdapter>;

    fn bios_serial(&self) -> Option<String>;

    /// MAC address of the primary physical adapter.
    fn mac_address(&self) -> Option<String> {
        select_primary_mac(&self.network_adapters())
    }
}

impl<P: HardwareProbe + ?Sized> HardwareProbe for &P {
    fn machine_guid(&self) -> Option<String> {
        (**self).machine_guid()
    }

    fn cpu_id(&self) -> Option<String> {
        (**self).cpu_id()
    }

    fn volume_serial(&self) -> Option<String> {
        (**self).volume_serial()
    }

    fn network_adapters(&self) -> Vec<NetworkAdapter> {
        (**self).network_adapters()
    }

    fn bios_serial(&self) -> Option<String> {
        (**self).bios_serial()
    }

    fn mac_address(&self) -> Option<String> {
        (**self).mac_address()
    }
}

/// Pick the MAC of the first physical adapter.
///
/// Adapters whose name mentions `virtual` or `loopback`, internal adapters and
/// all-zero addresses are skipped. The result has colons stripped and is
/// uppercased.
pub fn select_primary_mac(adapters: &[NetworkAdapter]) -> Option<String> {
    adapters
        .iter()
        .filter(|adapter| {
            let name = adapter.name.to_lowercase();
            !name.contains("virtual") && !name.contains("loopback")
        })
        .filter(|adapter| !adapter.internal)
        .map(|adapter| adapter.mac.replace([':', '-'], "").to_uppercase())
        .find(|mac| !mac.is_empty() && mac.chars().any(|c| c != '0'))
}

/// Trim a probe value, mapping empty output to `None`.
pub fn clean_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Like [`clean_value`], additionally rejecting vendor placeholder serials.
pub fn clean_bios_serial(raw: &str) -> Option<String> {
    clean_value(raw).filter(|serial| !BIOS_PLACEHOLDERS.contains(&serial.as_str()))
}

/// Run a command and return its stdout, or `None` if it could not be run or
/// exited unsuccessfully.
pub(crate) fn run_command(program: &str, args: &[&str]) -> Option<String> {
    run_command_with_env(program, args, &[])
}

/// [`run_command`] with extra environment variables set for the child.
pub(crate) fn run_command_with_env(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Option<String> {
    let mut command = Command::new(program);
    command.args(args).envs(envs.iter().copied());

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    match command.output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            log::debug!("{program} exited with {}", output.status);
            None
        }
        Err(e) => {
            log::debug!("failed to run {program}: {e}");
            None
        }
    }
}

/// Second line of `wmic <class> get <Property>` style output.
#[cfg(any(target_os = "windows", test))]
pub(crate) fn second_line(output: &str) -> Option<String> {
    output.trim().lines().nth(1).and_then(clean_value)
}

/// A WMI property, addressed both by its `wmic` alias and by its CIM class.
#[cfg(any(target_os = "windows", test))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct WmiQuery {
    /// `wmic` alias, e.g. `cpu`.
    pub alias: &'static str,
    /// Full CIM class name, e.g. `Win32_Processor`.
    pub class: &'static str,
    pub property: &'static str,
}

#[cfg(any(target_os = "windows", test))]
impl WmiQuery {
    pub const PROCESSOR_ID: WmiQuery = WmiQuery {
        alias: "cpu",
        class: "Win32_Processor",
        property: "ProcessorId",
    };

    pub const BIOS_SERIAL: WmiQuery = WmiQuery {
        alias: "bios",
        class: "Win32_BIOS",
        property: "SerialNumber",
    };

    pub fn wmic_args(&self) -> [&'static str; 3] {
        [self.alias, "get", self.property]
    }

    /// PowerShell one-liner reading the property from the first instance.
    pub fn cim_script(&self) -> String {
        format!(
            "(Get-CimInstance -ClassName {} -ErrorAction SilentlyContinue | Select-Object -First 1).{}",
            self.class, self.property
        )
    }
}

/// Probe backed by the running operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl HardwareProbe for SystemProbe {
    fn machine_guid(&self) -> Option<String> {
        platform::machine_guid()
    }

    fn cpu_id(&self) -> Option<String> {
        platform::cpu_id()
    }

    fn volume_serial(&self) -> Option<String> {
        platform::volume_serial()
    }

    fn network_adapters(&self) -> Vec<NetworkAdapter> {
        let networks = Networks::new_with_refreshed_list();
        let mut adapters: Vec<NetworkAdapter> = networks
            .list()
            .iter()
            .map(|(name, data)| NetworkAdapter {
                name: name.clone(),
                mac: data.mac_address().to_string(),
                internal: name == "lo" || name.starts_with("lo0"),
            })
            .collect();
        // The OS table comes back unordered.
        adapters.sort_by(|a, b| a.name.cmp(&b.name));
        adapters
    }

    fn bios_serial(&self) -> Option<String> {
        platform::bios_serial()
    }
}
