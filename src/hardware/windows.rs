use std::sync::OnceLock;

use regex::Regex;

use super::{clean_bios_serial, clean_value, run_command, second_line, WmiQuery};

/// Query a single WMI property, preferring `wmic` and falling back to
/// PowerShell CIM where `wmic` has been removed.
fn wmi_property(query: WmiQuery) -> Option<String> {
    let wmic = run_command("wmic", &query.wmic_args()).and_then(|out| second_line(&out));
    if wmic.is_some() {
        return wmic;
    }

    let script = query.cim_script();
    run_command("powershell", &["-NoProfile", "-NonInteractive", "-Command", &script])
        .and_then(|out| clean_value(&out))
}

/// Machine GUID from `HKLM\SOFTWARE\Microsoft\Cryptography`.
pub fn machine_guid() -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"MachineGuid\s+REG_SZ\s+(.+)").ok())
        .as_ref()?;

    let output = run_command(
        "reg",
        &["query", r"HKLM\SOFTWARE\Microsoft\Cryptography", "/v", "MachineGuid"],
    )?;
    pattern
        .captures(&output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_value(m.as_str()))
}

pub fn cpu_id() -> Option<String> {
    wmi_property(WmiQuery::PROCESSOR_ID)
}

/// Serial of the `C:` volume with the dash removed (`1234-ABCD` -> `1234ABCD`).
pub fn volume_serial() -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(?i)Serial Number is ([A-F0-9-]+)").ok())
        .as_ref()?;

    let output = run_command("cmd", &["/C", "vol", "C:"])?;
    pattern
        .captures(&output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_value(&m.as_str().replace('-', "")))
}

pub fn bios_serial() -> Option<String> {
    wmi_property(WmiQuery::BIOS_SERIAL).and_then(|serial| clean_bios_serial(&serial))
}
