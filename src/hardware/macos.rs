use super::{clean_bios_serial, clean_value, run_command};

/// Value of a quoted `"Key" = "value"` entry in `ioreg` output.
fn ioreg_platform_value(key: &str) -> Option<String> {
    let output = run_command("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
    output
        .lines()
        .find(|line| line.contains(key))
        .and_then(|line| line.split('=').nth(1))
        .map(|value| value.trim().trim_matches('"').to_string())
        .and_then(|value| clean_value(&value))
}

pub fn machine_guid() -> Option<String> {
    ioreg_platform_value("IOPlatformUUID")
}

/// CPU brand string via `sysctl machdep.cpu.brand_string`.
pub fn cpu_id() -> Option<String> {
    run_command("sysctl", &["-n", "machdep.cpu.brand_string"]).and_then(|out| clean_value(&out))
}

/// Volume UUID of the boot volume.
pub fn volume_serial() -> Option<String> {
    let output = run_command("diskutil", &["info", "/"])?;
    output
        .lines()
        .find(|line| line.trim_start().starts_with("Volume UUID"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, value)| clean_value(value))
}

pub fn bios_serial() -> Option<String> {
    ioreg_platform_value("IOPlatformSerialNumber").and_then(|serial| clean_bios_serial(&serial))
}
