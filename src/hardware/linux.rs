use std::fs;

use super::{clean_bios_serial, clean_value, run_command, run_command_with_env};

fn read_trimmed(path: &str) -> Option<String> {
    fs::read_to_string(path).ok().and_then(|s| clean_value(&s))
}

/// systemd/D-Bus machine id.
pub fn machine_guid() -> Option<String> {
    read_trimmed("/etc/machine-id").or_else(|| read_trimmed("/var/lib/dbus/machine-id"))
}

/// CPU model name as reported by `lscpu`, read under the C locale so the
/// label is not translated.
pub fn cpu_id() -> Option<String> {
    let output = run_command_with_env("lscpu", &[], &[("LC_ALL", "C")])?;
    output
        .lines()
        .find(|line| line.trim_start().starts_with("Model name"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, value)| clean_value(value))
}

/// Filesystem UUID of the root mount.
pub fn volume_serial() -> Option<String> {
    run_command("findmnt", &["-no", "UUID", "/"]).and_then(|out| clean_value(&out))
}

/// DMI product serial. Usually readable by root only.
pub fn bios_serial() -> Option<String> {
    fs::read_to_string("/sys/class/dmi/id/product_serial")
        .ok()
        .and_then(|s| clean_bios_serial(&s))
}
