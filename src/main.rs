// src/main.rs

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use device_identity::config::DeviceIdentityConfig;
use device_identity::errors::IdentityResult;
use device_identity::service::DeviceIdentityService;

/// Manage the hardware-bound device certificate used for Super Admin login.
#[derive(Debug, Parser)]
#[command(name = "srams-device", version)]
struct Cli {
    /// Configuration file (defaults to `srams.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding `device.cert` and `device.fp`
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the live hardware fingerprint
    Fingerprint,
    /// Issue a certificate for this machine, replacing any existing one
    Generate,
    /// Verify the stored certificate and print the result as JSON
    Verify,
    /// Show whether a certificate is stored and its fingerprint
    Status,
    /// Delete the stored certificate
    Remove,
    /// Run the login device check, enrolling the machine if needed
    Authenticate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DeviceIdentityConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut config: DeviceIdentityConfig) -> IdentityResult<ExitCode> {
    if let Some(dir) = cli.storage_dir {
        config.storage.dir = dir.to_string_lossy().into_owned();
    }
    let service = DeviceIdentityService::from_config(&config)?;

    match cli.command {
        Command::Fingerprint => {
            println!("{}", service.current_fingerprint());
        }
        Command::Generate => {
            let fingerprint = service.generate_certificate()?;
            println!("{fingerprint}");
        }
        Command::Verify => {
            let result = service.verify_certificate();
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Status => {
            println!("storage: {}", service.store().dir().display());
            println!("certificate: {}", service.has_certificate());
            match service.get_stored_fingerprint() {
                Some(fp) => println!("fingerprint: {fp}"),
                None => println!("fingerprint: none"),
            }
        }
        Command::Remove => {
            if !service.remove_certificate() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Authenticate => match service.authenticate() {
            Ok(device) => {
                if device.enrolled {
                    println!("enrolled: {}", device.fingerprint);
                } else {
                    println!("authenticated: {}", device.fingerprint);
                }
            }
            Err(e) => {
                eprintln!("{e}");
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
