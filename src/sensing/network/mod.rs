//! Current Wi-Fi network lookup, one implementation per platform.
//!
//! `Ok(None)` means the lookup worked and the machine is not associated with
//! any network. `Err` means the lookup itself failed; the monitor loop treats
//! that as "unknown" and leaves its state alone.

mod linux;
mod macos;
mod windows;

use std::future::Future;

use tokio::process::Command;

use crate::error::SensorError;

pub use linux::{parse_nmcli_output, LinuxSensor};
pub use macos::{parse_airport_output, parse_networksetup_output, MacSensor};
pub use windows::{parse_netsh_output, WindowsSensor};

pub trait NetworkSensor: Send + Sync + 'static {
    fn sense(&self) -> impl Future<Output = Result<Option<String>, SensorError>> + Send;
}

#[cfg(target_os = "linux")]
pub type PlatformSensor = LinuxSensor;

#[cfg(target_os = "macos")]
pub type PlatformSensor = MacSensor;

#[cfg(target_os = "windows")]
pub type PlatformSensor = WindowsSensor;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub type PlatformSensor = UnsupportedSensor;

pub fn platform_sensor() -> PlatformSensor {
    PlatformSensor::default()
}

/// Sensor for operating systems without a known lookup command.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSensor;

impl NetworkSensor for UnsupportedSensor {
    async fn sense(&self) -> Result<Option<String>, SensorError> {
        Err(SensorError::Unsupported(std::env::consts::OS.to_string()))
    }
}

/// Run a lookup command and return its stdout. Non-zero exit is an error.
async fn run_command(program: &str, args: &[&str]) -> Result<String, SensorError> {
    let command = format!("{program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| SensorError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(SensorError::ExitStatus {
            command,
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
