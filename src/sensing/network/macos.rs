use log::debug;

use super::{non_empty, run_command, NetworkSensor};
use crate::error::SensorError;

const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";
const DEFAULT_WIFI_DEVICE: &str = "en0";

/// `airport -I`, falling back to `networksetup` on releases that removed it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacSensor;

impl NetworkSensor for MacSensor {
    async fn sense(&self) -> Result<Option<String>, SensorError> {
        match run_command(AIRPORT_PATH, &["-I"]).await {
            Ok(stdout) => return Ok(parse_airport_output(&stdout)),
            Err(err) => debug!("airport lookup failed, trying networksetup: {err}"),
        }

        let stdout =
            run_command("networksetup", &["-getairportnetwork", DEFAULT_WIFI_DEVICE]).await?;
        Ok(parse_networksetup_output(&stdout))
    }
}

/// Value of the `SSID:` line. The `BSSID:` line is skipped.
pub fn parse_airport_output(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("SSID:"))
        .and_then(non_empty)
}

/// `Current Wi-Fi Network: <name>`; anything else means not associated.
pub fn parse_networksetup_output(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.split_once("Network:").map(|(_, name)| name))
        .and_then(non_empty)
}
