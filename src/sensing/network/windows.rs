use super::{non_empty, run_command, NetworkSensor};
use crate::error::SensorError;

/// `netsh wlan show interfaces`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsSensor;

impl NetworkSensor for WindowsSensor {
    async fn sense(&self) -> Result<Option<String>, SensorError> {
        let stdout = run_command("netsh", &["wlan", "show", "interfaces"]).await?;
        Ok(parse_netsh_output(&stdout))
    }
}

/// First `SSID : <name>` line, ignoring `BSSID`.
pub fn parse_netsh_output(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.contains("SSID") && !line.contains("BSSID"))
        .find_map(|line| line.split_once(':').map(|(_, value)| value))
        .and_then(non_empty)
}
