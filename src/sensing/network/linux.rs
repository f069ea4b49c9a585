use std::io::ErrorKind;

use log::debug;

use super::{non_empty, run_command, NetworkSensor};
use crate::error::SensorError;

/// `iwgetid -r`, falling back to NetworkManager's `nmcli`.
#[derive(Debug, Clone, Copy)]
pub struct LinuxSensor {
    iwgetid: &'static str,
    nmcli: &'static str,
}

impl Default for LinuxSensor {
    fn default() -> Self {
        Self {
            iwgetid: "iwgetid",
            nmcli: "nmcli",
        }
    }
}

impl NetworkSensor for LinuxSensor {
    async fn sense(&self) -> Result<Option<String>, SensorError> {
        // iwgetid exits non-zero when disconnected, so a failure here is not
        // conclusive on its own.
        let iwgetid_ran = match run_command(self.iwgetid, &["-r"]).await {
            Ok(stdout) => {
                if let Some(ssid) = non_empty(&stdout) {
                    return Ok(Some(ssid));
                }
                true
            }
            Err(err) => {
                debug!("iwgetid lookup failed, trying nmcli: {err}");
                !matches!(err, SensorError::Spawn { .. })
            }
        };

        match run_command(self.nmcli, &["-t", "-f", "active,ssid", "dev", "wifi"]).await {
            Ok(stdout) => Ok(parse_nmcli_output(&stdout)),
            // No NetworkManager: iwgetid's answer is all there is.
            Err(SensorError::Spawn { source, .. })
                if iwgetid_ran && source.kind() == ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Pick the active row from `nmcli -t -f active,ssid dev wifi`.
pub fn parse_nmcli_output(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("yes:"))
        .map(unescape_terse)
        .filter(|ssid| !ssid.is_empty())
}

// nmcli's terse mode escapes ':' and '\' with a backslash.
fn unescape_terse(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
