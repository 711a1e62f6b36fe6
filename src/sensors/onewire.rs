//! DS18B20 temperature probes read through the kernel w1 sysfs interface.
//!
//! With `w1-gpio` and `w1-therm` loaded, every probe on the bus shows up as
//! `/sys/bus/w1/devices/28-xxxxxxxxxxxx/w1_slave`. Reading that file triggers
//! a conversion and returns two lines:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```

use crate::config::OneWireConfig;
use crate::error::{Result, SensorError};
use crate::sensors::data::ProbeReading;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause between reads while the CRC line reports `NO`.
pub const CRC_RETRY_DELAY: Duration = Duration::from_millis(200);

const SLAVE_FILE: &str = "w1_slave";

/// A probe directory found under the sysfs base dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneWireDevice {
    pub id: String,
    pub path: PathBuf,
    /// 1-based index after sorting by id
    pub position: usize,
}

/// The set of probes sharing one family prefix.
#[derive(Debug, Clone)]
pub struct OneWireBus {
    base_dir: PathBuf,
    family: String,
    crc_attempts: u32,
    retry_delay: Duration,
}

impl OneWireBus {
    pub fn new(base_dir: impl Into<PathBuf>, family: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            family: family.into(),
            crc_attempts: 10,
            retry_delay: CRC_RETRY_DELAY,
        }
    }

    pub fn from_config(config: &OneWireConfig) -> Self {
        Self::new(&config.base_dir, &config.family).with_crc_attempts(config.crc_attempts)
    }

    /// Set how many reads are tried before a probe counts as not ready.
    pub fn with_crc_attempts(mut self, attempts: u32) -> Self {
        self.crc_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// List probe directories, sorted by device id.
    pub fn discover(&self) -> Result<Vec<OneWireDevice>> {
        let mut devices = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let id = entry.file_name().to_string_lossy().to_string();
            if id.starts_with(&self.family) {
                devices.push(OneWireDevice {
                    id,
                    path: entry.path(),
                    position: 0,
                });
            }
        }

        devices.sort_by(|a, b| a.id.cmp(&b.id));
        for (index, device) in devices.iter_mut().enumerate() {
            device.position = index + 1;
        }
        debug!("Discovered {} one-wire device(s) in {}", devices.len(), self.base_dir.display());
        Ok(devices)
    }

    /// Read one probe, retrying while its CRC check fails.
    pub fn read_device(&self, device: &OneWireDevice) -> Result<ProbeReading> {
        let slave = device.path.join(SLAVE_FILE);

        for attempt in 1..=self.crc_attempts {
            let text = fs::read_to_string(&slave)?;
            match parse_w1_slave(&text)? {
                Some(millidegrees) => {
                    return Ok(ProbeReading {
                        device_id: device.id.clone(),
                        position: device.position,
                        celsius: millidegrees as f32 / 1000.0,
                    });
                }
                None => {
                    debug!("{}: CRC not valid on attempt {}", device.id, attempt);
                    if attempt < self.crc_attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(SensorError::not_ready(format!(
            "{} failed CRC after {} reads",
            device.id, self.crc_attempts
        )))
    }

    /// Read every discovered probe. A failing probe does not hide the rest.
    pub fn read_all(&self) -> Result<Vec<(OneWireDevice, Result<ProbeReading>)>> {
        let devices = self.discover()?;
        Ok(devices
            .into_iter()
            .map(|device| {
                let reading = self.read_device(&device);
                (device, reading)
            })
            .collect())
    }
}

/// Parse a `w1_slave` file into millidegrees Celsius.
///
/// Returns `Ok(None)` when the CRC line does not end in `YES`.
pub fn parse_w1_slave(text: &str) -> Result<Option<i32>> {
    let mut lines = text.lines();
    let crc_line = lines
        .next()
        .ok_or_else(|| SensorError::parse_error("w1_slave is empty"))?;

    if !crc_line.trim_end().ends_with("YES") {
        return Ok(None);
    }

    let data_line = lines
        .next()
        .ok_or_else(|| SensorError::parse_error("w1_slave is missing its data line"))?;
    let (_, value) = data_line
        .split_once("t=")
        .ok_or_else(|| SensorError::parse_error(format!("No t= field in '{}'", data_line.trim())))?;

    value
        .trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|e| SensorError::parse_error(format!("Bad temperature '{}': {}", value.trim(), e)))
}

/// Load the w1 GPIO master and thermometer drivers.
pub fn load_kernel_modules() {
    for module in ["w1-gpio", "w1-therm"] {
        match Command::new("modprobe").arg(module).status() {
            Ok(status) if status.success() => debug!("Loaded kernel module {}", module),
            Ok(status) => warn!("modprobe {} exited with {}", module, status),
            Err(e) => warn!("Failed to run modprobe {}: {}", module, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_w1_slave(GOOD).unwrap(), Some(23125));
    }

    #[test]
    fn test_parse_negative() {
        let text = "5e ff 4b 46 7f ff 02 10 0d : crc=0d YES\n5e ff 4b 46 7f ff 02 10 0d t=-10125\n";
        assert_eq!(parse_w1_slave(text).unwrap(), Some(-10125));
    }

    #[test]
    fn test_parse_crc_failure() {
        let text = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert_eq!(parse_w1_slave(text).unwrap(), None);
    }

    #[test]
    fn test_parse_missing_field() {
        let text = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57\n";
        assert!(matches!(parse_w1_slave(text), Err(SensorError::Parse(_))));
        assert!(parse_w1_slave("").is_err());
    }

    #[test]
    fn test_parse_garbage_value() {
        let text = "00 : crc=00 YES\n00 t=abc\n";
        assert!(parse_w1_slave(text).is_err());
    }
}
