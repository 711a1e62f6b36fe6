//! Sensor stack configuration.

use crate::error::{Result, SensorError};
use crate::sensors::ads1115::Gain;
use crate::sensors::bus::check_address;
use crate::sensors::dht::DhtModel;
use crate::units::TemperatureUnit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kernel sysfs directory holding one-wire slaves.
pub const DEFAULT_ONEWIRE_DIR: &str = "/sys/bus/w1/devices";

/// One-wire family code of the DS18B20.
pub const DEFAULT_ONEWIRE_FAMILY: &str = "28";

/// BCM pin the DHT data line is wired to.
pub const DEFAULT_DHT_PIN: u8 = 17;

pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_BME280_ADDRESS: u8 = 0x77;
pub const DEFAULT_ADS1115_ADDRESS: u8 = 0x48;

/// Shortest accepted poll interval.
pub const MIN_INTERVAL_MS: u64 = 100;

/// Configuration for the sensor collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Poll interval in milliseconds
    pub interval_ms: u64,
    /// Unit used for printed temperatures
    pub unit: TemperatureUnit,
    pub onewire: OneWireConfig,
    pub dht: DhtConfig,
    pub bme280: Bme280Config,
    pub soil: SoilConfig,
    /// I2C bus shared by the BME280 and the ADS1115
    pub i2c_bus: u8,
}

/// One-wire probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneWireConfig {
    pub enabled: bool,
    pub base_dir: PathBuf,
    /// Device directory prefix, e.g. `28` for `28-0316a2795aff`
    pub family: String,
    /// Run `modprobe w1-gpio w1-therm` before discovery
    pub load_modules: bool,
    /// Reads attempted while the CRC line is not `YES`
    pub crc_attempts: u32,
}

/// DHT humidity sensor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhtConfig {
    pub enabled: bool,
    pub pin: u8,
    pub model: DhtModel,
    pub attempts: u32,
    pub retry_delay_ms: u64,
}

/// BME280 settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bme280Config {
    pub enabled: bool,
    /// 0x76 or 0x77, set by the SDO pin
    pub address: u8,
}

/// ADS1115 soil moisture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilConfig {
    pub enabled: bool,
    pub address: u8,
    pub channel: u8,
    pub gain: Gain,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            interval_ms: crate::DEFAULT_INTERVAL_MS,
            unit: TemperatureUnit::default(),
            onewire: OneWireConfig::default(),
            dht: DhtConfig::default(),
            bme280: Bme280Config::default(),
            soil: SoilConfig::default(),
            i2c_bus: DEFAULT_I2C_BUS,
        }
    }
}

impl Default for OneWireConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: PathBuf::from(DEFAULT_ONEWIRE_DIR),
            family: DEFAULT_ONEWIRE_FAMILY.to_string(),
            load_modules: false,
            crc_attempts: 10,
        }
    }
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pin: DEFAULT_DHT_PIN,
            model: DhtModel::Dht11,
            attempts: 15,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for Bme280Config {
    fn default() -> Self {
        Self {
            enabled: true,
            address: DEFAULT_BME280_ADDRESS,
        }
    }
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: DEFAULT_ADS1115_ADDRESS,
            channel: 0,
            gain: Gain::One,
        }
    }
}

impl SensorConfig {
    /// Set the poll interval.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the display unit.
    pub fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the one-wire sysfs directory.
    pub fn with_onewire_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.onewire.base_dir = dir.into();
        self
    }

    /// Set the DHT data pin and model.
    pub fn with_dht(mut self, pin: u8, model: DhtModel) -> Self {
        self.dht.pin = pin;
        self.dht.model = model;
        self
    }

    pub fn with_i2c_bus(mut self, bus: u8) -> Self {
        self.i2c_bus = bus;
        self
    }

    /// Set the soil moisture ADC channel and gain.
    pub fn with_soil_channel(mut self, channel: u8, gain: Gain) -> Self {
        self.soil.channel = channel;
        self.soil.gain = gain;
        self
    }

    /// Disable every sensor. Useful as a base for enabling a chosen few.
    pub fn all_disabled(mut self) -> Self {
        self.onewire.enabled = false;
        self.dht.enabled = false;
        self.bme280.enabled = false;
        self.soil.enabled = false;
        self
    }

    /// Check the configuration before any device is opened.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms < MIN_INTERVAL_MS {
            return Err(SensorError::config_error(format!(
                "Interval must be at least {}ms, got {}ms",
                MIN_INTERVAL_MS, self.interval_ms
            )));
        }
        if self.soil.channel > 3 {
            return Err(SensorError::config_error(format!(
                "ADS1115 channel must be 0-3, got {}",
                self.soil.channel
            )));
        }
        if self.onewire.family.is_empty() {
            return Err(SensorError::config_error("One-wire family prefix is empty"));
        }
        for (name, address) in [("BME280", self.bme280.address), ("ADS1115", self.soil.address)] {
            check_address(address)
                .map_err(|e| SensorError::config_error(format!("{} address: {}", name, e)))?;
        }
        if !matches!(self.bme280.address, 0x76 | 0x77) {
            return Err(SensorError::config_error(format!(
                "BME280 address must be 0x76 or 0x77, got {:#04x}",
                self.bme280.address
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_wiring() {
        let config = SensorConfig::default();
        assert_eq!(config.interval_ms, 5000);
        assert_eq!(config.dht.pin, 17);
        assert_eq!(config.dht.model, DhtModel::Dht11);
        assert_eq!(config.onewire.base_dir, PathBuf::from("/sys/bus/w1/devices"));
        assert_eq!(config.onewire.family, "28");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_short_interval() {
        let config = SensorConfig::default().with_interval_ms(10);
        assert!(matches!(config.validate(), Err(SensorError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_channel() {
        let config = SensorConfig::default().with_soil_channel(4, Gain::One);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_wide_address() {
        let mut config = SensorConfig::default();
        config.bme280.address = 0x80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bme280_address_is_sdo_strapped() {
        let mut config = SensorConfig::default();
        config.bme280.address = 0x76;
        assert!(config.validate().is_ok());
        config.bme280.address = 0x48;
        assert!(matches!(config.validate(), Err(SensorError::Config(_))));
    }

    #[test]
    fn test_all_disabled() {
        let config = SensorConfig::default().all_disabled();
        assert!(!config.onewire.enabled);
        assert!(!config.dht.enabled);
        assert!(!config.bme280.enabled);
        assert!(!config.soil.enabled);
    }
}
