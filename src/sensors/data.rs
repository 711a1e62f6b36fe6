//! Data structures for sensor readings.

use crate::units::{celsius_to_fahrenheit, hpa_to_inhg};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every reading taken during one poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Timestamp when this snapshot was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// One-wire probes, `None` when the bus is disabled
    pub probes: Option<Vec<ProbeReading>>,
    /// DHT air temperature and humidity
    pub air: Option<AirReading>,
    /// BME280 temperature, humidity and pressure
    pub climate: Option<ClimateReading>,
    /// ADS1115 soil moisture channel
    pub moisture: Option<MoistureReading>,
    /// Sensors that failed on this poll
    pub faults: Vec<SensorFault>,
}

/// A single one-wire temperature probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReading {
    /// Sysfs device name (e.g., "28-0316a2795aff")
    pub device_id: String,
    /// 1-based place in discovery order, kept when earlier probes fail
    pub position: usize,
    pub celsius: f32,
}

/// DHT air reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirReading {
    pub celsius: f32,
    pub humidity_percent: f32,
}

/// BME280 reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    pub celsius: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
}

/// Soil moisture probe sampled through the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoistureReading {
    /// ADC input (0-3)
    pub channel: u8,
    /// Signed conversion result in counts
    pub raw: i16,
    /// Input voltage for the configured gain
    pub volts: f32,
}

/// Which sensor a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    OneWire,
    Dht,
    Bme280,
    Ads1115,
}

/// A failed read recorded in place of its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFault {
    pub sensor: SensorKind,
    /// Device within the sensor group, for one-wire probes
    pub device: Option<String>,
    pub message: String,
}

impl SensorSnapshot {
    /// Create an empty snapshot with the current timestamp.
    pub fn new() -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            ..Default::default()
        }
    }

    /// Whether every present sensor returned a value.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

impl ProbeReading {
    pub fn fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.celsius)
    }
}

impl AirReading {
    pub fn fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.celsius)
    }
}

impl ClimateReading {
    pub fn fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.celsius)
    }

    pub fn pressure_inhg(&self) -> f32 {
        hpa_to_inhg(self.pressure_hpa)
    }
}

impl SensorKind {
    /// Console label for this sensor group.
    pub fn label(self) -> &'static str {
        match self {
            Self::OneWire => "Probes",
            Self::Dht => "Air Temp",
            Self::Bme280 => "BME280",
            Self::Ads1115 => "Soil Moisture",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl SensorFault {
    pub fn new(sensor: SensorKind, message: impl Into<String>) -> Self {
        Self {
            sensor,
            device: None,
            message: message.into(),
        }
    }

    pub fn for_device(sensor: SensorKind, device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sensor,
            device: Some(device.into()),
            message: message.into(),
        }
    }
}
