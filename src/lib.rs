//! # Growtacular - Raspberry Pi sensor bring-up console
//!
//! Polls the environmental sensors of a Growtacular grow box and prints the
//! readings to the console on a fixed interval.
//!
//! ## Sensors
//!
//! - **DS18B20 probes**: one or more on the one-wire bus, read through sysfs
//! - **DHT11 / DHT22**: air temperature and humidity on a GPIO pin (feature-gated)
//! - **BME280**: temperature, humidity and pressure over I2C (feature-gated)
//! - **ADS1115**: soil moisture probe voltage over I2C (feature-gated)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use growtacular::{Report, SensorCollector, SensorConfig, TemperatureUnit};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut collector = SensorCollector::from_config(&SensorConfig::default())?;
//!     let snapshot = collector.collect_snapshot();
//!     print!("{}", Report::new(&snapshot, TemperatureUnit::Fahrenheit));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod sensors;
pub mod units;

// Re-export public API
pub use config::SensorConfig;
pub use error::{Result, SensorError};
pub use report::Report;
pub use sensors::{
    collector::SensorCollector,
    data::{AirReading, ClimateReading, MoistureReading, ProbeReading, SensorFault, SensorKind, SensorSnapshot},
    onewire::OneWireBus,
    traits::{AirSensor, ClimateSensor, MoistureSensor},
};
pub use units::TemperatureUnit;

/// The default polling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 5000;
