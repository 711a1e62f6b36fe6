//! Sensor drivers, readings and polling.
//!
//! This module provides the drivers for the Growtacular sensor stack: DS18B20
//! probes over the kernel one-wire interface, a DHT11/DHT22 on a GPIO pin,
//! and a BME280 and ADS1115 on a shared I2C bus.

pub mod ads1115;
pub mod bme280;
pub mod bus;
pub mod collector;
pub mod data;
pub mod dht;
pub mod onewire;
pub mod traits;

// Re-export commonly used items
pub use collector::SensorCollector;
pub use data::SensorSnapshot;
pub use traits::{AirSensor, ClimateSensor, MoistureSensor};
