//! I2C bus access for register-based sensors.
//!
//! Drivers are generic over [`embedded_hal::i2c::I2c`] so they run against
//! `embedded-hal-mock` in tests. On a Raspberry Pi the bus is a
//! `linux-embedded-hal` `I2cdev`, only compiled with the `hardware` feature.

use crate::error::{Result, SensorError};

/// Character device path of the numbered I2C bus.
pub fn device_path(bus: u8) -> String {
    format!("/dev/i2c-{}", bus)
}

/// Wrap a bus error with the device address it came from.
pub fn i2c_error(address: u8, err: impl embedded_hal::i2c::Error) -> SensorError {
    SensorError::i2c_error(format!("Transfer with {:#04x} failed: {:?}", address, err.kind()))
}

#[cfg(feature = "hardware")]
pub use linux_embedded_hal::{Delay, I2cdev};

/// Open the numbered I2C bus.
#[cfg(feature = "hardware")]
pub fn open_i2c(bus: u8) -> Result<I2cdev> {
    let path = device_path(bus);
    I2cdev::new(&path).map_err(|e| SensorError::i2c_error(format!("Failed to open {}: {}", path, e)))
}

/// Fail with a message naming the sensor that needed the bus.
#[cfg(not(feature = "hardware"))]
pub fn unavailable(sensor: &str, bus: u8) -> SensorError {
    SensorError::unavailable(format!(
        "{} on {} requires the `hardware` feature",
        sensor,
        device_path(bus)
    ))
}

/// Check that an address fits in seven bits.
pub fn check_address(address: u8) -> Result<u8> {
    if address > 0x7f {
        return Err(SensorError::config_error(format!(
            "{:#04x} is not a 7-bit I2C address",
            address
        )));
    }
    Ok(address)
}
