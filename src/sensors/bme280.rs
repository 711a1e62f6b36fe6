//! Bosch BME280 temperature, humidity and pressure sensor over I2C.
//!
//! Register access and compensation come from the `bme280` crate; this
//! module adapts it to [`ClimateSensor`] and the crate error type.

use crate::config::Bme280Config;
use crate::error::{Result, SensorError};
use crate::sensors::data::ClimateReading;
use crate::sensors::traits::ClimateSensor;
use crate::units::pascals_to_hpa;
use ::bme280::i2c::BME280;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use std::fmt::Debug;
use tracing::debug;

/// Address with SDO tied to ground.
pub const PRIMARY_ADDRESS: u8 = 0x76;
/// Address with SDO tied to VDDIO.
pub const SECONDARY_ADDRESS: u8 = 0x77;

/// BME280 driver wrapper that initializes on first use.
pub struct Bme280Sensor<I2C, D> {
    device: BME280<I2C>,
    delay: D,
    address: u8,
    initialized: bool,
}

impl<I2C, E, D> Bme280Sensor<I2C, D>
where
    I2C: I2c<Error = E>,
    E: Debug,
    D: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: D) -> Result<Self> {
        let device = match address {
            PRIMARY_ADDRESS => BME280::new_primary(i2c),
            SECONDARY_ADDRESS => BME280::new_secondary(i2c),
            other => {
                return Err(SensorError::config_error(format!(
                    "BME280 address must be {:#04x} or {:#04x}, got {:#04x}",
                    PRIMARY_ADDRESS, SECONDARY_ADDRESS, other
                )))
            }
        };

        Ok(Self {
            device,
            delay,
            address,
            initialized: false,
        })
    }

    /// Verify the chip, reset it and load calibration.
    pub fn init(&mut self) -> Result<()> {
        self.device
            .init(&mut self.delay)
            .map_err(|e| map_error(self.address, e))?;
        self.initialized = true;
        debug!("BME280 at {:#04x} initialized", self.address);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run one forced conversion.
    pub fn measure(&mut self) -> Result<ClimateReading> {
        if !self.initialized {
            self.init()?;
        }

        let measurements = self
            .device
            .measure(&mut self.delay)
            .map_err(|e| map_error(self.address, e))?;

        Ok(ClimateReading {
            celsius: measurements.temperature,
            humidity_percent: measurements.humidity,
            pressure_hpa: pascals_to_hpa(measurements.pressure),
        })
    }
}

impl<I2C, E, D> ClimateSensor for Bme280Sensor<I2C, D>
where
    I2C: I2c<Error = E>,
    E: Debug,
    D: DelayNs,
{
    fn read_climate(&mut self) -> Result<ClimateReading> {
        self.measure()
    }
}

fn map_error<E: Debug>(address: u8, err: ::bme280::Error<E>) -> SensorError {
    match err {
        ::bme280::Error::UnsupportedChip => SensorError::unavailable(format!(
            "Device at {:#04x} is not a BME280",
            address
        )),
        other => SensorError::i2c_error(format!("BME280 at {:#04x}: {:?}", address, other)),
    }
}

/// Open and initialize the BME280 on `i2c_bus`.
#[cfg(feature = "hardware")]
pub fn open(i2c_bus: u8, config: &Bme280Config) -> Result<Box<dyn ClimateSensor + Send>> {
    use crate::sensors::bus::{open_i2c, Delay};

    let mut sensor = Bme280Sensor::new(open_i2c(i2c_bus)?, config.address, Delay)?;
    sensor.init()?;
    Ok(Box::new(sensor))
}

/// Open and initialize the BME280 on `i2c_bus`.
#[cfg(not(feature = "hardware"))]
pub fn open(i2c_bus: u8, config: &Bme280Config) -> Result<Box<dyn ClimateSensor + Send>> {
    debug!("BME280 requested at {:#04x}", config.address);
    Err(crate::sensors::bus::unavailable("BME280", i2c_bus))
}
