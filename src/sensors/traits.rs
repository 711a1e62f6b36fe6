//! Traits for sensor reads.

use crate::error::Result;
use crate::sensors::data::{AirReading, ClimateReading, MoistureReading};

/// A sensor that reports air temperature and relative humidity.
pub trait AirSensor {
    fn read_air(&mut self) -> Result<AirReading>;
}

/// A sensor that reports temperature, humidity and barometric pressure.
pub trait ClimateSensor {
    fn read_climate(&mut self) -> Result<ClimateReading>;
}

/// A soil moisture probe behind an ADC.
pub trait MoistureSensor {
    fn read_moisture(&mut self) -> Result<MoistureReading>;
}

impl<T: AirSensor + ?Sized> AirSensor for Box<T> {
    fn read_air(&mut self) -> Result<AirReading> {
        (**self).read_air()
    }
}

impl<T: ClimateSensor + ?Sized> ClimateSensor for Box<T> {
    fn read_climate(&mut self) -> Result<ClimateReading> {
        (**self).read_climate()
    }
}

impl<T: MoistureSensor + ?Sized> MoistureSensor for Box<T> {
    fn read_moisture(&mut self) -> Result<MoistureReading> {
        (**self).read_moisture()
    }
}
