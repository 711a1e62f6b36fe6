//! TI ADS1115 16-bit ADC and the soil moisture probe wired to it.

use crate::config::SoilConfig;
use crate::error::{Result, SensorError};
use crate::sensors::bus::i2c_error;
use crate::sensors::data::MoistureReading;
use crate::sensors::traits::MoistureSensor;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS_SINGLE: u16 = 0x8000;
const MUX_SINGLE_ENDED: u16 = 0b100;
const MODE_SINGLE_SHOT: u16 = 0x0100;
const DATA_RATE_128SPS: u16 = 0b100 << 5;
const COMPARATOR_DISABLED: u16 = 0b11;

// 128 SPS gives ~7.8ms per conversion
const READY_POLLS: u32 = 25;
const READY_POLL_DELAY_US: u32 = 1000;

/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    /// ±6.144 V
    TwoThirds,
    /// ±4.096 V
    #[default]
    One,
    /// ±2.048 V
    Two,
    /// ±1.024 V
    Four,
    /// ±0.512 V
    Eight,
    /// ±0.256 V
    Sixteen,
}

impl Gain {
    /// Full-scale input range in volts.
    pub fn full_scale_volts(self) -> f32 {
        match self {
            Self::TwoThirds => 6.144,
            Self::One => 4.096,
            Self::Two => 2.048,
            Self::Four => 1.024,
            Self::Eight => 0.512,
            Self::Sixteen => 0.256,
        }
    }

    fn pga_bits(self) -> u16 {
        let code = match self {
            Self::TwoThirds => 0b000,
            Self::One => 0b001,
            Self::Two => 0b010,
            Self::Four => 0b011,
            Self::Eight => 0b100,
            Self::Sixteen => 0b101,
        };
        code << 9
    }

    /// Volts represented by a conversion result.
    pub fn counts_to_volts(self, counts: i16) -> f32 {
        counts as f32 * self.full_scale_volts() / 32768.0
    }
}

impl FromStr for Gain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "2/3" => Ok(Self::TwoThirds),
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            "4" => Ok(Self::Four),
            "8" => Ok(Self::Eight),
            "16" => Ok(Self::Sixteen),
            other => Err(format!("unknown ADS1115 gain '{}', expected 2/3, 1, 2, 4, 8 or 16", other)),
        }
    }
}

/// ADS1115 driver in single-shot mode.
pub struct Ads1115<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    gain: Gain,
}

impl<I2C: I2c, D: DelayNs> Ads1115<I2C, D> {
    pub fn new(i2c: I2C, address: u8, gain: Gain, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address,
            gain,
        }
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Config register value for a single-ended single-shot read.
    pub fn config_word(&self, channel: u8) -> u16 {
        OS_SINGLE
            | ((MUX_SINGLE_ENDED | channel as u16) << 12)
            | self.gain.pga_bits()
            | MODE_SINGLE_SHOT
            | DATA_RATE_128SPS
            | COMPARATOR_DISABLED
    }

    /// Convert one single-ended input (AIN0-AIN3) and return raw counts.
    pub fn read_channel(&mut self, channel: u8) -> Result<i16> {
        if channel > 3 {
            return Err(SensorError::config_error(format!(
                "ADS1115 has no channel {}",
                channel
            )));
        }

        let [hi, lo] = self.config_word(channel).to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, hi, lo])
            .map_err(|e| i2c_error(self.address, e))?;
        self.wait_ready()?;

        Ok(i16::from_be_bytes(self.read_register(REG_CONVERSION)?))
    }

    fn read_register(&mut self, register: u8) -> Result<[u8; 2]> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| i2c_error(self.address, e))?;
        Ok(buf)
    }

    fn wait_ready(&mut self) -> Result<()> {
        for _ in 0..READY_POLLS {
            if u16::from_be_bytes(self.read_register(REG_CONFIG)?) & OS_SINGLE != 0 {
                return Ok(());
            }
            self.delay.delay_us(READY_POLL_DELAY_US);
        }
        Err(SensorError::timeout(format!(
            "ADS1115 at {:#04x} conversion did not finish",
            self.address
        )))
    }
}

/// Capacitive soil moisture probe on a fixed ADC channel.
pub struct SoilMoistureProbe<I2C, D> {
    adc: Ads1115<I2C, D>,
    channel: u8,
}

impl<I2C: I2c, D: DelayNs> SoilMoistureProbe<I2C, D> {
    pub fn new(adc: Ads1115<I2C, D>, channel: u8) -> Self {
        Self { adc, channel }
    }

    pub fn from_config(i2c: I2C, config: &SoilConfig, delay: D) -> Self {
        Self::new(
            Ads1115::new(i2c, config.address, config.gain, delay),
            config.channel,
        )
    }
}

impl<I2C: I2c, D: DelayNs> MoistureSensor for SoilMoistureProbe<I2C, D> {
    fn read_moisture(&mut self) -> Result<MoistureReading> {
        let raw = self.adc.read_channel(self.channel)?;
        Ok(MoistureReading {
            channel: self.channel,
            raw,
            volts: self.adc.gain().counts_to_volts(raw),
        })
    }
}

/// Open the ADS1115 soil moisture probe on `i2c_bus`.
#[cfg(feature = "hardware")]
pub fn open(i2c_bus: u8, config: &SoilConfig) -> Result<Box<dyn MoistureSensor + Send>> {
    use crate::sensors::bus::{open_i2c, Delay};

    let i2c = open_i2c(i2c_bus)?;
    Ok(Box::new(SoilMoistureProbe::from_config(i2c, config, Delay)))
}

/// Open the ADS1115 soil moisture probe on `i2c_bus`.
#[cfg(not(feature = "hardware"))]
pub fn open(i2c_bus: u8, config: &SoilConfig) -> Result<Box<dyn MoistureSensor + Send>> {
    tracing::debug!("ADS1115 requested at {:#04x}", config.address);
    Err(crate::sensors::bus::unavailable("ADS1115", i2c_bus))
}
