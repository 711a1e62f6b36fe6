//! DHT11 / DHT22 humidity and temperature sensors.
//!
//! The sensor answers a host start pulse with 40 bits. Each bit is a ~50µs
//! low followed by a high whose length carries the value: ~27µs for 0 and
//! ~70µs for 1. The fifth byte is a checksum over the first four.
//!
//! Decoding is pure and always compiled. The bit-banged line reader needs
//! rppal and is gated on the `hardware` feature.

use crate::config::DhtConfig;
use crate::error::{Result, SensorError};
use crate::sensors::data::AirReading;
use crate::sensors::traits::AirSensor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// High pulses longer than this are 1 bits.
pub const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(50);

pub const FRAME_BITS: usize = 40;

/// A raw 5-byte frame.
pub type Frame = [u8; 5];

/// Supported DHT variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhtModel {
    Dht11,
    Dht22,
}

impl DhtModel {
    /// How long the host holds the line low to request a frame.
    pub fn start_signal(self) -> Duration {
        match self {
            Self::Dht11 => Duration::from_millis(18),
            Self::Dht22 => Duration::from_millis(1),
        }
    }
}

impl FromStr for DhtModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dht11" | "11" => Ok(Self::Dht11),
            "dht22" | "22" | "am2302" => Ok(Self::Dht22),
            other => Err(format!("unknown DHT model '{}'", other)),
        }
    }
}

/// Turn 40 high-pulse widths into frame bytes, MSB first.
pub fn decode_pulses(high_times: &[Duration; FRAME_BITS]) -> Frame {
    let mut frame = [0u8; 5];
    for (index, width) in high_times.iter().enumerate() {
        if *width > ONE_BIT_THRESHOLD {
            frame[index / 8] |= 0x80 >> (index % 8);
        }
    }
    frame
}

/// Verify the checksum and decode a frame.
pub fn parse_frame(model: DhtModel, frame: &Frame) -> Result<AirReading> {
    let expected = frame[..4].iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(SensorError::Checksum {
            expected,
            actual: frame[4],
        });
    }

    let (humidity_percent, celsius) = match model {
        DhtModel::Dht11 => {
            let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
            let magnitude = frame[2] as f32 + (frame[3] & 0x7f) as f32 / 10.0;
            let celsius = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, celsius)
        }
        DhtModel::Dht22 => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
            let magnitude = u16::from_be_bytes([frame[2] & 0x7f, frame[3]]) as f32 / 10.0;
            let celsius = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, celsius)
        }
    };

    if humidity_percent > 100.0 {
        return Err(SensorError::parse_error(format!(
            "Humidity {:.1}% out of range",
            humidity_percent
        )));
    }

    Ok(AirReading {
        celsius,
        humidity_percent,
    })
}

/// Something that can clock a raw frame out of a DHT sensor.
pub trait FrameSource {
    fn read_frame(&mut self, model: DhtModel) -> Result<Frame>;
}

/// DHT sensor with read-and-retry semantics.
pub struct Dht<S> {
    source: S,
    model: DhtModel,
    attempts: u32,
    retry_delay: Duration,
}

impl<S: FrameSource> Dht<S> {
    pub fn new(source: S, model: DhtModel) -> Self {
        Self {
            source,
            model,
            attempts: 15,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Set attempt count and spacing. DHT parts need about 2s between reads.
    pub fn with_retry(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn model(&self) -> DhtModel {
        self.model
    }

    fn read_once(&mut self) -> Result<AirReading> {
        let frame = self.source.read_frame(self.model)?;
        parse_frame(self.model, &frame)
    }
}

impl<S: FrameSource> AirSensor for Dht<S> {
    fn read_air(&mut self) -> Result<AirReading> {
        let mut attempt = 1;
        loop {
            match self.read_once() {
                Ok(reading) => return Ok(reading),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    debug!("DHT read attempt {} failed: {}", attempt, err);
                    attempt += 1;
                    thread::sleep(self.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(feature = "hardware")]
mod raspberry_pi {
    use super::*;
    use rppal::gpio::{Gpio, IoPin, Level, Mode, PullUpDown};
    use std::time::Instant;

    /// No single phase of the protocol lasts longer than this.
    const EDGE_TIMEOUT: Duration = Duration::from_micros(200);

    /// Bit-banged DHT data line on a BCM GPIO pin.
    pub struct GpioFrameSource {
        pin: IoPin,
        number: u8,
    }

    impl GpioFrameSource {
        pub fn new(number: u8) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                SensorError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;
            let mut pin = gpio
                .get(number)
                .map_err(|e| SensorError::gpio_error(format!("Failed to access pin {}: {}", number, e)))?
                .into_io(Mode::Input);
            pin.set_pullupdown(PullUpDown::PullUp);
            Ok(Self { pin, number })
        }

        fn wait_for(&self, level: Level, phase: &str) -> Result<Duration> {
            let start = Instant::now();
            while self.pin.read() != level {
                if start.elapsed() > EDGE_TIMEOUT {
                    return Err(SensorError::timeout(format!(
                        "DHT on pin {} stalled waiting for {}",
                        self.number, phase
                    )));
                }
            }
            Ok(start.elapsed())
        }
    }

    impl FrameSource for GpioFrameSource {
        fn read_frame(&mut self, model: DhtModel) -> Result<Frame> {
            self.pin.set_mode(Mode::Output);
            self.pin.set_low();
            thread::sleep(model.start_signal());
            self.pin.set_high();
            self.pin.set_mode(Mode::Input);

            // Response: sensor pulls low ~80µs, then high ~80µs
            self.wait_for(Level::Low, "response")?;
            self.wait_for(Level::High, "response end")?;
            self.wait_for(Level::Low, "first bit")?;

            let mut high_times = [Duration::ZERO; FRAME_BITS];
            for width in high_times.iter_mut() {
                self.wait_for(Level::High, "bit start")?;
                *width = self.wait_for(Level::Low, "bit end")?;
            }

            Ok(decode_pulses(&high_times))
        }
    }
}

#[cfg(feature = "hardware")]
pub use raspberry_pi::GpioFrameSource;

/// Open the DHT sensor described by `config`.
#[cfg(feature = "hardware")]
pub fn open(config: &DhtConfig) -> Result<Box<dyn AirSensor + Send>> {
    let source = GpioFrameSource::new(config.pin)?;
    Ok(Box::new(
        Dht::new(source, config.model)
            .with_retry(config.attempts, Duration::from_millis(config.retry_delay_ms)),
    ))
}

/// Open the DHT sensor described by `config`.
#[cfg(not(feature = "hardware"))]
pub fn open(config: &DhtConfig) -> Result<Box<dyn AirSensor + Send>> {
    Err(SensorError::unavailable(format!(
        "DHT on GPIO {} requires the `hardware` feature",
        config.pin
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<Frame>>);

    impl FrameSource for Scripted {
        fn read_frame(&mut self, _model: DhtModel) -> Result<Frame> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(SensorError::timeout("script exhausted")))
        }
    }

    fn pulses_for(frame: Frame) -> [Duration; FRAME_BITS] {
        let mut pulses = [Duration::from_micros(26); FRAME_BITS];
        for (index, pulse) in pulses.iter_mut().enumerate() {
            if frame[index / 8] & (0x80 >> (index % 8)) != 0 {
                *pulse = Duration::from_micros(70);
            }
        }
        pulses
    }

    #[test]
    fn test_decode_pulses() {
        let frame = [0x2d, 0x00, 0x16, 0x05, 0x48];
        assert_eq!(decode_pulses(&pulses_for(frame)), frame);
    }

    #[test]
    fn test_parse_dht11() {
        let reading = parse_frame(DhtModel::Dht11, &[45, 0, 22, 5, 72]).unwrap();
        assert_eq!(reading.humidity_percent, 45.0);
        assert!((reading.celsius - 22.5).abs() < 0.01);
    }

    #[test]
    fn test_parse_dht11_negative() {
        let reading = parse_frame(DhtModel::Dht11, &[30, 0, 3, 0x82, 0xa3]).unwrap();
        assert!((reading.celsius + 3.2).abs() < 0.01);
    }

    #[test]
    fn test_parse_dht22() {
        // 65.2 %RH, -10.1 C
        let frame = [0x02, 0x8c, 0x80, 0x65, 0x73];
        let reading = parse_frame(DhtModel::Dht22, &frame).unwrap();
        assert!((reading.humidity_percent - 65.2).abs() < 0.01);
        assert!((reading.celsius + 10.1).abs() < 0.01);
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = parse_frame(DhtModel::Dht11, &[45, 0, 22, 5, 0]).unwrap_err();
        assert!(matches!(err, SensorError::Checksum { expected: 72, actual: 0 }));
    }

    #[test]
    fn test_humidity_out_of_range() {
        assert!(parse_frame(DhtModel::Dht11, &[120, 0, 20, 0, 140]).is_err());
    }

    #[test]
    fn test_retry_until_valid() {
        let script = Scripted(VecDeque::from(vec![
            Err(SensorError::timeout("edge")),
            Ok([45, 0, 22, 5, 0]),
            Ok([45, 0, 22, 5, 72]),
        ]));
        let mut dht = Dht::new(script, DhtModel::Dht11).with_retry(5, Duration::ZERO);
        let reading = dht.read_air().unwrap();
        assert_eq!(reading.humidity_percent, 45.0);
    }

    #[test]
    fn test_retry_gives_up() {
        let script = Scripted(VecDeque::new());
        let mut dht = Dht::new(script, DhtModel::Dht11).with_retry(3, Duration::ZERO);
        assert!(matches!(dht.read_air(), Err(SensorError::Timeout(_))));
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let script = Scripted(VecDeque::from(vec![
            Err(SensorError::gpio_error("pin busy")),
            Ok([45, 0, 22, 5, 72]),
        ]));
        let mut dht = Dht::new(script, DhtModel::Dht11).with_retry(5, Duration::ZERO);
        assert!(matches!(dht.read_air(), Err(SensorError::Gpio(_))));
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!("DHT22".parse::<DhtModel>(), Ok(DhtModel::Dht22));
        assert_eq!("11".parse::<DhtModel>(), Ok(DhtModel::Dht11));
        assert!("dht99".parse::<DhtModel>().is_err());
    }
}
