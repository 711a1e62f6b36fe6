//! Sensor polling: one snapshot per tick across every enabled sensor.

use crate::config::SensorConfig;
use crate::error::Result;
use crate::sensors::data::{SensorFault, SensorKind, SensorSnapshot};
use crate::sensors::{ads1115, bme280, dht};
use crate::sensors::onewire::{self, OneWireBus};
use crate::sensors::traits::{AirSensor, ClimateSensor, MoistureSensor};
use futures_util::stream::{self, BoxStream};
use std::time::Duration;
use tokio::task;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Reads every configured sensor in turn.
#[derive(Default)]
pub struct SensorCollector {
    onewire: Option<OneWireBus>,
    air: Option<Box<dyn AirSensor + Send>>,
    climate: Option<Box<dyn ClimateSensor + Send>>,
    moisture: Option<Box<dyn MoistureSensor + Send>>,
}

impl SensorCollector {
    /// A collector with no sensors attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every sensor enabled in `config`.
    ///
    /// A sensor that fails to open is logged and left out; only an invalid
    /// configuration is an error.
    pub fn from_config(config: &SensorConfig) -> Result<Self> {
        config.validate()?;
        let mut collector = Self::new();

        if config.onewire.enabled {
            if config.onewire.load_modules {
                onewire::load_kernel_modules();
            }
            collector.onewire = Some(OneWireBus::from_config(&config.onewire));
            info!("One-wire probes enabled under {}", config.onewire.base_dir.display());
        }

        if config.dht.enabled {
            match dht::open(&config.dht) {
                Ok(sensor) => {
                    info!("{:?} enabled on GPIO {}", config.dht.model, config.dht.pin);
                    collector.air = Some(sensor);
                }
                Err(err) => warn!("Failed to open DHT sensor, continuing without it: {}", err),
            }
        }

        if config.bme280.enabled {
            match bme280::open(config.i2c_bus, &config.bme280) {
                Ok(sensor) => {
                    info!("BME280 enabled at {:#04x}", config.bme280.address);
                    collector.climate = Some(sensor);
                }
                Err(err) => warn!("Failed to open BME280, continuing without it: {}", err),
            }
        }

        if config.soil.enabled {
            match ads1115::open(config.i2c_bus, &config.soil) {
                Ok(sensor) => {
                    info!(
                        "ADS1115 enabled at {:#04x}, channel {}",
                        config.soil.address, config.soil.channel
                    );
                    collector.moisture = Some(sensor);
                }
                Err(err) => warn!("Failed to open ADS1115, continuing without it: {}", err),
            }
        }

        Ok(collector)
    }

    pub fn with_onewire(mut self, bus: OneWireBus) -> Self {
        self.onewire = Some(bus);
        self
    }

    pub fn with_air_sensor(mut self, sensor: impl AirSensor + Send + 'static) -> Self {
        self.air = Some(Box::new(sensor));
        self
    }

    pub fn with_climate_sensor(mut self, sensor: impl ClimateSensor + Send + 'static) -> Self {
        self.climate = Some(Box::new(sensor));
        self
    }

    pub fn with_moisture_sensor(mut self, sensor: impl MoistureSensor + Send + 'static) -> Self {
        self.moisture = Some(Box::new(sensor));
        self
    }

    pub fn onewire(&self) -> Option<&OneWireBus> {
        self.onewire.as_ref()
    }

    /// Number of sensor groups attached.
    pub fn sensor_count(&self) -> usize {
        [
            self.onewire.is_some(),
            self.air.is_some(),
            self.climate.is_some(),
            self.moisture.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Read every attached sensor once. Blocks for the duration of the reads.
    pub fn collect_snapshot(&mut self) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::new();

        if let Some(bus) = &self.onewire {
            let mut probes = Vec::new();
            match bus.read_all() {
                Ok(results) => {
                    for (device, result) in results {
                        match result {
                            Ok(reading) => probes.push(reading),
                            Err(err) => {
                                warn!("Failed to read probe {}: {}", device.id, err);
                                snapshot.faults.push(SensorFault::for_device(
                                    SensorKind::OneWire,
                                    device.id,
                                    err.to_string(),
                                ));
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!("Failed to list one-wire devices: {}", err);
                    snapshot.faults.push(SensorFault::new(SensorKind::OneWire, err.to_string()));
                }
            }
            snapshot.probes = Some(probes);
        }

        if let Some(sensor) = self.air.as_mut() {
            match sensor.read_air() {
                Ok(reading) => snapshot.air = Some(reading),
                Err(err) => {
                    warn!("Failed to read DHT sensor: {}", err);
                    snapshot.faults.push(SensorFault::new(SensorKind::Dht, err.to_string()));
                }
            }
        }

        if let Some(sensor) = self.climate.as_mut() {
            match sensor.read_climate() {
                Ok(reading) => snapshot.climate = Some(reading),
                Err(err) => {
                    warn!("Failed to read BME280: {}", err);
                    snapshot.faults.push(SensorFault::new(SensorKind::Bme280, err.to_string()));
                }
            }
        }

        if let Some(sensor) = self.moisture.as_mut() {
            match sensor.read_moisture() {
                Ok(reading) => snapshot.moisture = Some(reading),
                Err(err) => {
                    warn!("Failed to read ADS1115: {}", err);
                    snapshot.faults.push(SensorFault::new(SensorKind::Ads1115, err.to_string()));
                }
            }
        }

        debug!("Collected snapshot with {} fault(s)", snapshot.faults.len());
        snapshot
    }

    /// Poll on a fixed interval, yielding one snapshot per tick.
    ///
    /// The first snapshot is taken immediately. Reads run on the blocking
    /// pool; a slow poll delays the following ticks instead of bunching
    /// them up.
    pub fn into_stream(self, interval_ms: u64) -> BoxStream<'static, SensorSnapshot> {
        let period = Duration::from_millis(interval_ms.max(1));

        let stream = stream::unfold(
            (self, None::<Interval>),
            move |(mut collector, ticker)| async move {
                let mut ticker = ticker.unwrap_or_else(|| {
                    let mut ticker = time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker
                });
                ticker.tick().await;

                let polled = task::spawn_blocking(move || {
                    let snapshot = collector.collect_snapshot();
                    (collector, snapshot)
                })
                .await;

                match polled {
                    Ok((collector, snapshot)) => Some((snapshot, (collector, Some(ticker)))),
                    Err(err) => {
                        tracing::error!("Sensor poll task failed: {}", err);
                        None
                    }
                }
            },
        );

        Box::pin(stream)
    }
}
