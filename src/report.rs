//! Fixed-width console rendering of a snapshot.

use crate::sensors::data::{SensorKind, SensorSnapshot};
use crate::units::{hpa_to_inhg, TemperatureUnit};
use chrono::{DateTime, Local};
use std::fmt;

/// Width of the label column, before the `: ` separator.
pub const LABEL_WIDTH: usize = 16;

/// Console report for one snapshot.
pub struct Report<'a> {
    snapshot: &'a SensorSnapshot,
    unit: TemperatureUnit,
    timestamp: bool,
}

impl<'a> Report<'a> {
    pub fn new(snapshot: &'a SensorSnapshot, unit: TemperatureUnit) -> Self {
        Self {
            snapshot,
            unit,
            timestamp: true,
        }
    }

    /// Omit the timestamp header line.
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = false;
        self
    }

    fn label(f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
        write!(f, "{:<width$}: ", label, width = LABEL_WIDTH)
    }

    fn temperature(&self, celsius: f32) -> String {
        format!("{:.1} {}", self.unit.convert(celsius), self.unit)
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;

        if self.timestamp {
            let taken = DateTime::from_timestamp_millis(snapshot.timestamp as i64)
                .unwrap_or_default()
                .with_timezone(&Local);
            writeln!(f, "---- {} ----", taken.format("%Y-%m-%d %H:%M:%S"))?;
        }

        if let Some(probes) = &snapshot.probes {
            let probe_faults = snapshot
                .faults
                .iter()
                .filter(|fault| fault.sensor == SensorKind::OneWire)
                .count();
            if probes.is_empty() && probe_faults == 0 {
                Self::label(f, SensorKind::OneWire.label())?;
                writeln!(f, "none found")?;
            }
            for probe in probes {
                Self::label(f, &format!("Probe {}", probe.position))?;
                writeln!(f, "{} [{}]", self.temperature(probe.celsius), probe.device_id)?;
            }
        }

        if let Some(air) = &snapshot.air {
            Self::label(f, SensorKind::Dht.label())?;
            writeln!(
                f,
                "{} Humidity: {:.1} %",
                self.temperature(air.celsius),
                air.humidity_percent
            )?;
        }

        if let Some(climate) = &snapshot.climate {
            Self::label(f, "BME280 Temp")?;
            writeln!(
                f,
                "{} Humidity: {:.1} % Pressure: {:.2} inHg",
                self.temperature(climate.celsius),
                climate.humidity_percent,
                hpa_to_inhg(climate.pressure_hpa)
            )?;
        }

        if let Some(moisture) = &snapshot.moisture {
            Self::label(f, SensorKind::Ads1115.label())?;
            writeln!(
                f,
                "{} counts ({:.3} V) A{}",
                moisture.raw, moisture.volts, moisture.channel
            )?;
        }

        for fault in &snapshot.faults {
            Self::label(f, fault.sensor.label())?;
            match &fault.device {
                Some(device) => writeln!(f, "ERROR {}: {}", device, fault.message)?,
                None => writeln!(f, "ERROR {}", fault.message)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::data::*;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            timestamp: 1_700_000_000_000,
            probes: Some(vec![ProbeReading {
                device_id: "28-0316a2795aff".to_string(),
                position: 1,
                celsius: 22.5,
            }]),
            air: Some(AirReading {
                celsius: 22.0,
                humidity_percent: 45.0,
            }),
            climate: Some(ClimateReading {
                celsius: 25.08,
                humidity_percent: 55.0,
                pressure_hpa: 1013.25,
            }),
            moisture: Some(MoistureReading {
                channel: 0,
                raw: 15234,
                volts: 1.904,
            }),
            faults: Vec::new(),
        }
    }

    #[test]
    fn test_fahrenheit_layout() {
        let snapshot = snapshot();
        let text = Report::new(&snapshot, TemperatureUnit::Fahrenheit)
            .without_timestamp()
            .to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Probe 1         : 72.5 F [28-0316a2795aff]",
                "Air Temp        : 71.6 F Humidity: 45.0 %",
                "BME280 Temp     : 77.1 F Humidity: 55.0 % Pressure: 29.92 inHg",
                "Soil Moisture   : 15234 counts (1.904 V) A0",
            ]
        );
    }

    #[test]
    fn test_celsius_layout() {
        let snapshot = snapshot();
        let text = Report::new(&snapshot, TemperatureUnit::Celsius)
            .without_timestamp()
            .to_string();
        assert!(text.contains("Air Temp        : 22.0 C Humidity: 45.0 %"));
    }

    #[test]
    fn test_header_present_by_default() {
        let snapshot = snapshot();
        let text = Report::new(&snapshot, TemperatureUnit::Fahrenheit).to_string();
        assert!(text.starts_with("---- "));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_faults_and_empty_bus() {
        let snapshot = SensorSnapshot {
            timestamp: 0,
            probes: Some(Vec::new()),
            faults: vec![SensorFault::new(SensorKind::Dht, "Timed out: edge")],
            ..Default::default()
        };
        let text = Report::new(&snapshot, TemperatureUnit::Fahrenheit)
            .without_timestamp()
            .to_string();
        assert_eq!(
            text,
            "Probes          : none found\nAir Temp        : ERROR Timed out: edge\n"
        );
    }

    #[test]
    fn test_probe_fault_names_device() {
        let snapshot = SensorSnapshot {
            probes: Some(Vec::new()),
            faults: vec![SensorFault::for_device(
                SensorKind::OneWire,
                "28-00000bad",
                "Sensor not ready: crc",
            )],
            ..Default::default()
        };
        let text = Report::new(&snapshot, TemperatureUnit::Fahrenheit)
            .without_timestamp()
            .to_string();
        assert_eq!(text, "Probes          : ERROR 28-00000bad: Sensor not ready: crc\n");
    }

    #[test]
    fn test_numbering_skips_failed_device() {
        let snapshot = SensorSnapshot {
            probes: Some(vec![ProbeReading {
                device_id: "28-0000000000b2".to_string(),
                position: 2,
                celsius: 20.0,
            }]),
            faults: vec![SensorFault::for_device(
                SensorKind::OneWire,
                "28-0000000000a1",
                "Sensor not ready: crc",
            )],
            ..Default::default()
        };
        let text = Report::new(&snapshot, TemperatureUnit::Celsius)
            .without_timestamp()
            .to_string();
        assert_eq!(
            text,
            "Probe 2         : 20.0 C [28-0000000000b2]\nProbes          : ERROR 28-0000000000a1: Sensor not ready: crc\n"
        );
    }

    #[test]
    fn test_disabled_sensors_omitted() {
        let snapshot = SensorSnapshot::default();
        let text = Report::new(&snapshot, TemperatureUnit::Fahrenheit)
            .without_timestamp()
            .to_string();
        assert!(text.is_empty());
    }
}
