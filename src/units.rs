//! Unit conversions for displayed readings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inches of mercury per hectopascal.
pub const INHG_PER_HPA: f32 = 0.029_529_983;

/// Convert degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert hectopascals to inches of mercury.
pub fn hpa_to_inhg(hpa: f32) -> f32 {
    hpa * INHG_PER_HPA
}

/// Convert pascals to hectopascals.
pub fn pascals_to_hpa(pascals: f32) -> f32 {
    pascals / 100.0
}

/// Unit used when printing temperatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    /// Express a Celsius reading in this unit.
    pub fn convert(self, celsius: f32) -> f32 {
        match self {
            Self::Fahrenheit => celsius_to_fahrenheit(celsius),
            Self::Celsius => celsius,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Fahrenheit => "F",
            Self::Celsius => "C",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            "c" | "celsius" => Ok(Self::Celsius),
            other => Err(format!("unknown temperature unit '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!(close(celsius_to_fahrenheit(0.0), 32.0));
        assert!(close(celsius_to_fahrenheit(100.0), 212.0));
        assert!(close(celsius_to_fahrenheit(-40.0), -40.0));
        assert!(close(celsius_to_fahrenheit(22.5), 72.5));
    }

    #[test]
    fn test_hpa_to_inhg() {
        assert!(close(hpa_to_inhg(1013.25), 29.92));
        assert!(close(hpa_to_inhg(0.0), 0.0));
        assert!(close(hpa_to_inhg(pascals_to_hpa(100_653.27)), 29.72));
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("F".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert_eq!("celsius".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }

    #[test]
    fn test_unit_convert() {
        assert!(close(TemperatureUnit::Celsius.convert(21.0), 21.0));
        assert!(close(TemperatureUnit::Fahrenheit.convert(21.0), 69.8));
        assert_eq!(TemperatureUnit::default().suffix(), "F");
    }
}
