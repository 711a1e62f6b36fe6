//! Error handling for the Growtacular sensor console.

/// A specialized `Result` type for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// The main error type for sensor operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sensor output could not be parsed
    #[error("Failed to parse sensor data: {0}")]
    Parse(String),

    /// Frame checksum did not match its payload
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// Device has no valid sample yet
    #[error("Sensor not ready: {0}")]
    NotReady(String),

    /// Device did not respond in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I2C transfer failed
    #[error("I2C error: {0}")]
    I2c(String),

    /// GPIO operation failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Sensor support is not compiled in or not present
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SensorError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new I2C error
    pub fn i2c_error(msg: impl Into<String>) -> Self {
        Self::I2c(msg.into())
    }

    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a later attempt at the same read may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Checksum { .. } | Self::NotReady(_) | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_message() {
        let err = SensorError::Checksum {
            expected: 0x2a,
            actual: 0x07,
        };
        assert_eq!(err.to_string(), "Checksum mismatch: expected 0x2a, got 0x07");
    }

    #[test]
    fn test_transient_classification() {
        assert!(SensorError::timeout("edge").is_transient());
        assert!(SensorError::not_ready("crc").is_transient());
        assert!(!SensorError::config_error("bad").is_transient());
        assert!(!SensorError::unavailable("no gpio").is_transient());
    }
}
