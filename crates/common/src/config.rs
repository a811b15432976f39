use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::error::{ControllerError, Result};

/// Construction-time configuration for the controller.
///
/// One VEAB board (DAC + analog sensor pair) is attached per I2C bus,
/// so the actuator count follows directly from `i2c_buses`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControllerConfig {
    pub i2c_buses: Vec<u8>,
    pub sensor_frequency_hz: f64,
    pub actuator_frequency_hz: f64,
    pub tcp_port: u16,
    pub serial_device: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            i2c_buses: vec![1],
            sensor_frequency_hz: 250.0,
            actuator_frequency_hz: 250.0,
            tcp_port: 8888,
            serial_device: "/dev/ttyACM0".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ControllerError::Config(format!("{path}: {e}")))?;
        let config: ControllerConfig = toml::from_str(&contents)
            .map_err(|e| ControllerError::Config(format!("{path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.i2c_buses.is_empty() {
            return Err(ControllerError::Config("no I2C buses configured".into()));
        }
        if self.sensor_frequency_hz <= 0.0 || self.actuator_frequency_hz <= 0.0 {
            return Err(ControllerError::Config("frequencies must be positive".into()));
        }
        Ok(())
    }

    pub fn actuator_count(&self) -> usize {
        self.i2c_buses.len()
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sensor_frequency_hz)
    }

    pub fn actuator_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.actuator_frequency_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hardware_wiring() {
        let config = ControllerConfig::default();
        assert_eq!(config.i2c_buses, vec![1]);
        assert_eq!(config.actuator_count(), 1);
        assert_eq!(config.tcp_port, 8888);
        assert_eq!(config.serial_device, "/dev/ttyACM0");
        assert_eq!(config.actuator_period(), Duration::from_secs_f64(1.0 / 250.0));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: ControllerConfig =
            toml::from_str("i2c_buses = [1, 3]\ntcp_port = 12345\n").unwrap();
        assert_eq!(config.actuator_count(), 2);
        assert_eq!(config.tcp_port, 12345);
        assert_eq!(config.sensor_frequency_hz, 250.0);
    }

    #[test]
    fn empty_bus_list_is_rejected() {
        let config = ControllerConfig {
            i2c_buses: vec![],
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
