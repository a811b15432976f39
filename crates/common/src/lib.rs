use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod protocol;
pub mod state;

pub use config::ControllerConfig;
pub use error::{ControllerError, Result};
pub use state::SharedState;

/// Pressure channels reported by the microcontroller per telemetry line.
pub const MPR_CHANNELS: usize = 8;

/// Latest-value record produced by the serial bridge and consumed by the
/// telemetry sender. Always replaced wholesale so a reader never sees a
/// new timestamp paired with stale remote readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Microcontroller timestamp, converted to seconds.
    pub timestamp: f64,
    /// VEAB reading reported by the microcontroller.
    pub local_reading: f64,
    /// MPR1..MPR8 pressure readings, in channel order.
    pub remote_readings: [f64; MPR_CHANNELS],
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            local_reading: 0.0,
            remote_readings: [0.0; MPR_CHANNELS],
        }
    }
}
