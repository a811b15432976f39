//! Hardware access for the controller board: DAC-driven actuators,
//! the local analog pressure sensor, the solenoid GPIO bank, and the
//! serial link to the microcontroller.
//!
//! Runtime tasks only see the seam traits below, so everything above
//! this crate is testable with mock devices.

use common::error::ControllerError;
use thiserror::Error;

pub mod adc;
pub mod dac;
pub mod gpio;
pub mod serial;

pub use adc::VeabSensor;
pub use dac::Mcp4725Dac;
pub use gpio::GpioSolenoids;
pub use serial::{SerialLink, SharedLink};

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("gpio: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("i2c: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("serial: {0}")]
    Serial(#[from] serialport::Error),

    #[error("serial I/O: {0}")]
    SerialIo(std::io::Error),

    #[error("serial link not open")]
    LinkDown,

    #[error("no such output channel: {0}")]
    BadChannel(usize),
}

impl From<HardwareError> for ControllerError {
    fn from(err: HardwareError) -> Self {
        match err {
            HardwareError::Serial(_) | HardwareError::SerialIo(_) | HardwareError::LinkDown => {
                ControllerError::Serial(err.to_string())
            }
            _ => ControllerError::Hardware(err.to_string()),
        }
    }
}

/// One physical actuator channel (a DAC output).
pub trait Actuator: Send {
    /// Drives the channel with a normalized value in [0.0, 1.0].
    fn apply(&mut self, normalized: f64) -> Result<(), HardwareError>;
}

/// The bank of digital solenoid outputs addressed by the valve-mask
/// suffix, in fixed pin order.
pub trait SolenoidBank: Send {
    fn set(&mut self, index: usize, high: bool) -> Result<(), HardwareError>;
}

/// The local analog sensing path, cross-calibrated against the
/// microcontroller-reported reference by the aggregator task.
pub trait ReferenceSensor: Send {
    /// Raw reading from the onboard analog channel.
    fn read(&mut self) -> Result<f64, HardwareError>;

    fn set_adjusted(&mut self, value: f64);

    fn adjusted(&self) -> f64;
}

/// Fail-soft outbound path for valve-mask prefixes. Implementations
/// must never block the gateway; when the link is down or busy the
/// mask is dropped.
pub trait MaskPort: Send + Sync {
    fn send_mask(&self, bits: &str);
}
