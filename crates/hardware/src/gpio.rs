//! Solenoid outputs on fixed BCM pins, driven synchronously from the
//! gateway's command handling.

use rppal::gpio::{Gpio, OutputPin};

use crate::{HardwareError, SolenoidBank};

/// BCM pin numbers, in valve-mask suffix order.
pub const SOLENOID_PINS: [u8; 4] = [17, 27, 22, 23];

pub struct GpioSolenoids {
    pins: Vec<OutputPin>,
}

impl GpioSolenoids {
    /// Claims the four pins and drives them LOW.
    pub fn new() -> Result<Self, HardwareError> {
        let gpio = Gpio::new()?;
        let mut pins = Vec::with_capacity(SOLENOID_PINS.len());
        for &number in &SOLENOID_PINS {
            let mut pin = gpio.get(number)?.into_output();
            pin.set_low();
            pins.push(pin);
        }
        Ok(Self { pins })
    }
}

impl SolenoidBank for GpioSolenoids {
    fn set(&mut self, index: usize, high: bool) -> Result<(), HardwareError> {
        let pin = self
            .pins
            .get_mut(index)
            .ok_or(HardwareError::BadChannel(index))?;
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        log::debug!(
            "solenoid pin {} set {}",
            SOLENOID_PINS[index],
            if high { "HIGH" } else { "LOW" }
        );
        Ok(())
    }
}
