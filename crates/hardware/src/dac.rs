//! MCP4725 12-bit DAC, one per VEAB board.

use rppal::i2c::I2c;

use crate::{Actuator, HardwareError};

pub const DAC_ADDR: u16 = 0x60;

const FULL_SCALE: f64 = 4095.0;

pub struct Mcp4725Dac {
    i2c: I2c,
}

impl Mcp4725Dac {
    pub fn new(bus: u8) -> Result<Self, HardwareError> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(DAC_ADDR)?;
        Ok(Self { i2c })
    }
}

impl Actuator for Mcp4725Dac {
    fn apply(&mut self, normalized: f64) -> Result<(), HardwareError> {
        let code = (normalized.clamp(0.0, 1.0) * FULL_SCALE).round() as u16;
        // Fast-mode write: upper nibble of the 12-bit code first.
        self.i2c.write(&[(code >> 8) as u8 & 0x0F, (code & 0xFF) as u8])?;
        Ok(())
    }
}
