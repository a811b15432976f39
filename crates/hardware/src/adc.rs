//! ADS1015 analog input carrying the onboard VEAB pressure sensor.

use rppal::i2c::I2c;

use crate::{HardwareError, ReferenceSensor};

pub const ADC_ADDR: u16 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// Continuous conversion on AIN0, gain 2 (+/-2.048 V), 490 SPS,
// comparator disabled.
const CONFIG_WORD: u16 = 0x4443;

const LSB_VOLTS: f64 = 2.048 / 2048.0;
// The sensor output is divided down onto the ADC input; undo that.
const SUPPLY_SCALE: f64 = 5.0;

pub struct VeabSensor {
    i2c: I2c,
    adjusted: f64,
}

impl VeabSensor {
    pub fn new(bus: u8) -> Result<Self, HardwareError> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(ADC_ADDR)?;
        i2c.write(&[
            REG_CONFIG,
            (CONFIG_WORD >> 8) as u8,
            (CONFIG_WORD & 0xFF) as u8,
        ])?;
        Ok(Self { i2c, adjusted: 0.0 })
    }
}

impl ReferenceSensor for VeabSensor {
    fn read(&mut self) -> Result<f64, HardwareError> {
        let mut raw = [0u8; 2];
        self.i2c.write_read(&[REG_CONVERSION], &mut raw)?;
        // 12-bit result, left-aligned in the 16-bit register.
        let code = (i16::from_be_bytes(raw)) >> 4;
        Ok(f64::from(code) * LSB_VOLTS * SUPPLY_SCALE)
    }

    fn set_adjusted(&mut self, value: f64) {
        self.adjusted = value;
    }

    fn adjusted(&self) -> f64 {
        self.adjusted
    }
}
