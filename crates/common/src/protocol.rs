//! Wire protocol shared by the TCP gateway and the serial bridge.
//!
//! Inbound TCP frames carry a 1-byte type tag: `C` for a valve-mask
//! command, `W` for a block of little-endian actuator doubles. Inbound
//! serial lines are either a calibration status string or ten
//! comma-separated numeric fields.

use std::fmt::Write as _;

use crate::error::{ControllerError, Result};
use crate::{SensorSnapshot, MPR_CHANNELS};

/// Frame tag for a valve-mask command.
pub const FRAME_COMMAND: u8 = b'C';
/// Frame tag for an actuation-value block.
pub const FRAME_ACTUATION: u8 = b'W';

/// Total bits in a valve mask.
pub const MASK_LEN: usize = 16;
/// Leading bits forwarded to the microcontroller.
pub const SERIAL_PREFIX_LEN: usize = 12;
/// Trailing bits mapped to the local solenoid pins.
pub const SOLENOID_COUNT: usize = MASK_LEN - SERIAL_PREFIX_LEN;

/// Bytes per actuator value in a `W` frame.
pub const ACTUATION_VALUE_LEN: usize = 8;

/// Status string the microcontroller emits once its startup calibration
/// finishes.
pub const CALIBRATION_DONE: &str = "Calibration complete";

const TELEMETRY_FIELDS: usize = 2 + MPR_CHANNELS;

/// A validated 16-bit valve mask: every character is `0` or `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValveMask {
    bits: String,
}

impl ValveMask {
    /// Validates a raw 16-byte mask. Rejection has no side effects; the
    /// gateway drops the frame and keeps going.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() != MASK_LEN {
            return Err(ControllerError::Protocol(format!(
                "valve mask must be {MASK_LEN} bytes, got {}",
                raw.len()
            )));
        }
        if !raw.iter().all(|&b| b == b'0' || b == b'1') {
            return Err(ControllerError::Protocol(format!(
                "valve mask must be binary digits: {:?}",
                String::from_utf8_lossy(raw)
            )));
        }
        // All bytes verified ASCII above.
        let bits = String::from_utf8_lossy(raw).into_owned();
        Ok(Self { bits })
    }

    /// First 12 bits, sent to the microcontroller as an ASCII line.
    pub fn serial_prefix(&self) -> &str {
        &self.bits[..SERIAL_PREFIX_LEN]
    }

    /// Last 4 bits, mapped positionally onto the solenoid pins.
    pub fn solenoid_suffix(&self) -> &str {
        &self.bits[SERIAL_PREFIX_LEN..]
    }

    /// Pin levels for the solenoid suffix, in pin order.
    pub fn solenoid_levels(&self) -> impl Iterator<Item = bool> + '_ {
        self.solenoid_suffix().bytes().map(|b| b == b'1')
    }

    pub fn as_str(&self) -> &str {
        &self.bits
    }
}

/// Decodes a `W` frame payload into one f64 per actuator.
pub fn decode_actuation(payload: &[u8]) -> Result<Vec<f64>> {
    if payload.is_empty() || payload.len() % ACTUATION_VALUE_LEN != 0 {
        return Err(ControllerError::Protocol(format!(
            "actuation payload must be a multiple of {ACTUATION_VALUE_LEN} bytes, got {}",
            payload.len()
        )));
    }
    let mut values = Vec::with_capacity(payload.len() / ACTUATION_VALUE_LEN);
    for chunk in payload.chunks_exact(ACTUATION_VALUE_LEN) {
        let mut raw = [0u8; ACTUATION_VALUE_LEN];
        raw.copy_from_slice(chunk);
        values.push(f64::from_le_bytes(raw));
    }
    Ok(values)
}

/// Classification of one inbound serial line.
#[derive(Debug, Clone, PartialEq)]
pub enum SerialEvent {
    /// The microcontroller finished its startup calibration.
    CalibrationDone,
    /// A full telemetry record.
    Snapshot(SensorSnapshot),
    /// Anything else; dropped silently.
    Ignored,
}

/// Classifies a serial line from the microcontroller.
///
/// Only lines with exactly nine commas are treated as telemetry; a
/// field that fails to parse yields a `Parse` error so the caller can
/// drop the line and keep the prior snapshot.
pub fn classify_serial_line(line: &str) -> Result<SerialEvent> {
    let line = line.trim();
    if line.contains(CALIBRATION_DONE) {
        return Ok(SerialEvent::CalibrationDone);
    }
    if line.bytes().filter(|&b| b == b',').count() != TELEMETRY_FIELDS - 1 {
        return Ok(SerialEvent::Ignored);
    }

    let mut fields = [0.0f64; TELEMETRY_FIELDS];
    for (slot, raw) in fields.iter_mut().zip(line.split(',')) {
        *slot = raw.trim().parse().map_err(|_| {
            ControllerError::Parse(format!("bad numeric field {raw:?} in line {line:?}"))
        })?;
    }

    let mut remote_readings = [0.0f64; MPR_CHANNELS];
    remote_readings.copy_from_slice(&fields[2..]);
    Ok(SerialEvent::Snapshot(SensorSnapshot {
        // The microcontroller reports milliseconds.
        timestamp: fields[0] * 1e-3,
        local_reading: fields[1],
        remote_readings,
    }))
}

/// Formats one outbound telemetry line, without the trailing newline.
pub fn format_telemetry(elapsed_secs: f64, snapshot: &SensorSnapshot) -> String {
    let mut line = format!(
        "Time: {elapsed_secs:.3}s, VEAB: {:.2}",
        snapshot.local_reading
    );
    for (channel, value) in snapshot.remote_readings.iter().enumerate() {
        let _ = write!(line, ", MPR{}: {value:.2}", channel + 1);
    }
    line
}
