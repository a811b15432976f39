//! TCP gateway: demultiplexes inbound frames from the single control
//! client by their 1-byte type tag.
//!
//! Command frames split into a 12-bit prefix for the microcontroller
//! and a 4-bit suffix for the local solenoids; actuation frames update
//! the shared actuator array. Malformed frames are dropped; socket
//! failures are fatal and stop the controller.

use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use common::error::{ControllerError, Result};
use common::protocol::{
    decode_actuation, ValveMask, ACTUATION_VALUE_LEN, FRAME_ACTUATION, FRAME_COMMAND, MASK_LEN,
};
use common::SharedState;
use hardware::{MaskPort, SolenoidBank};

/// Bounded read so the stop flag is observed promptly.
pub const CONTROL_READ_TIMEOUT: Duration = Duration::from_millis(500);

pub fn run_gateway(
    mut stream: TcpStream,
    state: Arc<SharedState>,
    mut solenoids: Box<dyn SolenoidBank>,
    link: Arc<dyn MaskPort>,
) {
    if let Err(err) = stream.set_read_timeout(Some(CONTROL_READ_TIMEOUT)) {
        log::error!("gateway: cannot set socket timeout: {err}");
        state.request_stop();
        return;
    }

    let actuation_len = state.actuators().len() * ACTUATION_VALUE_LEN;
    let mut tag = [0u8; 1];

    while !state.stop_requested() {
        match stream.read_exact(&mut tag) {
            Ok(()) => {}
            Err(err) if is_timeout(&err) => continue,
            Err(err) => {
                log::error!("gateway: control socket failed: {err}");
                state.request_stop();
                break;
            }
        }

        let outcome = match tag[0] {
            FRAME_COMMAND => read_command(&mut stream, &mut *solenoids, link.as_ref()),
            FRAME_ACTUATION => read_actuation(&mut stream, &state, actuation_len),
            other => {
                log::debug!("gateway: unknown frame tag {other:#04x}, skipping");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                log::error!("gateway: {err}");
                state.request_stop();
                break;
            }
            Err(err) => log::warn!("gateway: dropping frame: {err}"),
        }
    }
    // Dropping the stream closes the control socket.
}

fn read_command(
    stream: &mut TcpStream,
    solenoids: &mut dyn SolenoidBank,
    link: &dyn MaskPort,
) -> Result<()> {
    let mut raw = [0u8; MASK_LEN];
    read_payload(stream, &mut raw)?;
    handle_command(&raw, solenoids, link)
}

fn read_actuation(
    stream: &mut TcpStream,
    state: &SharedState,
    payload_len: usize,
) -> Result<()> {
    let mut payload = vec![0u8; payload_len];
    read_payload(stream, &mut payload)?;
    handle_actuation(&payload, state)
}

/// Validates the mask, forwards the prefix (fail-soft when the serial
/// link is down) and drives the solenoid pins from the suffix.
fn handle_command(
    raw: &[u8],
    solenoids: &mut dyn SolenoidBank,
    link: &dyn MaskPort,
) -> Result<()> {
    let mask = ValveMask::parse(raw)?;
    log::debug!("gateway: command mask {}", mask.as_str());
    link.send_mask(mask.serial_prefix());
    for (index, high) in mask.solenoid_levels().enumerate() {
        solenoids.set(index, high)?;
    }
    Ok(())
}

/// Stores raw client values element-wise; clamping happens at apply
/// time in the control loop.
fn handle_actuation(payload: &[u8], state: &SharedState) -> Result<()> {
    let values = decode_actuation(payload)?;
    for (index, value) in values.into_iter().enumerate() {
        state.actuators().set(index, value);
    }
    Ok(())
}

/// A timeout mid-frame loses that frame only; real socket errors and
/// EOF stay fatal.
fn read_payload(stream: &mut TcpStream, buf: &mut [u8]) -> Result<()> {
    stream.read_exact(buf).map_err(|err| {
        if is_timeout(&err) {
            ControllerError::Protocol(format!("truncated frame: {err}"))
        } else {
            ControllerError::Connection(err)
        }
    })
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
