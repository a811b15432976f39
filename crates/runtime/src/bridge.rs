//! Serial bridge reader: owns the microcontroller link lifecycle and
//! turns inbound telemetry lines into snapshot updates.
//!
//! The reconnect machine retries indefinitely until the stop flag is
//! set; I/O errors invalidate the link and never escape the task.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::protocol::{classify_serial_line, SerialEvent};
use common::SharedState;
use hardware::SharedLink;

/// Delay between failed open attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Idle poll interval while connected with no pending data.
const IDLE_POLL: Duration = Duration::from_millis(1);

pub fn run_bridge(link: SharedLink, state: Arc<SharedState>) {
    while !state.stop_requested() {
        {
            let mut guard = link.lock();
            if !guard.is_open() {
                match guard.open() {
                    Ok(()) => {
                        log::info!("bridge: serial link up on {}", guard.device());
                        continue;
                    }
                    Err(err) => {
                        log::warn!("bridge: open failed: {err}");
                        drop(guard);
                        thread::sleep(RECONNECT_DELAY);
                        continue;
                    }
                }
            }

            match guard.poll_line() {
                Ok(Some(line)) => {
                    drop(guard);
                    dispatch_line(&line, &state);
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    // Link already invalidated; next iteration reopens.
                    log::warn!("bridge: read failed: {err}");
                    continue;
                }
            }
        }
        thread::sleep(IDLE_POLL);
    }
    log::info!("bridge: stopped");
}

fn dispatch_line(line: &str, state: &SharedState) {
    match classify_serial_line(line) {
        Ok(SerialEvent::Snapshot(snapshot)) => state.store_snapshot(snapshot),
        Ok(SerialEvent::CalibrationDone) => {
            log::info!("bridge: microcontroller calibration complete");
        }
        Ok(SerialEvent::Ignored) => {}
        Err(err) => log::warn!("bridge: dropping line: {err}"),
    }
}
