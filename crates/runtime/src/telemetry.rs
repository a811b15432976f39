//! Telemetry sender: streams the latest sensor snapshot to the control
//! client as fixed-precision ASCII lines.
//!
//! Staleness between ticks is fine (last write wins, no queuing); a
//! write failure means the client is gone and stops the controller.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::protocol::format_telemetry;
use common::SharedState;

/// Bound on outbound writes so a wedged peer cannot hang the task.
pub const TELEMETRY_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_telemetry<W: Write>(mut client: W, state: Arc<SharedState>, period: Duration) {
    // Elapsed time is relative to the sender's own start.
    let started = Instant::now();
    let mut next_tick = Instant::now() + period;

    while !state.stop_requested() {
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        }
        next_tick += period;
        if next_tick < Instant::now() {
            next_tick = Instant::now() + period;
        }

        let snapshot = state.snapshot();
        let mut line = format_telemetry(started.elapsed().as_secs_f64(), &snapshot);
        line.push('\n');
        if let Err(err) = client.write_all(line.as_bytes()) {
            log::error!("telemetry: client write failed: {err}");
            state.request_stop();
            break;
        }
    }
    log::info!("telemetry: stopped");
}
