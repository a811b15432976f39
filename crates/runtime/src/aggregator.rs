//! Sensor aggregator: reconciles the two local sensing paths.
//!
//! The onboard analog channel and the microcontroller-reported VEAB
//! reading measure the same pressure; the aggregator periodically
//! scales the reported reference down and stores it as each local
//! sensor's adjusted value.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::SharedState;
use hardware::ReferenceSensor;

/// The microcontroller reports the VEAB value on a 5x scale relative
/// to the adjusted local reading.
pub const REFERENCE_SCALE: f64 = 5.0;

pub fn run_aggregator(
    state: Arc<SharedState>,
    mut sensors: Vec<Box<dyn ReferenceSensor>>,
    period: Duration,
) {
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

        calibrate_once(&state, &mut sensors);
    }
    log::info!("aggregator: stopped");
}

/// Hardware read failures are logged and skipped; the adjusted value is
/// diagnostic, not control-critical.
fn calibrate_once(state: &SharedState, sensors: &mut [Box<dyn ReferenceSensor>]) {
    let reference = state.snapshot().local_reading;
    for sensor in sensors.iter_mut() {
        sensor.set_adjusted(reference / REFERENCE_SCALE);
        match sensor.read() {
            Ok(raw) => log::trace!(
                "aggregator: raw {raw:.3} V, adjusted {:.3}",
                sensor.adjusted()
            ),
            Err(err) => log::debug!("aggregator: local analog read failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SensorSnapshot;
    use hardware::HardwareError;

    struct FakeSensor {
        raw: f64,
        adjusted: f64,
        fail_reads: bool,
    }

    impl ReferenceSensor for FakeSensor {
        fn read(&mut self) -> Result<f64, HardwareError> {
            if self.fail_reads {
                Err(HardwareError::BadChannel(0))
            } else {
                Ok(self.raw)
            }
        }

        fn set_adjusted(&mut self, value: f64) {
            self.adjusted = value;
        }

        fn adjusted(&self) -> f64 {
            self.adjusted
        }
    }

    #[test]
    fn reference_reading_is_scaled_down() {
        let state = SharedState::new(1);
        state.store_snapshot(SensorSnapshot {
            timestamp: 0.1,
            local_reading: 2.5,
            remote_readings: [0.0; 8],
        });
        let mut sensors: Vec<Box<dyn ReferenceSensor>> = vec![Box::new(FakeSensor {
            raw: 3.3,
            adjusted: 0.0,
            fail_reads: false,
        })];
        calibrate_once(&state, &mut sensors);
        assert_eq!(sensors[0].adjusted(), 0.5);
    }

    #[test]
    fn read_failure_still_updates_adjusted_value() {
        let state = SharedState::new(1);
        state.store_snapshot(SensorSnapshot {
            timestamp: 0.1,
            local_reading: 5.0,
            remote_readings: [0.0; 8],
        });
        let mut sensors: Vec<Box<dyn ReferenceSensor>> = vec![Box::new(FakeSensor {
            raw: 0.0,
            adjusted: 0.0,
            fail_reads: true,
        })];
        calibrate_once(&state, &mut sensors);
        assert_eq!(sensors[0].adjusted(), 1.0);
    }
}
