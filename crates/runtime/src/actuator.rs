//! Fixed-frequency actuator control loop.
//!
//! Each tick reads the shared array, clamps into [0.0, 1.0], writes the
//! clamped value back, and applies it to the DAC channels. Scheduling
//! runs on an absolute tick grid so timing error never accumulates.
//! The exit path performs exactly one reset pass to the neutral value,
//! which is the only guarantee of a safe hardware state on shutdown.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::state::NEUTRAL_ACTUATOR_VALUE;
use common::SharedState;
use hardware::{Actuator, HardwareError};

pub fn run_actuator_loop(
    state: Arc<SharedState>,
    mut actuators: Vec<Box<dyn Actuator>>,
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
            // Overran a full period; rejoin the grid instead of
            // bursting to catch up.
            next_tick = Instant::now() + period;
        }

        if let Err(err) = apply_clamped(&state, &mut actuators) {
            log::error!("actuator loop: apply failed: {err}");
            state.request_stop();
            break;
        }
    }

    state.actuators().reset();
    for actuator in &mut actuators {
        if let Err(err) = actuator.apply(NEUTRAL_ACTUATOR_VALUE) {
            log::error!("actuator loop: neutral reset failed: {err}");
        }
    }
    log::info!("actuator loop: channels reset to neutral");
}

fn apply_clamped(
    state: &SharedState,
    actuators: &mut [Box<dyn Actuator>],
) -> Result<(), HardwareError> {
    for (index, actuator) in actuators.iter_mut().enumerate() {
        // min-then-max rather than clamp so a NaN from the wire lands
        // at 1.0 instead of propagating to the DAC.
        let clamped = state.actuators().get(index).min(1.0).max(0.0);
        state.actuators().set(index, clamped);
        actuator.apply(clamped)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingActuator {
        applied: Arc<Mutex<Vec<f64>>>,
    }

    impl Actuator for RecordingActuator {
        fn apply(&mut self, normalized: f64) -> Result<(), HardwareError> {
            self.applied.lock().unwrap().push(normalized);
            Ok(())
        }
    }

    fn recording_pair() -> (Vec<Box<dyn Actuator>>, Arc<Mutex<Vec<f64>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let actuator = RecordingActuator {
            applied: Arc::clone(&applied),
        };
        (vec![Box::new(actuator) as Box<dyn Actuator>], applied)
    }

    #[test]
    fn out_of_range_values_clamp_on_tick() {
        let state = SharedState::new(1);
        let (mut actuators, applied) = recording_pair();

        state.actuators().set(0, 1.5);
        apply_clamped(&state, &mut actuators).unwrap();
        assert_eq!(state.actuators().get(0), 1.0);

        state.actuators().set(0, -0.25);
        apply_clamped(&state, &mut actuators).unwrap();
        assert_eq!(state.actuators().get(0), 0.0);

        state.actuators().set(0, f64::NAN);
        apply_clamped(&state, &mut actuators).unwrap();
        let stored = state.actuators().get(0);
        assert!(
            (0.0..=1.0).contains(&stored),
            "stored actuator value after tick is {stored}, outside [0,1]"
        );
        assert_eq!(stored, 1.0);

        assert_eq!(*applied.lock().unwrap(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn stop_resets_to_neutral_exactly_once() {
        let state = Arc::new(SharedState::new(2));
        state.actuators().set(0, 0.9);
        state.actuators().set(1, 0.1);
        state.request_stop();

        let applied = Arc::new(Mutex::new(Vec::new()));
        let actuators: Vec<Box<dyn Actuator>> = (0..2)
            .map(|_| {
                Box::new(RecordingActuator {
                    applied: Arc::clone(&applied),
                }) as Box<dyn Actuator>
            })
            .collect();

        run_actuator_loop(
            Arc::clone(&state),
            actuators,
            Duration::from_millis(1),
        );

        // No control ticks ran; only the single reset pass reached the
        // hardware, and the shared array went back to neutral.
        assert_eq!(*applied.lock().unwrap(), vec![0.5, 0.5]);
        assert_eq!(state.actuators().values(), vec![0.5, 0.5]);
    }

    #[test]
    fn hardware_failure_stops_the_controller() {
        struct FailingActuator;
        impl Actuator for FailingActuator {
            fn apply(&mut self, _: f64) -> Result<(), HardwareError> {
                Err(HardwareError::BadChannel(0))
            }
        }

        let state = Arc::new(SharedState::new(1));
        run_actuator_loop(
            Arc::clone(&state),
            vec![Box::new(FailingActuator)],
            Duration::from_millis(1),
        );
        assert!(state.stop_requested());
    }
}
