//! Shared state handed to every task at spawn time.
//!
//! One `Arc<SharedState>` replaces the ambient globals of an earlier
//! design: the cooperative stop flag, the actuator value array, and the
//! latest sensor snapshot all live here.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::SensorSnapshot;

/// Neutral (closed) actuator value: the power-on default and the value
/// every channel is driven to on shutdown.
pub const NEUTRAL_ACTUATOR_VALUE: f64 = 0.5;

/// Fixed-length array of normalized actuator values.
///
/// Single writer (gateway) and single reader (control loop) per index;
/// values are stored as `f64` bits in atomics so element access needs
/// no lock. No cross-element atomicity is provided or required.
pub struct ActuatorArray {
    slots: Vec<AtomicU64>,
}

impl ActuatorArray {
    pub fn new(count: usize) -> Self {
        let slots = (0..count)
            .map(|_| AtomicU64::new(NEUTRAL_ACTUATOR_VALUE.to_bits()))
            .collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Out-of-range indices are ignored; a client that sends more
    /// values than there are actuators does not corrupt anything.
    pub fn set(&self, index: usize, value: f64) {
        if let Some(slot) = self.slots.get(index) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn get(&self, index: usize) -> f64 {
        self.slots
            .get(index)
            .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(NEUTRAL_ACTUATOR_VALUE)
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn reset(&self) {
        for slot in &self.slots {
            slot.store(NEUTRAL_ACTUATOR_VALUE.to_bits(), Ordering::Relaxed);
        }
    }
}

/// State shared by the five controller tasks.
pub struct SharedState {
    stop: AtomicBool,
    actuators: ActuatorArray,
    snapshot: Mutex<SensorSnapshot>,
}

impl SharedState {
    pub fn new(actuator_count: usize) -> Self {
        Self {
            stop: AtomicBool::new(false),
            actuators: ActuatorArray::new(actuator_count),
            snapshot: Mutex::new(SensorSnapshot::default()),
        }
    }

    /// Signals cooperative shutdown. Every task loop polls this and all
    /// blocking I/O carries a bounded timeout, so the flag is observed
    /// promptly.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn actuators(&self) -> &ActuatorArray {
        &self.actuators
    }

    /// Replaces the snapshot wholesale; last write wins.
    pub fn store_snapshot(&self, snapshot: SensorSnapshot) {
        *self.lock_snapshot() = snapshot;
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        self.lock_snapshot().clone()
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, SensorSnapshot> {
        match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
