//! Task registry and launch sequence for the five controller tasks.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use common::error::Result;
use common::{ControllerConfig, SharedState};
use hardware::{Actuator, MaskPort, ReferenceSensor, SharedLink, SolenoidBank};

use crate::telemetry::TELEMETRY_WRITE_TIMEOUT;
use crate::{actuator, aggregator, bridge, gateway, telemetry};

/// Named join handles for every spawned task, so shutdown can report
/// which task exited (or panicked) instead of joining an anonymous
/// list.
pub struct TaskRegistry {
    tasks: Vec<NamedTask>,
}

struct NamedTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::spawn(task);
        self.tasks.push(NamedTask { name, handle });
    }

    /// Blocks until every task has exited. Shutdown is cooperative;
    /// there is no forced termination.
    pub fn join_all(self) {
        for task in self.tasks {
            match task.handle.join() {
                Ok(()) => log::info!("task {} exited", task.name),
                Err(_) => log::error!("task {} panicked", task.name),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the five controller tasks around an accepted control client.
///
/// The client socket is split: the gateway owns the original stream for
/// bounded reads, the telemetry sender owns a clone with a bounded
/// write timeout.
pub fn launch(
    config: &ControllerConfig,
    state: Arc<SharedState>,
    client: TcpStream,
    actuators: Vec<Box<dyn Actuator>>,
    sensors: Vec<Box<dyn ReferenceSensor>>,
    solenoids: Box<dyn SolenoidBank>,
    link: SharedLink,
) -> Result<TaskRegistry> {
    let sender_stream = client.try_clone()?;
    sender_stream.set_write_timeout(Some(TELEMETRY_WRITE_TIMEOUT))?;

    let actuator_period = config.actuator_period();
    let sensor_period = config.sensor_period();

    let mut registry = TaskRegistry::new();

    registry.spawn("bridge", {
        let link = link.clone();
        let state = Arc::clone(&state);
        move || bridge::run_bridge(link, state)
    });

    registry.spawn("aggregator", {
        let state = Arc::clone(&state);
        move || aggregator::run_aggregator(state, sensors, sensor_period)
    });

    registry.spawn("actuator-loop", {
        let state = Arc::clone(&state);
        move || actuator::run_actuator_loop(state, actuators, actuator_period)
    });

    registry.spawn("gateway", {
        let state = Arc::clone(&state);
        let mask_port: Arc<dyn MaskPort> = Arc::new(link);
        move || gateway::run_gateway(client, state, solenoids, mask_port)
    });

    registry.spawn("telemetry", {
        let state = Arc::clone(&state);
        move || telemetry::run_telemetry(sender_stream, state, sensor_period)
    });

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_joins_every_named_task() {
        let state = Arc::new(SharedState::new(1));
        let mut registry = TaskRegistry::new();
        for name in ["a", "b", "c"] {
            let state = Arc::clone(&state);
            registry.spawn(name, move || {
                while !state.stop_requested() {
                    thread::yield_now();
                }
            });
        }
        assert_eq!(registry.len(), 3);
        state.request_stop();
        registry.join_all();
    }
}
