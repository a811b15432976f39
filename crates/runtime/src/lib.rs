//! The five concurrent controller tasks and their supervisor.
//!
//! Each task is a plain function run on its own OS thread, taking the
//! shared state handle and the hardware seams it needs. Shutdown is
//! cooperative: every loop polls the stop flag and all blocking I/O is
//! time-bounded.

pub mod actuator;
pub mod aggregator;
pub mod bridge;
pub mod gateway;
pub mod supervisor;
pub mod telemetry;

pub use supervisor::{launch, TaskRegistry};
