//! Infrastructure adapters module
//!
//! Metrics collection and the built-in simulator adapter.

pub mod monitoring;
pub mod simulator;

pub use monitoring::MonitoringAdapter;
pub use simulator::{SimulatorPlugin, SimulatorService, SimulatorSettings};
