//! # Heartbeat Monitoring
//!
//! Per background-task pulse logs and the statistical classifier that turns
//! inter-pulse timing into an availability status. Tasks register a probe,
//! pulse it on every work cycle, and optionally end it when they stop; the
//! registry exposes every probe's current health to the aggregator.

pub mod probe;
pub mod registry;

pub use probe::HeartbeatProbe;
pub use registry::ProbeRegistry;
