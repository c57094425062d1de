//! # Vitals Core
//!
//! Rust core for service availability reporting. Aggregates ad-hoc component
//! checks, background-task heartbeats, downstream dependency probes, and
//! certificate expiry into a single ordered status suitable for liveness and
//! readiness endpoints.
//!
//! ## Architecture
//!
//! Checks are immutable records pairing a name and essential flag with one
//! async function. The aggregator fans them out concurrently and streams
//! results in completion order, so one slow check never delays the rest;
//! every stream reduces through the status algebra, where the worst status
//! always wins. Dependencies are probed one hop deep with the same streaming
//! pattern.
//!
//! ## Module Organization
//!
//! - [`status`] - status total order, reduction, readiness/liveness projections
//! - [`report`] - component/report wire shapes
//! - [`aggregator`] - component checks, the streaming aggregator, dependency probing
//! - [`heartbeat`] - pulse logs and interval-statistics liveness classification
//! - [`certificate`] - TLS expiry inspection and classification
//! - [`endpoint_access`] - per-endpoint access-flag codec
//! - [`cache`] - TTL-keyed concurrent cache
//! - [`config`] - configuration structures and YAML loading
//! - [`error`] - structured error handling
//! - [`logging`] - environment-aware structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitals_core::aggregator::{Component, CheckResult, HealthAggregator, StatusStreamOptions};
//! use vitals_core::config::ExceptionDetailLevel;
//! use vitals_core::heartbeat::ProbeRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let probes = Arc::new(ProbeRegistry::new());
//! let mut aggregator = HealthAggregator::new(Arc::clone(&probes), ExceptionDetailLevel::Message);
//! aggregator.register_component(Component::new("database", |_ctx| async {
//!     Ok(CheckResult::ok())
//! }))?;
//!
//! let report = aggregator.summarize(StatusStreamOptions::new()).await;
//! println!("overall: {}", report.status);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod certificate;
pub mod config;
pub mod endpoint_access;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod report;
pub mod status;

pub use aggregator::{
    CheckContext, CheckResult, Component, ComponentSource, Dependency, DependencyAggregator,
    HealthAggregator, StatusStreamOptions,
};
pub use certificate::CertificateHealthChecker;
pub use config::{CertificateCheckConfig, ConfigManager, ExceptionDetailLevel, VitalsConfig};
pub use endpoint_access::{EndpointAccess, EndpointAccessMap, HealthEndpoint};
pub use error::{Result, VitalsError};
pub use heartbeat::{HeartbeatProbe, ProbeRegistry};
pub use report::{
    DependencyComponent, DependencyReport, HealthComponent, HealthReport, LivenessReport,
    ReadinessReport,
};
pub use status::{HealthStatus, LivenessStatus, ReadinessStatus};
