//! # Report Types
//!
//! The status + detail shapes produced by checks, probes, and aggregators,
//! and the wire-level reports they roll up into. Serialization follows the
//! health JSON shape:
//!
//! ```json
//! { "status": "Healthy", "components": { "<name>": { "status": "...", "details": {...} } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::{HealthStatus, LivenessStatus, ReadinessStatus};

/// Result of evaluating one component: a status plus an ordered detail map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthComponent {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl HealthComponent {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.details.get("message").map(String::as_str)
    }
}

/// Result of probing one downstream dependency: its own status, the probed
/// URL, and the nested components the remote reported (plus any merged
/// certificate component).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyComponent {
    pub status: HealthStatus,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, HealthComponent>,
}

/// Aggregated health of the whole service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(default)]
    pub components: BTreeMap<String, HealthComponent>,
}

impl HealthReport {
    /// Build a report from finalized components, reducing their statuses.
    pub fn from_components(components: BTreeMap<String, HealthComponent>) -> Self {
        let status = HealthStatus::reduce(components.values().map(|c| c.status));
        Self { status, components }
    }

    pub fn readiness(&self) -> ReadinessReport {
        ReadinessReport {
            status: self.status.into(),
        }
    }

    pub fn liveness(&self) -> LivenessReport {
        LivenessReport {
            status: self.status.into(),
        }
    }
}

/// Aggregated health of all configured dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub status: HealthStatus,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyComponent>,
}

impl DependencyReport {
    pub fn from_dependencies(dependencies: BTreeMap<String, DependencyComponent>) -> Self {
        let status = HealthStatus::reduce(dependencies.values().map(|d| d.status));
        Self {
            status,
            dependencies,
        }
    }
}

/// Readiness projection of a [`HealthReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub status: ReadinessStatus,
}

/// Liveness projection of a [`HealthReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessReport {
    pub status: LivenessStatus,
}
