//! # Status Algebra
//!
//! The total order over availability statuses and the "worst wins" reduction
//! used everywhere a set of statuses collapses into one. Also provides the
//! readiness and liveness projections used by probe endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VitalsError};

/// Availability status of a component, dependency, or the whole service.
///
/// The declaration order defines the total order used for reduction:
/// `Healthy < Degraded < Unhealthy`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum HealthStatus {
    /// Component is functioning normally
    #[default]
    Healthy,
    /// Component is impaired but the service remains usable
    Degraded,
    /// Component has failed in a way that makes the service unusable
    Unhealthy,
}

impl HealthStatus {
    /// Reduce a set of statuses to the worst one.
    ///
    /// An empty input reduces to [`HealthStatus::Healthy`]: with nothing to
    /// report, there is nothing wrong.
    pub fn reduce<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or(HealthStatus::Healthy)
    }

    /// The worse of two statuses.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }

    pub fn is_operational(self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The worst of any number of optional statuses.
///
/// Absent operands are ignored; an input with no present operand is a caller
/// error and fails with [`VitalsError::EmptyStatusReduction`].
pub fn max_of(operands: &[Option<HealthStatus>]) -> Result<HealthStatus> {
    operands
        .iter()
        .flatten()
        .copied()
        .max()
        .ok_or(VitalsError::EmptyStatusReduction)
}

/// Readiness projection of [`HealthStatus`], reported by readiness probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessStatus {
    Ready,
    Degraded,
    Unready,
}

impl From<HealthStatus> for ReadinessStatus {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Healthy => ReadinessStatus::Ready,
            HealthStatus::Degraded => ReadinessStatus::Degraded,
            HealthStatus::Unhealthy => ReadinessStatus::Unready,
        }
    }
}

/// Liveness projection of [`HealthStatus`], reported by liveness probes.
///
/// A degraded service is still alive; only `Unhealthy` maps to `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessStatus {
    Alive,
    Dead,
}

impl From<HealthStatus> for LivenessStatus {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Unhealthy => LivenessStatus::Dead,
            _ => LivenessStatus::Alive,
        }
    }
}
