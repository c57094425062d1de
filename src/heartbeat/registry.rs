//! # Probe Registry
//!
//! Holds every registered heartbeat probe and exposes their current health
//! as a sequence. Probes register at startup or whenever a background task
//! spins up; reads take a snapshot, so registration never blocks a health
//! query.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::heartbeat::probe::HeartbeatProbe;
use crate::report::HealthComponent;

/// Registry of heartbeat probes in registration order.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: RwLock<Vec<Arc<HeartbeatProbe>>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a probe, handing it to the owning task.
    pub fn register(
        &self,
        identity: impl Into<String>,
        planned_interval: Option<Duration>,
        auto_max_interval: bool,
    ) -> Arc<HeartbeatProbe> {
        let probe = Arc::new(HeartbeatProbe::register(
            identity,
            planned_interval,
            auto_max_interval,
        ));
        self.attach(Arc::clone(&probe));
        probe
    }

    /// Register an externally constructed probe.
    pub fn attach(&self, probe: Arc<HeartbeatProbe>) {
        debug!(identity = probe.identity(), "Heartbeat probe registered");
        self.probes.write().push(probe);
    }

    pub fn len(&self) -> usize {
        self.probes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.read().is_empty()
    }

    /// Current health of every probe, in registration order.
    ///
    /// Each call snapshots the registration list and computes health lazily
    /// per item; probe health comes from in-memory state, so the iteration
    /// is sequential and cheap.
    pub fn statuses(&self) -> impl Iterator<Item = (String, HealthComponent)> {
        let snapshot: Vec<Arc<HeartbeatProbe>> = self.probes.read().clone();
        snapshot
            .into_iter()
            .map(|probe| (probe.identity().to_string(), probe.health()))
    }

    /// Probe identities in registration order, without computing health.
    pub(crate) fn identities(&self) -> Vec<String> {
        self.probes
            .read()
            .iter()
            .map(|probe| probe.identity().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::HealthStatus;

    #[tokio::test(start_paused = true)]
    async fn statuses_iterate_in_registration_order() {
        let registry = ProbeRegistry::new();
        registry.register("cleanup", None, true);
        registry.register("indexer", None, true);
        registry.register("mailer", None, true);

        let names: Vec<String> = registry.statuses().map(|(name, _)| name).collect();
        assert_eq!(names, ["cleanup", "indexer", "mailer"]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_reflects_current_probe_state() {
        let registry = ProbeRegistry::new();
        let probe = registry.register("worker", None, true);

        let first: Vec<_> = registry.statuses().collect();
        assert_eq!(first[0].1.status, HealthStatus::Healthy);

        probe.end_service_err("boom");
        let second: Vec<_> = registry.statuses().collect();
        assert_eq!(second[0].1.status, HealthStatus::Unhealthy);
    }
}
