//! # Health Aggregator
//!
//! Fans out every registered component check concurrently and streams
//! results as they complete. Each check runs in its own task and pushes its
//! result onto a channel; the consumer side yields in completion order, so a
//! slow check never delays the reporting of a fast one. Heartbeat probe
//! statuses are drained first - they are in-memory reads, not I/O.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::aggregator::component::{CheckContext, Component, ComponentSource};
use crate::aggregator::runner;
use crate::config::ExceptionDetailLevel;
use crate::error::{Result, VitalsError};
use crate::heartbeat::ProbeRegistry;
use crate::report::{HealthComponent, HealthReport};

/// Predicate selecting which components a status stream runs.
pub type ComponentFilter = Arc<dyn Fn(&Component) -> bool + Send + Sync>;

/// Options for one aggregation call.
#[derive(Clone)]
pub struct StatusStreamOptions {
    pub filter: Option<ComponentFilter>,
    pub include_probes: bool,
    pub cancel: CancellationToken,
}

impl Default for StatusStreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStreamOptions {
    pub fn new() -> Self {
        Self {
            filter: None,
            include_probes: true,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Component) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn without_probes(mut self) -> Self {
        self.include_probes = false;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

struct RegisteredSource {
    type_id: TypeId,
    source: Arc<dyn ComponentSource>,
}

/// Aggregates component checks and heartbeat probes into one status stream.
pub struct HealthAggregator {
    components: Vec<Component>,
    sources: Vec<RegisteredSource>,
    probes: Arc<ProbeRegistry>,
    detail_level: ExceptionDetailLevel,
}

impl HealthAggregator {
    pub fn new(probes: Arc<ProbeRegistry>, detail_level: ExceptionDetailLevel) -> Self {
        Self {
            components: Vec::new(),
            sources: Vec::new(),
            probes,
            detail_level,
        }
    }

    pub fn probes(&self) -> &Arc<ProbeRegistry> {
        &self.probes
    }

    /// Register a component. A second registration under the same non-empty
    /// name fails fast; unnamed components may register repeatedly and are
    /// disambiguated at reporting time.
    pub fn register_component(&mut self, component: Component) -> Result<()> {
        let name = component.name();
        if !name.is_empty() && self.components.iter().any(|c| c.name() == name) {
            return Err(VitalsError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        debug!(component = %component.effective_name(), essential = component.essential(), "Component registered");
        self.components.push(component);
        Ok(())
    }

    /// Register a component source. Each concrete source type may register
    /// once; a duplicate registration is a configuration error.
    pub fn register_source<S: ComponentSource + 'static>(&mut self, source: S) -> Result<()> {
        let type_id = TypeId::of::<S>();
        if self.sources.iter().any(|s| s.type_id == type_id) {
            return Err(VitalsError::DuplicateComponentSource {
                type_name: std::any::type_name::<S>().to_string(),
            });
        }
        self.sources.push(RegisteredSource {
            type_id,
            source: Arc::new(source),
        });
        Ok(())
    }

    /// Stream every probe status and check result, in completion order.
    ///
    /// The stream is lazy, finite, and non-restartable: probe statuses come
    /// first (when `include_probes`), then one result per component as each
    /// check finishes. Cancelling the token stops further yielding and
    /// aborts unresolved checks.
    ///
    /// Colliding names get ".0", ".1", ... suffixes. Which names collide is
    /// known before fan-out; which result receives which suffix follows
    /// completion order.
    pub fn status_stream(
        &self,
        options: StatusStreamOptions,
    ) -> impl Stream<Item = (String, HealthComponent)> + Send + 'static {
        let StatusStreamOptions {
            filter,
            include_probes,
            cancel,
        } = options;

        let mut components: Vec<Component> = self.components.clone();
        for registered in &self.sources {
            components.extend(registered.source.components());
        }
        if let Some(filter) = &filter {
            components.retain(|component| filter(component));
        }

        let mut multiplicity: HashMap<String, usize> = HashMap::new();
        if include_probes {
            for identity in self.probes.identities() {
                *multiplicity.entry(identity).or_default() += 1;
            }
        }
        for component in &components {
            *multiplicity
                .entry(component.effective_name().to_string())
                .or_default() += 1;
        }

        debug!(
            components = components.len(),
            include_probes, "Starting status aggregation"
        );

        let (tx, rx) = mpsc::channel(components.len().max(1));
        for component in components {
            let tx = tx.clone();
            let ctx = CheckContext::new(cancel.clone());
            let cancel = cancel.clone();
            let detail_level = self.detail_level;
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    (name, _elapsed, health) = runner::run_check(component, ctx, detail_level) => {
                        let _ = tx.send((name, health)).await;
                    }
                }
            });
        }
        drop(tx);

        let probe_items: Box<dyn Iterator<Item = (String, HealthComponent)> + Send> =
            if include_probes {
                Box::new(self.probes.statuses())
            } else {
                Box::new(std::iter::empty())
            };

        let mut arrivals: HashMap<String, usize> = HashMap::new();
        tokio_stream::iter(probe_items)
            .chain(ReceiverStream::new(rx))
            .map(move |(name, health)| {
                let key = if multiplicity.get(&name).copied().unwrap_or(0) > 1 {
                    let counter = arrivals.entry(name.clone()).or_insert(0);
                    let key = format!("{name}.{counter}");
                    *counter += 1;
                    key
                } else {
                    name
                };
                (key, health)
            })
            .take_until(cancel.cancelled_owned())
    }

    /// Drain a full status stream into a report, reducing every yielded
    /// status to the overall one.
    pub async fn summarize(&self, options: StatusStreamOptions) -> HealthReport {
        let stream = self.status_stream(options);
        futures::pin_mut!(stream);

        let mut components: BTreeMap<String, HealthComponent> = BTreeMap::new();
        while let Some((name, health)) = stream.next().await {
            components.insert(name, health);
        }
        HealthReport::from_components(components)
    }
}
