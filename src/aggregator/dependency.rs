//! # Dependency Aggregator
//!
//! Probes every configured downstream dependency's health endpoint
//! concurrently, one hop deep, and streams per-dependency results in
//! completion order. Certificate validation failures are observed rather
//! than fatal: the probe retries on a permissive client and the failure is
//! folded into the dependency's certificate component.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::certificate::CertificateHealthChecker;
use crate::config::DependencyConfig;
use crate::error::{Result, VitalsError};
use crate::report::{DependencyComponent, DependencyReport, HealthComponent, HealthReport};
use crate::status::HealthStatus;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One downstream dependency. Registered at startup, read-only after.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub essential: bool,
    pub url: Url,
}

impl Dependency {
    pub fn from_config(config: &DependencyConfig) -> Result<Self> {
        let url = Url::parse(&config.url).map_err(|e| VitalsError::InvalidUrl {
            url: config.url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: config.name.clone(),
            essential: config.essential,
            url,
        })
    }
}

/// Probes configured dependencies and reduces their nested statuses.
pub struct DependencyAggregator {
    dependencies: Vec<Dependency>,
    certificates: Arc<CertificateHealthChecker>,
    strict: reqwest::Client,
    permissive: reqwest::Client,
}

impl DependencyAggregator {
    pub fn new(
        configs: &[DependencyConfig],
        certificates: Arc<CertificateHealthChecker>,
    ) -> Result<Self> {
        let dependencies = configs
            .iter()
            .map(Dependency::from_config)
            .collect::<Result<Vec<_>>>()?;

        let strict = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| VitalsError::configuration("dependency_probe", e.to_string()))?;
        // Used only after the strict client reported a certificate problem,
        // so the body can still be read while the failure is recorded.
        let permissive = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| VitalsError::configuration("dependency_probe", e.to_string()))?;

        Ok(Self {
            dependencies,
            certificates,
            strict,
            permissive,
        })
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Stream one result per configured dependency, in completion order.
    ///
    /// Network failures surface as an unreachable component inside an `Ok`
    /// item; a 401 response surfaces as an `Err` item - an unauthorized
    /// probe is a misconfiguration signal, not a transient outage.
    pub fn status_stream(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<(String, DependencyComponent)>> + Send + 'static {
        let (tx, rx) = mpsc::channel(self.dependencies.len().max(1));
        for dependency in self.dependencies.clone() {
            let tx = tx.clone();
            let strict = self.strict.clone();
            let permissive = self.permissive.clone();
            let certificates = Arc::clone(&self.certificates);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    result = probe_dependency(dependency, strict, permissive, certificates) => {
                        let _ = tx.send(result).await;
                    }
                }
            });
        }
        drop(tx);

        ReceiverStream::new(rx).take_until(cancel.cancelled_owned())
    }

    /// Drain the stream into a report. The first unauthorized probe aborts
    /// the summary with its error.
    pub async fn summarize(&self, cancel: CancellationToken) -> Result<DependencyReport> {
        let stream = self.status_stream(cancel);
        futures::pin_mut!(stream);

        let mut dependencies: BTreeMap<String, DependencyComponent> = BTreeMap::new();
        while let Some(item) = stream.next().await {
            let (name, component) = item?;
            dependencies.insert(name, component);
        }
        Ok(DependencyReport::from_dependencies(dependencies))
    }
}

async fn probe_dependency(
    dependency: Dependency,
    strict: reqwest::Client,
    permissive: reqwest::Client,
    certificates: Arc<CertificateHealthChecker>,
) -> Result<(String, DependencyComponent)> {
    let probe_url = health_probe_url(&dependency.url);
    debug!(dependency = %dependency.name, url = %probe_url, "Probing dependency health");

    let mut tls_validation_error: Option<String> = None;
    let mut connection_error: Option<String> = None;

    let response = match strict.get(probe_url.clone()).send().await {
        Ok(response) => Some(response),
        Err(err) if is_certificate_error(&err) => {
            let flattened = flatten_error(&err);
            warn!(
                dependency = %dependency.name,
                error = %flattened,
                "Certificate validation failed; retrying with validation disabled"
            );
            tls_validation_error = Some(flattened);
            match permissive.get(probe_url.clone()).send().await {
                Ok(response) => Some(response),
                Err(err) => {
                    connection_error = Some(flatten_error(&err));
                    None
                }
            }
        }
        Err(err) => {
            connection_error = Some(flatten_error(&err));
            None
        }
    };

    let mut components: BTreeMap<String, HealthComponent> = BTreeMap::new();
    match response {
        Some(response) if response.status() == StatusCode::UNAUTHORIZED => {
            return Err(VitalsError::DependencyUnauthorized {
                name: dependency.name.clone(),
                url: probe_url.to_string(),
            });
        }
        Some(response) => {
            let http_status = response.status();
            match response.json::<HealthReport>().await {
                Ok(report) => {
                    components.extend(report.components);
                }
                Err(err) => {
                    components.insert(
                        "response".to_string(),
                        HealthComponent::new(HealthStatus::Unhealthy).with_detail(
                            "message",
                            format!(
                                "Health response ({http_status}) could not be parsed: {err}"
                            ),
                        ),
                    );
                }
            }
        }
        None => {
            let error = connection_error.unwrap_or_else(|| "unknown error".to_string());
            warn!(dependency = %dependency.name, error = %error, "Dependency unreachable");
            components.insert(
                "connection".to_string(),
                HealthComponent::new(HealthStatus::Unhealthy)
                    .with_detail("message", format!("Probe failed: {error}")),
            );
        }
    }

    if certificates.config().dependency_check_enabled {
        let prior = tls_validation_error
            .is_some()
            .then_some(HealthStatus::Degraded);
        let mut certificate = certificates.check(&dependency.url, prior).await;
        if let Some(error) = tls_validation_error {
            certificate
                .details
                .insert("validation_error".to_string(), error);
        }
        components.insert("certificate".to_string(), certificate);
    }

    let reduced = HealthStatus::reduce(components.values().map(|c| c.status));
    // Nested statuses stay as reported; only the dependency level downgrades.
    let status = if !dependency.essential && reduced == HealthStatus::Unhealthy {
        HealthStatus::Degraded
    } else {
        reduced
    };

    Ok((
        dependency.name,
        DependencyComponent {
            status,
            url: dependency.url.to_string(),
            components,
        },
    ))
}

/// The one-hop probe URL: the remote must not fan out to its own
/// dependencies or re-run its certificate self check.
fn health_probe_url(base: &Url) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("Health");
    }
    url.set_query(Some("noDependencies=true&noCertSelfCheck=true"));
    url
}

fn is_certificate_error(err: &reqwest::Error) -> bool {
    flatten_error(err).to_lowercase().contains("certificate")
}

fn flatten_error(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
