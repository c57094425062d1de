//! # Certificate Health Checker
//!
//! Opens a TLS connection to a host, reads the negotiated protocol and the
//! peer certificate's expiry, and classifies the days of validity left
//! against configured thresholds. Trust validation is explicitly out of
//! scope here: the handshake accepts any certificate, because the only
//! question this checker answers is "when does it expire" — a caller that
//! observed a trust failure elsewhere folds it in as a prior status.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use url::Url;

use crate::cache::TtlCache;
use crate::config::CertificateCheckConfig;
use crate::report::HealthComponent;
use crate::status::HealthStatus;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// What one handshake observed. Memoized per host:port so repeated health
/// polls do not re-handshake; classification still runs per call against the
/// current clock.
#[derive(Debug, Clone)]
struct HandshakeObservation {
    protocol: Option<String>,
    not_after: Option<DateTime<Utc>>,
}

/// Evaluates certificate expiry for a URL.
pub struct CertificateHealthChecker {
    config: CertificateCheckConfig,
    observations: TtlCache<String, HandshakeObservation>,
}

impl CertificateHealthChecker {
    pub fn new(config: CertificateCheckConfig, observation_ttl: Duration) -> Self {
        Self {
            config,
            observations: TtlCache::new(observation_ttl),
        }
    }

    pub fn config(&self) -> &CertificateCheckConfig {
        &self.config
    }

    /// Certificate health for the URL, folding in a prior status observed by
    /// the caller (for example a TLS validation failure seen while probing a
    /// dependency) so the worse of the two always wins.
    pub async fn check(&self, url: &Url, prior: Option<HealthStatus>) -> HealthComponent {
        let host = match url.host_str() {
            Some(host) => host.to_string(),
            None => {
                return HealthComponent::new(HealthStatus::Degraded)
                    .with_detail("message", format!("URL '{url}' has no host to probe."));
            }
        };
        let port = url.port_or_known_default().unwrap_or(443);

        // Plain HTTP carries no certificate; skipping is expected, not unknown.
        if port == 80 {
            return HealthComponent::new(prior.unwrap_or(HealthStatus::Healthy))
                .with_detail("host", host.clone())
                .with_detail(
                    "message",
                    format!("Port 80 (HTTP) on {host}: no certificate to check."),
                );
        }

        let observation = match self.observations.get(&format!("{host}:{port}")) {
            Some(observation) => observation,
            None => match probe_handshake(&host, port).await {
                Ok(observation) => {
                    self.observations
                        .insert(format!("{host}:{port}"), observation.clone());
                    observation
                }
                Err(message) => {
                    warn!(host = %host, port = port, error = %message, "Certificate probe failed");
                    let status = HealthStatus::reduce(
                        prior.into_iter().chain([HealthStatus::Degraded]),
                    );
                    return HealthComponent::new(status)
                        .with_detail("host", host.clone())
                        .with_detail(
                            "message",
                            format!("Could not read certificate for {host}:{port}: {message}"),
                        );
                }
            },
        };

        self.evaluate(&host, prior, &observation, Utc::now())
    }

    /// Certificate health for the service's own URL, when self checking is
    /// enabled and a URL is configured.
    pub async fn check_self(&self) -> Option<(String, HealthComponent)> {
        if !self.config.self_check_enabled {
            return None;
        }
        let raw = self.config.self_check_url.as_deref()?;
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = raw, error = %e, "Invalid certificate self-check URL");
                return Some((
                    "certificate".to_string(),
                    HealthComponent::new(HealthStatus::Degraded)
                        .with_detail("message", format!("Invalid self-check URL '{raw}': {e}")),
                ));
            }
        };
        Some(("certificate".to_string(), self.check(&url, None).await))
    }

    fn evaluate(
        &self,
        host: &str,
        prior: Option<HealthStatus>,
        observation: &HandshakeObservation,
        now: DateTime<Utc>,
    ) -> HealthComponent {
        let protocol = observation.protocol.as_deref().unwrap_or("unknown");

        let (expiry_status, message, expiry_details) = match observation.not_after {
            Some(not_after) => {
                let days_left = (not_after - now).num_days();
                let status = classify_days_left(days_left, &self.config);
                let message = format!(
                    "Certificate for {host} ({protocol}) expires {} - {days_left} days left.",
                    not_after.format("%Y-%m-%d")
                );
                (status, message, Some((not_after, days_left)))
            }
            None => (
                HealthStatus::Degraded,
                format!("Certificate for {host} ({protocol}) reported no expiry date."),
                None,
            ),
        };

        let status = HealthStatus::reduce(prior.into_iter().chain([expiry_status]));

        let mut component = HealthComponent::new(status)
            .with_detail("host", host)
            .with_detail("tls_protocol", protocol)
            .with_detail("message", message);
        if let Some((not_after, days_left)) = expiry_details {
            component = component
                .with_detail("expires_at", not_after.to_rfc3339())
                .with_detail("days_left", days_left.to_string());
        }
        component
    }
}

/// Expiry classification against the configured limits.
fn classify_days_left(days_left: i64, config: &CertificateCheckConfig) -> HealthStatus {
    if days_left <= config.expiry_unhealthy_limit_days {
        HealthStatus::Unhealthy
    } else if days_left <= config.expiry_degraded_limit_days {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Connect and handshake, accepting any certificate, and report what the
/// session negotiated.
async fn probe_handshake(host: &str, port: u16) -> Result<HandshakeObservation, String> {
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|e| format!("invalid host name: {e}"))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("TLS configuration rejected: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));

    let handshake = async {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| format!("connect failed: {e}"))?;
        connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| format!("handshake failed: {e}"))
    };
    let stream = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake)
        .await
        .map_err(|_| format!("handshake timed out after {}s", HANDSHAKE_TIMEOUT.as_secs()))??;

    let (_, session) = stream.get_ref();
    let protocol = session.protocol_version().map(|v| format!("{v:?}"));
    let not_after = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .and_then(|leaf| leaf_not_after(leaf));

    debug!(host = %host, port = port, protocol = ?protocol, "Certificate handshake observed");

    Ok(HandshakeObservation {
        protocol,
        not_after,
    })
}

fn leaf_not_after(der: &CertificateDer<'_>) -> Option<DateTime<Utc>> {
    use x509_parser::prelude::FromDer;
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(der.as_ref()).ok()?;
    DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)
}

/// Verifier that accepts every certificate. Trust is not this checker's
/// question; only the certificate's own fields are inspected afterwards.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn checker() -> CertificateHealthChecker {
        CertificateHealthChecker::new(CertificateCheckConfig::default(), Duration::from_secs(300))
    }

    fn observation(days_from_now: i64) -> HandshakeObservation {
        HandshakeObservation {
            protocol: Some("TLSv1_3".to_string()),
            not_after: Some(Utc::now() + ChronoDuration::days(days_from_now)),
        }
    }

    #[test]
    fn default_thresholds_classify_days_left() {
        let config = CertificateCheckConfig::default();
        assert_eq!(classify_days_left(2, &config), HealthStatus::Unhealthy);
        assert_eq!(classify_days_left(3, &config), HealthStatus::Unhealthy);
        assert_eq!(classify_days_left(15, &config), HealthStatus::Degraded);
        assert_eq!(classify_days_left(30, &config), HealthStatus::Degraded);
        assert_eq!(classify_days_left(100, &config), HealthStatus::Healthy);
        assert_eq!(classify_days_left(-5, &config), HealthStatus::Unhealthy);
    }

    #[test]
    fn evaluation_reports_expiry_details() {
        let checker = checker();
        let component = checker.evaluate("example.org", None, &observation(100), Utc::now());
        assert_eq!(component.status, HealthStatus::Healthy);
        assert_eq!(component.details["host"], "example.org");
        assert_eq!(component.details["tls_protocol"], "TLSv1_3");
        assert!(component.details.contains_key("expires_at"));
        assert!(component.details["message"].contains("days left"));
    }

    #[test]
    fn missing_expiry_is_degraded() {
        let checker = checker();
        let observation = HandshakeObservation {
            protocol: None,
            not_after: None,
        };
        let component = checker.evaluate("example.org", None, &observation, Utc::now());
        assert_eq!(component.status, HealthStatus::Degraded);
        assert!(component.details["message"].contains("no expiry"));
    }

    #[test]
    fn prior_status_folds_in_and_the_worse_wins() {
        let checker = checker();

        let component = checker.evaluate(
            "example.org",
            Some(HealthStatus::Degraded),
            &observation(100),
            Utc::now(),
        );
        assert_eq!(component.status, HealthStatus::Degraded);

        let component = checker.evaluate(
            "example.org",
            Some(HealthStatus::Degraded),
            &observation(1),
            Utc::now(),
        );
        assert_eq!(component.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn port_80_skips_the_probe() {
        let checker = checker();
        let url = Url::parse("http://insecure.internal/service").unwrap();
        let component = checker.check(&url, None).await;
        assert_eq!(component.status, HealthStatus::Healthy);
        assert!(component.details["message"].contains("no certificate"));

        let component = checker.check(&url, Some(HealthStatus::Degraded)).await;
        assert_eq!(component.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn self_check_disabled_or_unconfigured_yields_nothing() {
        let checker = CertificateHealthChecker::new(
            CertificateCheckConfig {
                self_check_enabled: false,
                self_check_url: Some("https://svc.internal".to_string()),
                ..CertificateCheckConfig::default()
            },
            Duration::from_secs(300),
        );
        assert!(checker.check_self().await.is_none());

        let checker = CertificateHealthChecker::new(
            CertificateCheckConfig {
                self_check_url: None,
                ..CertificateCheckConfig::default()
            },
            Duration::from_secs(300),
        );
        assert!(checker.check_self().await.is_none());
    }
}
