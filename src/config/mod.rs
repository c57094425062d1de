//! # Vitals Configuration System
//!
//! Explicit, validated configuration for the availability core. All values
//! come from YAML files with environment overlays; nothing falls back to
//! hardcoded magic at call sites.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vitals_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let degraded_limit = manager.config().certificate.expiry_degraded_limit_days;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::endpoint_access::{self, EndpointAccessMap, DEFAULT_ACCESS_STRING};
use crate::error::{Result, VitalsError};

pub use loader::ConfigManager;

/// Root configuration structure mirroring vitals.yaml.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Endpoint exposure policy
    pub endpoint_access: EndpointAccessConfig,

    /// How much of a failing check's error is reported
    pub exception_detail: ExceptionDetailConfig,

    /// Certificate expiry checking
    pub certificate: CertificateCheckConfig,

    /// Downstream dependencies probed one hop deep
    pub dependencies: Vec<DependencyConfig>,

    /// Shared TTL cache sizing
    pub cache: CacheConfig,
}

impl VitalsConfig {
    /// Validate cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        // The encoded access string must decode; surfacing this at load time
        // beats a panic at the first routing decision.
        endpoint_access::decode(&self.endpoint_access.encoded)?;

        for dependency in &self.dependencies {
            url::Url::parse(&dependency.url).map_err(|e| VitalsError::InvalidUrl {
                url: dependency.url.clone(),
                message: e.to_string(),
            })?;
            if dependency.name.trim().is_empty() {
                return Err(VitalsError::configuration(
                    "dependencies",
                    format!("dependency with url '{}' has an empty name", dependency.url),
                ));
            }
        }

        if self.certificate.expiry_unhealthy_limit_days > self.certificate.expiry_degraded_limit_days
        {
            return Err(VitalsError::configuration(
                "certificate",
                "expiry_unhealthy_limit_days must not exceed expiry_degraded_limit_days",
            ));
        }

        Ok(())
    }
}

/// Endpoint exposure configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointAccessConfig {
    /// Seven base-36 digits, one per endpoint in fixed order
    pub encoded: String,
}

impl Default for EndpointAccessConfig {
    fn default() -> Self {
        Self {
            encoded: DEFAULT_ACCESS_STRING.to_string(),
        }
    }
}

impl EndpointAccessConfig {
    pub fn decode(&self) -> Result<EndpointAccessMap> {
        endpoint_access::decode(&self.encoded)
    }
}

/// How much of a failing check's error text is emitted in health details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionDetailLevel {
    /// Fixed placeholder plus correlation reference only
    Hidden,
    /// The error's message, nothing more
    Message,
    /// Message plus the error's source chain
    StackTrace,
}

impl ExceptionDetailLevel {
    /// Default level for a deployment environment when none is configured.
    pub fn for_environment(environment: &str) -> Self {
        match environment {
            "production" => ExceptionDetailLevel::Hidden,
            "development" => ExceptionDetailLevel::StackTrace,
            _ => ExceptionDetailLevel::Message,
        }
    }
}

/// Exception detail configuration; unset defers to the environment default.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExceptionDetailConfig {
    pub level: Option<ExceptionDetailLevel>,
}

impl ExceptionDetailConfig {
    pub fn effective_level(&self, environment: &str) -> ExceptionDetailLevel {
        self.level
            .unwrap_or_else(|| ExceptionDetailLevel::for_environment(environment))
    }
}

/// Certificate expiry checking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificateCheckConfig {
    /// Merge a certificate component into each dependency probe
    pub dependency_check_enabled: bool,
    /// Probe the service's own certificate
    pub self_check_enabled: bool,
    /// URL whose certificate the self check inspects
    pub self_check_url: Option<String>,
    /// Days of validity at or under which the certificate is Degraded
    pub expiry_degraded_limit_days: i64,
    /// Days of validity at or under which the certificate is Unhealthy
    pub expiry_unhealthy_limit_days: i64,
}

impl Default for CertificateCheckConfig {
    fn default() -> Self {
        Self {
            dependency_check_enabled: true,
            self_check_enabled: true,
            self_check_url: None,
            expiry_degraded_limit_days: 30,
            expiry_unhealthy_limit_days: 3,
        }
    }
}

/// One downstream dependency, registered at startup and read-only after.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub essential: bool,
    pub url: String,
}

fn default_true() -> bool {
    true
}

/// Shared TTL cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policy() {
        let config = VitalsConfig::default();
        assert_eq!(config.endpoint_access.encoded, "6666644");
        assert!(config.certificate.dependency_check_enabled);
        assert!(config.certificate.self_check_enabled);
        assert_eq!(config.certificate.expiry_degraded_limit_days, 30);
        assert_eq!(config.certificate.expiry_unhealthy_limit_days, 3);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert!(config.dependencies.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn exception_detail_defaults_by_environment() {
        assert_eq!(
            ExceptionDetailLevel::for_environment("production"),
            ExceptionDetailLevel::Hidden
        );
        assert_eq!(
            ExceptionDetailLevel::for_environment("development"),
            ExceptionDetailLevel::StackTrace
        );
        assert_eq!(
            ExceptionDetailLevel::for_environment("staging"),
            ExceptionDetailLevel::Message
        );

        let configured = ExceptionDetailConfig {
            level: Some(ExceptionDetailLevel::Hidden),
        };
        assert_eq!(
            configured.effective_level("development"),
            ExceptionDetailLevel::Hidden
        );
    }

    #[test]
    fn validation_rejects_bad_access_strings() {
        let config = VitalsConfig {
            endpoint_access: EndpointAccessConfig {
                encoded: "7".to_string(),
            },
            ..VitalsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_malformed_dependency_urls() {
        let config = VitalsConfig {
            dependencies: vec![DependencyConfig {
                name: "billing".to_string(),
                essential: true,
                url: "not a url".to_string(),
            }],
            ..VitalsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VitalsError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn validation_rejects_inverted_expiry_limits() {
        let config = VitalsConfig {
            certificate: CertificateCheckConfig {
                expiry_degraded_limit_days: 2,
                expiry_unhealthy_limit_days: 10,
                ..CertificateCheckConfig::default()
            },
            ..VitalsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn dependency_essential_defaults_to_true() {
        let dependency: DependencyConfig =
            serde_yaml::from_str("name: billing\nurl: https://billing.internal").unwrap();
        assert!(dependency.essential);
    }
}
