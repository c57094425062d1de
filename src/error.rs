//! # Error Types
//!
//! Structured error handling for the vitals core using thiserror
//! instead of `Box<dyn Error>` patterns. User-supplied check functions
//! report their own failures as `anyhow::Error`; everything the crate
//! itself can fail with is a [`VitalsError`].

use thiserror::Error;

/// Errors produced by the vitals core.
#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Component '{name}' is already registered")]
    DuplicateComponent { name: String },

    #[error("Component source {type_name} is already registered")]
    DuplicateComponentSource { type_name: String },

    #[error("Invalid encoded access string: {reason}")]
    InvalidAccessEncoding { reason: String },

    #[error("No access flag combination matches get={get} head={head} visible={visible}")]
    InvalidAccessCombination {
        get: bool,
        head: bool,
        visible: bool,
    },

    #[error("Status reduction requires at least one operand")]
    EmptyStatusReduction,

    #[error("Dependency '{name}' rejected the probe with 401 Unauthorized: {url}")]
    DependencyUnauthorized { name: String, url: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Certificate probe failed for {host}: {message}")]
    CertificateProbe { host: String, message: String },
}

impl VitalsError {
    /// Shorthand for configuration failures, the one variant constructed
    /// from many call sites.
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        VitalsError::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VitalsError>;
