//! # Component Checks
//!
//! The immutable record pairing a component's name and essential flag with a
//! single async check capability. No inheritance hierarchy: a component is
//! data plus one function.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Name used when a component registers without one.
pub const DEFAULT_COMPONENT_NAME: &str = "Component";

/// Outcome of one check invocation. Produced once; never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CheckResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Context handed to every check invocation.
#[derive(Clone, Default)]
pub struct CheckContext {
    /// Cancellation signal threaded from the aggregation call. Checks that
    /// suspend on I/O should select against it.
    pub cancel: CancellationToken,
}

impl CheckContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

pub type CheckFuture = BoxFuture<'static, anyhow::Result<CheckResult>>;
pub type CheckFn = Arc<dyn Fn(CheckContext) -> CheckFuture + Send + Sync>;

/// One registered health check. Immutable once registered.
#[derive(Clone)]
pub struct Component {
    name: String,
    essential: bool,
    check: CheckFn,
}

impl Component {
    /// Create an essential component. An empty name defaults to
    /// [`DEFAULT_COMPONENT_NAME`] when results are finalized.
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<CheckResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            essential: true,
            check: Arc::new(move |ctx| Box::pin(check(ctx))),
        }
    }

    /// Mark the component non-essential: its failure degrades the service
    /// instead of taking it down.
    pub fn non_essential(mut self) -> Self {
        self.essential = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name results are reported under.
    pub fn effective_name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_COMPONENT_NAME
        } else {
            &self.name
        }
    }

    pub fn essential(&self) -> bool {
        self.essential
    }

    pub(crate) fn check_fn(&self) -> CheckFn {
        Arc::clone(&self.check)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("essential", &self.essential)
            .finish_non_exhaustive()
    }
}

/// Produces components at aggregation time, resolved per call.
///
/// Sources cover components that only exist dynamically - one per tenant,
/// one per configured queue - where a static registration cannot. A source
/// may yield zero, one, or many components, including several under the
/// same name.
pub trait ComponentSource: Send + Sync {
    fn components(&self) -> Vec<Component>;
}
