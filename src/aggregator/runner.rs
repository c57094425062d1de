//! # Component Check Runner
//!
//! Times and isolates one check invocation. A check's failure - an error
//! return or a panic - is converted into a failing health component with a
//! correlation id and never propagated; how much of the error text reaches
//! the details map is governed by the configured exception detail level.

use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

use crate::aggregator::component::{CheckContext, Component};
use crate::config::ExceptionDetailLevel;
use crate::report::HealthComponent;
use crate::status::HealthStatus;

/// Run one component check to completion and report its health.
pub async fn run_check(
    component: Component,
    ctx: CheckContext,
    detail_level: ExceptionDetailLevel,
) -> (String, Duration, HealthComponent) {
    let name = component.effective_name().to_string();
    let essential = component.essential();
    let check = component.check_fn();

    let start = Instant::now();
    let outcome = std::panic::AssertUnwindSafe(check(ctx)).catch_unwind().await;
    let elapsed = start.elapsed();

    let health = match outcome {
        Ok(Ok(result)) => {
            let status = if result.success {
                HealthStatus::Healthy
            } else if essential {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Degraded
            };
            debug!(
                component = %name,
                status = %status,
                duration_ms = elapsed.as_millis() as u64,
                "Component check completed"
            );
            let mut health = HealthComponent::new(status)
                .with_detail("duration_ms", elapsed.as_millis().to_string());
            if let Some(message) = result.message {
                health = health.with_detail("message", message);
            }
            health
        }
        Ok(Err(err)) => failing_component(&name, essential, &err, elapsed, detail_level),
        Err(panic) => {
            let err = anyhow::anyhow!("check panicked: {}", panic_message(panic));
            failing_component(&name, essential, &err, elapsed, detail_level)
        }
    };

    (name, elapsed, health)
}

fn failing_component(
    name: &str,
    essential: bool,
    err: &anyhow::Error,
    elapsed: Duration,
    detail_level: ExceptionDetailLevel,
) -> HealthComponent {
    let status = if essential {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    };

    let correlation_id = Uuid::new_v4();
    error!(
        component = %name,
        correlation_id = %correlation_id,
        error = %err,
        "Component check failed"
    );

    // Exactly one detail shape, chosen by level.
    let error_detail = match detail_level {
        ExceptionDetailLevel::Hidden => format!("Check failed. Reference: {correlation_id}"),
        ExceptionDetailLevel::Message => format!("Check failed: {err}"),
        ExceptionDetailLevel::StackTrace => format!("Check failed: {err:?}"),
    };

    HealthComponent::new(status)
        .with_detail("duration_ms", elapsed.as_millis().to_string())
        .with_detail("correlation_id", correlation_id.to_string())
        .with_detail("error", error_detail)
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::component::CheckResult;

    fn ctx() -> CheckContext {
        CheckContext::default()
    }

    #[tokio::test]
    async fn succeeding_component_is_healthy_regardless_of_essential() {
        let component = Component::new("db", |_| async { Ok(CheckResult::ok()) });
        let (name, _, health) =
            run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(name, "db");
        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.details.contains_key("duration_ms"));

        let component =
            Component::new("db", |_| async { Ok(CheckResult::ok()) }).non_essential();
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn failing_result_maps_essential_to_unhealthy() {
        let component =
            Component::new("db", |_| async { Ok(CheckResult::failed("no connection")) });
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.details["message"], "no connection");

        let component = Component::new("db", |_| async {
            Ok(CheckResult::failed("no connection"))
        })
        .non_essential();
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn erroring_check_is_captured_not_propagated() {
        let component = Component::new("queue", |_| async {
            anyhow::bail!("broker unreachable")
        });
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.details["error"].contains("broker unreachable"));
        assert!(health.details.contains_key("correlation_id"));
    }

    #[tokio::test]
    async fn panicking_check_is_captured_not_propagated() {
        let component = Component::new("queue", |_| async { panic!("boom") });
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.details["error"].contains("boom"));
    }

    #[tokio::test]
    async fn hidden_level_redacts_everything_but_the_reference() {
        let component = Component::new("queue", |_| async {
            anyhow::bail!("secret connection string")
        });
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Hidden).await;
        let error = &health.details["error"];
        assert!(!error.contains("secret connection string"));
        assert!(error.contains("Reference:"));
        assert!(error.contains(&health.details["correlation_id"]));
    }

    #[tokio::test]
    async fn message_level_emits_the_message_but_not_the_chain() {
        let component = Component::new("queue", |_| async {
            Err(anyhow::anyhow!("socket reset").context("broker unreachable"))
        });
        let (_, _, health) = run_check(component, ctx(), ExceptionDetailLevel::Message).await;
        let error = &health.details["error"];
        assert!(error.contains("broker unreachable"));
        assert!(!error.contains("socket reset"));
    }

    #[tokio::test]
    async fn stack_trace_level_emits_message_and_chain() {
        let component = Component::new("queue", |_| async {
            Err(anyhow::anyhow!("socket reset").context("broker unreachable"))
        });
        let (_, _, health) =
            run_check(component, ctx(), ExceptionDetailLevel::StackTrace).await;
        let error = &health.details["error"];
        assert!(error.contains("broker unreachable"));
        assert!(error.contains("socket reset"));
    }
}
