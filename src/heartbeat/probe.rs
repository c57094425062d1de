//! # Heartbeat Probe
//!
//! One background task's pulse log and the statistics-driven liveness
//! classification computed from it. The owning task is the only writer;
//! health queries may come from any task, so the mutable state sits behind a
//! mutex and health works on a snapshot.

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::report::HealthComponent;
use crate::status::HealthStatus;

/// Planned-interval fallback thresholds used while fewer than two pulses
/// have been recorded.
const PLANNED_HEALTHY_FACTOR: f64 = 1.2;
const PLANNED_DEGRADED_FACTOR: f64 = 1.8;

struct ProbeState {
    /// Baseline the pulse log measures from; reset by the first pulse.
    origin: Instant,
    /// Elapsed time of each pulse since the baseline, in registration order.
    pulses: Vec<Duration>,
    ended: bool,
    last_error: Option<String>,
}

/// Liveness probe for one background task.
pub struct HeartbeatProbe {
    identity: String,
    planned_interval: Option<Duration>,
    auto_max_interval: bool,
    state: Mutex<ProbeState>,
}

impl HeartbeatProbe {
    /// Create a probe. `planned_interval` is the task's own cadence promise;
    /// `auto_max_interval` additionally accepts any gap no longer than the
    /// longest gap seen so far.
    pub fn register(
        identity: impl Into<String>,
        planned_interval: Option<Duration>,
        auto_max_interval: bool,
    ) -> Self {
        Self {
            identity: identity.into(),
            planned_interval,
            auto_max_interval,
            state: Mutex::new(ProbeState {
                origin: Instant::now(),
                pulses: Vec::new(),
                ended: false,
                last_error: None,
            }),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Record one pulse.
    ///
    /// The first pulse resets the measurement baseline, so the log always
    /// starts at zero regardless of how long registration preceded the
    /// task's first work cycle. A pulse also clears any ended state and
    /// recorded error: a task that resumes pulsing is alive again.
    pub fn pulse(&self) {
        let mut state = self.state.lock();
        if state.pulses.is_empty() {
            state.origin = Instant::now();
        }
        let elapsed = state.origin.elapsed();
        state.pulses.push(elapsed);
        state.ended = false;
        state.last_error = None;
    }

    /// Mark the task as ended cleanly.
    pub fn end_service_ok(&self) {
        let mut state = self.state.lock();
        state.ended = true;
        state.last_error = None;
    }

    /// Mark the task as ended by a failure.
    pub fn end_service_err(&self, error: impl Into<String>) {
        let mut state = self.state.lock();
        state.ended = true;
        state.last_error = Some(error.into());
    }

    /// Classify the task's liveness from the pulse log.
    pub fn health(&self) -> HealthComponent {
        let (pulses, ended, last_error, elapsed_since_origin) = {
            let state = self.state.lock();
            (
                state.pulses.clone(),
                state.ended,
                state.last_error.clone(),
                state.origin.elapsed(),
            )
        };

        if ended {
            return match last_error {
                None => HealthComponent::new(HealthStatus::Healthy)
                    .with_detail("message", "Ended successfully.")
                    .with_detail("pulse_count", pulses.len().to_string()),
                Some(error) => HealthComponent::new(HealthStatus::Unhealthy)
                    .with_detail("message", format!("Ended with error: {error}"))
                    .with_detail("pulse_count", pulses.len().to_string()),
            };
        }

        let elapsed_since_last_ms = match pulses.last() {
            Some(last) => duration_ms(elapsed_since_origin) - duration_ms(*last),
            None => duration_ms(elapsed_since_origin),
        };

        if pulses.len() < 2 {
            return self.planned_interval_health(pulses.len(), elapsed_since_last_ms);
        }

        self.statistical_health(&pulses, elapsed_since_last_ms)
    }

    /// Fallback used while the log is too short for statistics.
    fn planned_interval_health(&self, pulse_count: usize, elapsed_ms: f64) -> HealthComponent {
        let Some(planned) = self.planned_interval else {
            return HealthComponent::new(HealthStatus::Healthy)
                .with_detail(
                    "message",
                    "Insufficient pulse data; no planned interval configured.",
                )
                .with_detail("pulse_count", pulse_count.to_string());
        };

        let planned_ms = duration_ms(planned);
        let (status, message) = if elapsed_ms <= planned_ms * PLANNED_HEALTHY_FACTOR {
            (
                HealthStatus::Healthy,
                format!("Within {PLANNED_HEALTHY_FACTOR}x of the planned interval."),
            )
        } else if elapsed_ms <= planned_ms * PLANNED_DEGRADED_FACTOR {
            (
                HealthStatus::Degraded,
                format!("Beyond {PLANNED_HEALTHY_FACTOR}x of the planned interval."),
            )
        } else {
            (
                HealthStatus::Unhealthy,
                format!("Beyond {PLANNED_DEGRADED_FACTOR}x of the planned interval."),
            )
        };

        HealthComponent::new(status)
            .with_detail("message", message)
            .with_detail("planned_interval_ms", format_ms(planned_ms))
            .with_detail("time_since_last_pulse_ms", format_ms(elapsed_ms))
            .with_detail("pulse_count", pulse_count.to_string())
    }

    /// Full statistical classification once at least two pulses exist.
    fn statistical_health(&self, pulses: &[Duration], elapsed_since_last_ms: f64) -> HealthComponent {
        let intervals: Vec<f64> = pulses
            .windows(2)
            .map(|pair| duration_ms(pair[1]) - duration_ms(pair[0]))
            .collect();
        let avg = intervals.iter().sum::<f64>() / intervals.len() as f64;
        // Population variance: the log is the whole population, not a sample.
        let variance = intervals
            .iter()
            .map(|interval| (interval - avg).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        let stddev = variance.sqrt();
        let max_interval = intervals.iter().copied().fold(f64::MIN, f64::max);

        let (status, message) = if self
            .planned_interval
            .is_some_and(|planned| elapsed_since_last_ms < duration_ms(planned))
        {
            (
                HealthStatus::Healthy,
                "Has not reached the planned interval.".to_string(),
            )
        } else if self.auto_max_interval && elapsed_since_last_ms < max_interval {
            (
                HealthStatus::Healthy,
                "Has not reached the maximum observed interval.".to_string(),
            )
        } else if elapsed_since_last_ms <= avg + 2.0 * stddev {
            (
                HealthStatus::Healthy,
                "Within two standard deviations of the average interval.".to_string(),
            )
        } else if elapsed_since_last_ms <= avg + 4.0 * stddev {
            (
                HealthStatus::Degraded,
                "Between two and four standard deviations of the average interval.".to_string(),
            )
        } else {
            (
                HealthStatus::Unhealthy,
                "Beyond four standard deviations of the average interval.".to_string(),
            )
        };

        let next_expected = Utc::now() + chrono::Duration::milliseconds(avg as i64);

        HealthComponent::new(status)
            .with_detail("message", message)
            .with_detail("average_frequency_hz", format_ms(1000.0 / avg))
            .with_detail("average_interval_ms", format_ms(avg))
            .with_detail("max_interval_ms", format_ms(max_interval))
            .with_detail("standard_deviation_ms", format_ms(stddev))
            .with_detail("time_since_last_pulse_ms", format_ms(elapsed_since_last_ms))
            .with_detail("next_expected_pulse", next_expected.to_rfc3339())
            .with_detail("pulse_count", pulses.len().to_string())
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn format_ms(value: f64) -> String {
    format!("{value:.2}")
}
