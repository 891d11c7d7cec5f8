//! In-process request and health-check counters, served at `GET /metrics`.

use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;

use bug_triage_core::triage::{OutcomeStatus, RequestOutcome, TriageObserver};

#[derive(Default)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    validation_failures: u64,
    total_bugs: u64,
    total_duration_secs: f64,
    max_duration_secs: f64,
    warning_events: u64,
    last_request_at: Option<chrono::DateTime<chrono::Utc>>,
    health_checks: u64,
    healthy_health_checks: u64,
    last_health_status: Option<String>,
    last_health_check_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Thread-safe metrics collector. Install it as the service's observer.
pub struct MetricsCollector {
    started: Instant,
    counters: Mutex<Counters>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Totals {
    pub requests: u64,
    pub bugs_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub validation_failures: u64,
    pub warning_events: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Latency {
    pub average: f64,
    pub max: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Rates {
    pub success_rate: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HealthChecks {
    pub invocations: u64,
    pub healthy_rate: f64,
    pub last_status: String,
    pub last_checked_at: Option<String>,
}

/// Point-in-time view of the counters.
#[derive(Debug, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub totals: Totals,
    pub latency_ms: Latency,
    pub rates: Rates,
    pub health_checks: HealthChecks,
    pub last_request_at: Option<String>,
    pub uptime_seconds: f64,
}

fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn format_ts(ts: Option<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    ts.map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record_health_check(&self, status: &str) {
        let Ok(mut c) = self.counters.lock() else {
            return;
        };
        c.health_checks += 1;
        if status == "healthy" {
            c.healthy_health_checks += 1;
        }
        c.last_health_status = Some(status.to_string());
        c.last_health_check_at = Some(chrono::Utc::now());
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = round_to(self.uptime_seconds(), 2);
        let c = match self.counters.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        let average = if c.total_requests == 0 {
            0.0
        } else {
            c.total_duration_secs / c.total_requests as f64
        };
        MetricsSnapshot {
            totals: Totals {
                requests: c.total_requests,
                bugs_processed: c.total_bugs,
                successful: c.successful_requests,
                failed: c.failed_requests,
                validation_failures: c.validation_failures,
                warning_events: c.warning_events,
            },
            latency_ms: Latency {
                average: round_to(average * 1000.0, 2),
                max: round_to(c.max_duration_secs * 1000.0, 2),
            },
            rates: Rates {
                success_rate: round_to(ratio(c.successful_requests, c.total_requests), 3),
            },
            health_checks: HealthChecks {
                invocations: c.health_checks,
                healthy_rate: round_to(ratio(c.healthy_health_checks, c.health_checks), 3),
                last_status: c
                    .last_health_status
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                last_checked_at: format_ts(c.last_health_check_at),
            },
            last_request_at: format_ts(c.last_request_at),
            uptime_seconds: uptime,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageObserver for MetricsCollector {
    fn record_request(&self, outcome: &RequestOutcome) {
        let Ok(mut c) = self.counters.lock() else {
            return;
        };
        let secs = outcome.duration.as_secs_f64();
        c.total_requests += 1;
        c.total_bugs += outcome.bug_count as u64;
        c.total_duration_secs += secs;
        c.max_duration_secs = c.max_duration_secs.max(secs);
        c.warning_events += outcome.warning_count as u64;
        c.last_request_at = Some(chrono::Utc::now());
        match outcome.status {
            OutcomeStatus::Completed => c.successful_requests += 1,
            OutcomeStatus::FailedValidation => {
                c.validation_failures += 1;
                c.failed_requests += 1;
            }
            OutcomeStatus::Error => c.failed_requests += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(status: OutcomeStatus, millis: u64, bugs: usize, warnings: usize) -> RequestOutcome {
        RequestOutcome {
            duration: Duration::from_millis(millis),
            bug_count: bugs,
            status,
            warning_count: warnings,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let m = MetricsCollector::new();
        let s = m.snapshot();
        assert_eq!(s.totals.requests, 0);
        assert_eq!(s.rates.success_rate, 0.0);
        assert_eq!(s.health_checks.last_status, "unknown");
        assert!(s.last_request_at.is_none());
    }

    #[test]
    fn test_request_accounting() {
        let m = MetricsCollector::new();
        m.record_request(&outcome(OutcomeStatus::Completed, 10, 2, 1));
        m.record_request(&outcome(OutcomeStatus::FailedValidation, 30, 1, 0));
        m.record_request(&outcome(OutcomeStatus::Error, 20, 3, 0));

        let s = m.snapshot();
        assert_eq!(
            s.totals,
            Totals {
                requests: 3,
                bugs_processed: 6,
                successful: 1,
                failed: 2,
                validation_failures: 1,
                warning_events: 1,
            }
        );
        assert_eq!(s.latency_ms.average, 20.0);
        assert_eq!(s.latency_ms.max, 30.0);
        assert_eq!(s.rates.success_rate, 0.333);
        assert!(s.last_request_at.is_some());
    }

    #[test]
    fn test_health_check_rate() {
        let m = MetricsCollector::new();
        m.record_health_check("healthy");
        m.record_health_check("degraded");
        let s = m.snapshot();
        assert_eq!(s.health_checks.invocations, 2);
        assert_eq!(s.health_checks.healthy_rate, 0.5);
        assert_eq!(s.health_checks.last_status, "degraded");
    }
}
