//! Metrics sample published for a managed service.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

/// One metrics sample for a service, broadcast as a
/// [`super::EventKind::Metrics`] payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceMetrics {
    /// Service the sample belongs to.
    pub service_id: String,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// CPU usage in percent.
    pub cpu_usage: f64,
    /// Resident memory in MB.
    pub memory_usage: f64,
    /// Requests served during the sample interval.
    pub request_count: i64,
    /// Error rate in percent.
    pub error_rate: f64,
    /// 95th percentile latency in milliseconds.
    pub p95_latency: f64,
}

impl ServiceMetrics {
    /// Generates a plausible random sample for `service_id`.
    #[must_use]
    pub fn sample(service_id: &str) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            service_id: service_id.to_string(),
            timestamp: Utc::now(),
            cpu_usage: rng.gen_range(0.0..80.0),
            memory_usage: rng.gen_range(100.0..600.0),
            request_count: rng.gen_range(0..1000),
            error_rate: rng.gen_range(0.0..5.0),
            p95_latency: rng.gen_range(50.0..250.0),
        }
    }
}
