//! Metrics simulator: a built-in producer that publishes synthetic
//! samples for managed services.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{EventKind, ServiceMetrics};
use crate::hub::Hub;

/// Runs one sampling task per service id.
///
/// Each task ticks every `interval` and publishes a
/// [`ServiceMetrics`] sample as a [`EventKind::Metrics`] envelope.
#[derive(Debug)]
pub struct MetricsSimulator {
    hub: Hub,
    interval: Duration,
    running: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl MetricsSimulator {
    /// Creates a simulator publishing through `hub`. A zero interval is
    /// raised to one millisecond.
    #[must_use]
    pub fn new(hub: Hub, interval: Duration) -> Self {
        Self {
            hub,
            interval: interval.max(Duration::from_millis(1)),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Period between samples.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts sampling `service_id`, replacing any simulator already
    /// running for it.
    pub async fn start(&self, service_id: &str) {
        let task = tokio::spawn(run(self.hub.clone(), service_id.to_string(), self.interval));
        let replaced = self
            .running
            .lock()
            .await
            .insert(service_id.to_string(), task);
        let restarted = replaced.is_some();
        if let Some(old) = replaced {
            old.abort();
        }
        tracing::info!(service_id, restarted, "metrics simulator started");
    }

    /// Stops sampling `service_id`. Returns `false` if nothing was running.
    pub async fn stop(&self, service_id: &str) -> bool {
        let Some(task) = self.running.lock().await.remove(service_id) else {
            return false;
        };
        task.abort();
        tracing::info!(service_id, "metrics simulator stopped");
        true
    }

    /// Stops every simulator.
    pub async fn stop_all(&self) {
        let mut running = self.running.lock().await;
        for (_, task) in running.drain() {
            task.abort();
        }
    }

    /// Service ids with a running simulator, sorted.
    pub async fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.running.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for MetricsSimulator {
    fn drop(&mut self) {
        for (_, task) in self.running.get_mut().drain() {
            task.abort();
        }
    }
}

async fn run(hub: Hub, service_id: String, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let sample = ServiceMetrics::sample(&service_id);
        if let Err(err) = hub.publish_json(EventKind::Metrics, &sample).await {
            tracing::warn!(service_id = %service_id, error = %err, "failed to publish metrics sample");
        }
    }
}
