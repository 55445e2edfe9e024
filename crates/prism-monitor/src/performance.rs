//! Per-model performance counters
//!
//! Adapters report every completion attempt; counters are commutative
//! atomic increments, so updates are lock-free and snapshots are
//! eventually consistent. Counters never shrink on their own; operators
//! trigger resets.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use prism_config::PerformanceOptions;
use prism_core::{AlertKind, AlertSink};

/// Copy-on-read snapshot of a model's observed performance
#[derive(Debug, Clone)]
pub struct ModelPerformance {
    /// Canonical model id
    pub model: String,
    /// Attempts observed
    pub request_count: u64,
    /// Attempts that succeeded
    pub success_count: u64,
    /// Attempts that failed
    pub failure_count: u64,
    /// Sum of attempt latencies in milliseconds
    pub total_latency_ms: u64,
    /// Unix timestamp (seconds) of the most recent attempt
    pub last_seen: u64,
}

impl ModelPerformance {
    /// Average attempt latency, when any attempt has been observed
    pub fn average_latency_ms(&self) -> Option<f64> {
        if self.request_count == 0 {
            return None;
        }
        Some(self.total_latency_ms as f64 / self.request_count as f64)
    }

    /// Fraction of attempts that succeeded, when any has been observed
    pub fn success_rate(&self) -> Option<f64> {
        if self.request_count == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.request_count as f64)
    }
}

/// Live counters for one model
struct ModelCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    latency_ms_total: AtomicU64,
    last_seen: AtomicU64,
    /// Latch ensuring one degradation alert per threshold crossing
    degraded: AtomicBool,
}

impl ModelCounters {
    fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency_ms_total: AtomicU64::new(0),
            last_seen: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    fn snapshot(&self, model: &str) -> ModelPerformance {
        ModelPerformance {
            model: model.to_owned(),
            request_count: self.requests.load(Ordering::Relaxed),
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            total_latency_ms: self.latency_ms_total.load(Ordering::Relaxed),
            last_seen: self.last_seen.load(Ordering::Relaxed),
        }
    }
}

/// Track per-model success and latency across all providers
pub struct PerformanceMonitor {
    models: DashMap<String, ModelCounters>,
    options: PerformanceOptions,
    alerts: Option<Arc<dyn AlertSink>>,
}

impl PerformanceMonitor {
    /// Create a monitor that emits degradation alerts to the given sink
    pub fn new(options: PerformanceOptions, alerts: Option<Arc<dyn AlertSink>>) -> Self {
        Self {
            models: DashMap::new(),
            options,
            alerts,
        }
    }

    /// Record the outcome of one completion attempt
    pub fn record(&self, model: &str, success: bool, latency: Duration) {
        let entry = self.models.entry(model.to_owned()).or_insert_with(ModelCounters::new);

        entry.requests.fetch_add(1, Ordering::Relaxed);
        if success {
            entry.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            entry.failures.fetch_add(1, Ordering::Relaxed);
        }
        entry
            .latency_ms_total
            .fetch_add(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX), Ordering::Relaxed);
        entry.last_seen.store(now_secs(), Ordering::Relaxed);

        let snapshot = entry.snapshot(model);
        let degraded = &entry.degraded;

        if snapshot.request_count < self.options.min_samples {
            return;
        }

        let breached = snapshot.success_rate().is_some_and(|r| r < self.options.min_success_rate)
            || snapshot
                .average_latency_ms()
                .is_some_and(|l| l > self.options.max_average_latency_ms);

        if breached {
            // One alert per crossing; the latch resets when metrics recover
            if !degraded.swap(true, Ordering::Relaxed) {
                drop(entry);
                self.emit_degradation_alert(&snapshot);
            }
        } else {
            degraded.store(false, Ordering::Relaxed);
        }
    }

    /// Snapshot one model's counters
    pub fn get_metrics(&self, model: &str) -> Option<ModelPerformance> {
        self.models.get(model).map(|entry| entry.snapshot(model))
    }

    /// Snapshot every tracked model
    pub fn get_all_metrics(&self) -> Vec<ModelPerformance> {
        self.models
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect()
    }

    /// Clear one model's counters (operator action)
    pub fn reset(&self, model: &str) {
        self.models.remove(model);
    }

    /// Clear every counter (operator action)
    pub fn reset_all(&self) {
        self.models.clear();
    }

    fn emit_degradation_alert(&self, snapshot: &ModelPerformance) {
        tracing::warn!(
            model = %snapshot.model,
            success_rate = ?snapshot.success_rate(),
            average_latency_ms = ?snapshot.average_latency_ms(),
            "model performance degraded"
        );

        let Some(alerts) = self.alerts.clone() else {
            return;
        };

        let payload = serde_json::json!({
            "model": snapshot.model,
            "request_count": snapshot.request_count,
            "success_rate": snapshot.success_rate(),
            "average_latency_ms": snapshot.average_latency_ms(),
        });

        tokio::spawn(async move {
            alerts.send(AlertKind::ModelPerformance, payload).await;
        });
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;

    fn test_options() -> PerformanceOptions {
        PerformanceOptions {
            min_success_rate: 0.8,
            max_average_latency_ms: 10_000.0,
            min_samples: 10,
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<AlertKind>);

    #[async_trait]
    impl AlertSink for ChannelSink {
        async fn send(&self, kind: AlertKind, _payload: serde_json::Value) {
            self.0.send(kind).ok();
        }
    }

    #[test]
    fn counters_accumulate() {
        let monitor = PerformanceMonitor::new(test_options(), None);

        monitor.record("openai.gpt-4", true, Duration::from_millis(400));
        monitor.record("openai.gpt-4", true, Duration::from_millis(600));
        monitor.record("openai.gpt-4", false, Duration::from_millis(200));

        let metrics = monitor.get_metrics("openai.gpt-4").unwrap();
        assert_eq!(metrics.request_count, 3);
        assert_eq!(metrics.success_count, 2);
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.total_latency_ms, 1200);
        assert!((metrics.average_latency_ms().unwrap() - 400.0).abs() < f64::EPSILON);
        assert!((metrics.success_rate().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!(metrics.last_seen > 0);
    }

    #[test]
    fn invariant_success_plus_failure_never_exceeds_requests() {
        let monitor = PerformanceMonitor::new(test_options(), None);
        for i in 0..25 {
            monitor.record("m", i % 3 != 0, Duration::from_millis(10));
        }
        let m = monitor.get_metrics("m").unwrap();
        assert!(m.success_count + m.failure_count <= m.request_count);
        assert_eq!(m.success_count + m.failure_count, 25);
    }

    #[test]
    fn unknown_model_has_no_metrics() {
        let monitor = PerformanceMonitor::new(test_options(), None);
        assert!(monitor.get_metrics("nope").is_none());
    }

    #[test]
    fn reset_clears_counters() {
        let monitor = PerformanceMonitor::new(test_options(), None);
        monitor.record("m", true, Duration::from_millis(10));
        monitor.reset("m");
        assert!(monitor.get_metrics("m").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn degradation_alert_fires_once_per_crossing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = PerformanceMonitor::new(test_options(), Some(Arc::new(ChannelSink(tx))));

        // 10 failures: crosses the success-rate floor at the sample minimum
        for _ in 0..10 {
            monitor.record("m", false, Duration::from_millis(10));
        }
        // Further failures while still degraded must not re-alert
        for _ in 0..5 {
            monitor.record("m", false, Duration::from_millis(10));
        }

        let kind = rx.recv().await.unwrap();
        assert_eq!(kind, AlertKind::ModelPerformance);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn all_metrics_lists_every_model() {
        let monitor = PerformanceMonitor::new(test_options(), None);
        monitor.record("a", true, Duration::from_millis(1));
        monitor.record("b", true, Duration::from_millis(1));
        let mut models: Vec<String> = monitor.get_all_metrics().into_iter().map(|m| m.model).collect();
        models.sort();
        assert_eq!(models, vec!["a", "b"]);
    }
}
