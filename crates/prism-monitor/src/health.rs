//! Periodic provider health probing
//!
//! Each registered provider is probed on a fixed cadence. Consecutive
//! failures are counted per provider and exactly one alert is emitted per
//! contiguous failure run that reaches the configured threshold; the
//! counter and the alert latch reset on the next success.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use prism_config::HealthOptions;
use prism_core::{AlertKind, AlertSink, HealthRecord, PersistenceSink};
use tokio_util::sync::CancellationToken;

/// Result of a single availability probe
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Whether the provider answered successfully
    pub available: bool,
    /// Probe round-trip time
    pub latency: Duration,
    /// Error description when the probe failed
    pub error: Option<String>,
}

/// A probeable provider, as seen by the health monitor
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Issue one cheap authenticated request
    async fn probe(&self) -> ProbeOutcome;
}

/// Point-in-time health of one provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Provider name
    pub provider: String,
    /// Whether the latest probe succeeded
    pub is_available: bool,
    /// Unix timestamp (seconds) of the latest probe
    pub last_probe: u64,
    /// Length of the current failure run
    pub consecutive_failures: u32,
}

/// Live probe state for one provider
struct ProviderState {
    available: AtomicBool,
    last_probe: AtomicU64,
    consecutive_failures: AtomicU32,
    /// Latch ensuring one alert per contiguous failure run
    alerted: AtomicBool,
}

impl ProviderState {
    fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            last_probe: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            alerted: AtomicBool::new(false),
        }
    }
}

/// Background health monitor over a fixed set of providers
pub struct HealthMonitor {
    probes: Vec<Arc<dyn HealthProbe>>,
    options: HealthOptions,
    alerts: Option<Arc<dyn AlertSink>>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    state: DashMap<String, ProviderState>,
    running: AtomicBool,
    cancel: CancellationToken,
}

impl HealthMonitor {
    /// Create a monitor; no probing starts until [`Self::start`]
    pub fn new(
        probes: Vec<Arc<dyn HealthProbe>>,
        options: HealthOptions,
        alerts: Option<Arc<dyn AlertSink>>,
        persistence: Option<Arc<dyn PersistenceSink>>,
    ) -> Self {
        Self {
            probes,
            options,
            alerts,
            persistence,
            state: DashMap::new(),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the probe loop; calling again while running is a no-op
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let interval = Duration::from_secs(monitor.options.check_interval_minutes * 60);
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.probe_round().await,
                    () = monitor.cancel.cancelled() => break,
                }
            }

            tracing::debug!("health monitor stopped");
        });
    }

    /// Stop the probe loop; idempotent, takes effect within one interval
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Whether a provider is currently considered available
    ///
    /// Providers never probed yet are assumed available.
    pub fn is_available(&self, provider: &str) -> bool {
        self.state
            .get(provider)
            .is_none_or(|s| s.available.load(Ordering::Relaxed))
    }

    /// Snapshot the health of every probed provider
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        self.state
            .iter()
            .map(|entry| ProviderHealth {
                provider: entry.key().clone(),
                is_available: entry.available.load(Ordering::Relaxed),
                last_probe: entry.last_probe.load(Ordering::Relaxed),
                consecutive_failures: entry.consecutive_failures.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Probe every provider once
    pub async fn probe_round(&self) {
        let timeout = Duration::from_secs(self.options.probe_timeout_seconds);

        for probe in &self.probes {
            let outcome = match tokio::time::timeout(timeout, probe.probe()).await {
                Ok(outcome) => outcome,
                Err(_) => ProbeOutcome {
                    available: false,
                    latency: timeout,
                    error: Some("probe timed out".to_owned()),
                },
            };

            self.apply_outcome(probe.name(), &outcome).await;
        }
    }

    async fn apply_outcome(&self, provider: &str, outcome: &ProbeOutcome) {
        let entry = self.state.entry(provider.to_owned()).or_insert_with(ProviderState::new);

        let now = now_secs();
        entry.last_probe.store(now, Ordering::Relaxed);
        entry.available.store(outcome.available, Ordering::Relaxed);

        let should_alert = if outcome.available {
            entry.consecutive_failures.store(0, Ordering::Relaxed);
            entry.alerted.store(false, Ordering::Relaxed);
            false
        } else {
            let failures = entry.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                provider,
                consecutive_failures = failures,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "provider probe failed"
            );
            failures >= self.options.consecutive_failures_before_alert && !entry.alerted.swap(true, Ordering::Relaxed)
        };
        let failures = entry.consecutive_failures.load(Ordering::Relaxed);
        drop(entry);

        if should_alert && let Some(alerts) = &self.alerts {
            alerts
                .send(
                    AlertKind::ProviderUnavailable,
                    serde_json::json!({
                        "provider": provider,
                        "consecutive_failures": failures,
                        "error": outcome.error,
                    }),
                )
                .await;
        }

        // Persistence is best-effort; a failing sink must not stop probing
        if let Some(persistence) = &self.persistence {
            persistence
                .append_health(HealthRecord {
                    provider: provider.to_owned(),
                    available: outcome.available,
                    latency_ms: u64::try_from(outcome.latency.as_millis()).unwrap_or(u64::MAX),
                    probed_at: now,
                    error: outcome.error.clone(),
                })
                .await;
        }
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
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::*;

    /// Probe that replays a scripted sequence of outcomes
    struct ScriptedProbe {
        name: String,
        script: Mutex<Vec<bool>>,
    }

    impl ScriptedProbe {
        fn new(name: &str, script: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_owned(),
                script: Mutex::new(script.iter().rev().copied().collect()),
            })
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        fn name(&self) -> &str {
            &self.name
        }

        async fn probe(&self) -> ProbeOutcome {
            let available = self.script.lock().unwrap().pop().unwrap_or(true);
            ProbeOutcome {
                available,
                latency: Duration::from_millis(5),
                error: (!available).then(|| "connection refused".to_owned()),
            }
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<AlertKind>);

    #[async_trait]
    impl AlertSink for ChannelSink {
        async fn send(&self, kind: AlertKind, _payload: serde_json::Value) {
            self.0.send(kind).ok();
        }
    }

    fn test_options(threshold: u32) -> HealthOptions {
        HealthOptions {
            check_interval_minutes: 1,
            consecutive_failures_before_alert: threshold,
            probe_timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn alert_fires_exactly_once_per_failure_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let probe = ScriptedProbe::new("openai", &[false, false, false, false, false]);
        let monitor = HealthMonitor::new(vec![probe], test_options(3), Some(Arc::new(ChannelSink(tx))), None);

        for _ in 0..5 {
            monitor.probe_round().await;
        }

        assert_eq!(rx.recv().await.unwrap(), AlertKind::ProviderUnavailable);
        assert!(rx.try_recv().is_err());
        assert!(!monitor.is_available("openai"));
    }

    #[tokio::test]
    async fn success_resets_run_and_rearms_alert() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Two failure runs of length 2 separated by a success
        let probe = ScriptedProbe::new("openai", &[false, false, true, false, false]);
        let monitor = HealthMonitor::new(vec![probe], test_options(2), Some(Arc::new(ChannelSink(tx))), None);

        for _ in 0..5 {
            monitor.probe_round().await;
        }

        assert_eq!(rx.recv().await.unwrap(), AlertKind::ProviderUnavailable);
        assert_eq!(rx.recv().await.unwrap(), AlertKind::ProviderUnavailable);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn no_alert_below_threshold() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let probe = ScriptedProbe::new("openai", &[false, false, true]);
        let monitor = HealthMonitor::new(vec![probe], test_options(3), Some(Arc::new(ChannelSink(tx))), None);

        for _ in 0..3 {
            monitor.probe_round().await;
        }

        assert!(rx.try_recv().is_err());
        assert!(monitor.is_available("openai"));
    }

    #[tokio::test]
    async fn unknown_provider_is_assumed_available() {
        let monitor = HealthMonitor::new(Vec::new(), test_options(3), None, None);
        assert!(monitor.is_available("never-probed"));
    }

    #[tokio::test]
    async fn snapshot_reports_failure_run_length() {
        let probe = ScriptedProbe::new("cohere", &[false, false]);
        let monitor = HealthMonitor::new(vec![probe], test_options(5), None, None);

        monitor.probe_round().await;
        monitor.probe_round().await;

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].provider, "cohere");
        assert_eq!(snapshot[0].consecutive_failures, 2);
        assert!(!snapshot[0].is_available);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let monitor = Arc::new(HealthMonitor::new(Vec::new(), test_options(3), None, None));
        monitor.start();
        monitor.start();
        monitor.stop();
        monitor.stop();
    }
}
