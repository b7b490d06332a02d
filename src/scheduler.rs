//! Periodic localization attempts with two-level retry backoff.
//!
//! One scheduler loop drives at most one outstanding scan request at a
//! time. A tick requests a scan; a refused request pushes the next attempt
//! out to the backoff interval, an accepted one resets it to the normal
//! interval, and the delivered observations are matched against a fresh
//! snapshot of the store. The loop never gives up on its own; it retries
//! until [`ScanScheduler::stop`] is called.
//!
//! Cancellation is a watch channel: `stop()` flips it synchronously, the
//! loop observes it at every suspension point, and an in-flight scan result
//! arriving after `stop()` is discarded without reaching the sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::engine::{LocalizationEngine, PositionEstimate};
use crate::port::ScanSampler;
use crate::store::FingerprintStore;

/// Timing configuration for the localization loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between attempts while scan requests are being accepted.
    pub normal_interval: Duration,
    /// Delay after a scan request is refused (radio busy, disabled, or
    /// permission denied).
    pub backoff_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_secs(15),
            backoff_interval: Duration::from_secs(30),
        }
    }
}

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No loop is running and no attempt will fire.
    Idle,
    /// The loop is running periodic attempts.
    Running,
}

/// Receives the outcome of each completed localization attempt.
#[async_trait]
pub trait LocalizationSink: Send + Sync {
    /// Called once per completed attempt with the engine's output;
    /// `None` means "no usable match".
    async fn on_localization_result(&self, result: Option<PositionEstimate>);
}

struct LoopHandle {
    state: SchedulerState,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Drives periodic localization attempts against a store and a sampler.
pub struct ScanScheduler {
    config: SchedulerConfig,
    store: Arc<FingerprintStore>,
    sampler: Arc<dyn ScanSampler>,
    sink: Arc<dyn LocalizationSink>,
    inner: Mutex<LoopHandle>,
}

impl ScanScheduler {
    /// Create an idle scheduler.
    pub fn new(
        config: SchedulerConfig,
        store: Arc<FingerprintStore>,
        sampler: Arc<dyn ScanSampler>,
        sink: Arc<dyn LocalizationSink>,
    ) -> Self {
        Self {
            config,
            store,
            sampler,
            sink,
            inner: Mutex::new(LoopHandle {
                state: SchedulerState::Idle,
                cancel: None,
                task: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.inner.lock().state
    }

    /// Start periodic attempts. The first attempt fires immediately.
    /// No-op when already running.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SchedulerState::Running {
            tracing::debug!("scheduler already running");
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            self.config.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.sampler),
            Arc::clone(&self.sink),
            cancel_rx,
        ));

        inner.state = SchedulerState::Running;
        inner.cancel = Some(cancel_tx);
        inner.task = Some(task);
        tracing::info!(
            normal = ?self.config.normal_interval,
            backoff = ?self.config.backoff_interval,
            "localization scheduler started"
        );
    }

    /// Stop the loop.
    ///
    /// Returns synchronously with the state already `Idle` and the cancel
    /// signal raised: no further scan request will be issued, and an
    /// in-flight result is discarded rather than delivered to the sink.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SchedulerState::Idle {
            return;
        }

        if let Some(cancel) = inner.cancel.take() {
            let _ = cancel.send(true);
        }
        inner.task.take();
        inner.state = SchedulerState::Idle;
        tracing::info!("localization scheduler stopped");
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolve once cancellation is signalled (or the scheduler is gone).
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn run_loop(
    config: SchedulerConfig,
    store: Arc<FingerprintStore>,
    sampler: Arc<dyn ScanSampler>,
    sink: Arc<dyn LocalizationSink>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let engine = LocalizationEngine::new();

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let interval = match sampler.request_scan() {
            Err(e) => {
                tracing::warn!(error = %e, "scan request refused; backing off");
                config.backoff_interval
            }
            Ok(ticket) => {
                let outcome = tokio::select! {
                    _ = cancelled(&mut cancel_rx) => break,
                    outcome = ticket.recv() => outcome,
                };

                match outcome {
                    Ok(observations) => {
                        let live = crate::domain::LiveScan::from_observations(&observations);
                        let records = store.load_all();
                        let estimate = engine.localize(&live, &records);

                        // The result may have raced a stop(); never revive
                        // the sink after cancellation.
                        if *cancel_rx.borrow() {
                            break;
                        }
                        sink.on_localization_result(estimate).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "scan result unavailable; skipping this attempt");
                    }
                }
                config.normal_interval
            }
        };

        tokio::select! {
            _ = cancelled(&mut cancel_rx) => break,
            _ = sleep(interval) => {}
        }
    }

    tracing::debug!("scheduler loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ScanScript, ScriptedSampler};
    use crate::domain::{BssidId, FingerprintRecord, ScanObservation};
    use tokio::time::{advance, Instant};

    struct RecordingSink {
        results: Mutex<Vec<Option<PositionEstimate>>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(Vec::new()),
            })
        }

        fn results(&self) -> Vec<Option<PositionEstimate>> {
            self.results.lock().clone()
        }
    }

    #[async_trait]
    impl LocalizationSink for RecordingSink {
        async fn on_localization_result(&self, result: Option<PositionEstimate>) {
            self.results.lock().push(result);
        }
    }

    fn mac(n: u8) -> BssidId {
        BssidId([0xaa, 0xbb, 0xcc, 0xdd, 0xee, n])
    }

    fn obs(n: u8, level: i32) -> ScanObservation {
        ScanObservation {
            bssid: mac(n),
            ssid: "net".to_owned(),
            level_dbm: level,
        }
    }

    fn record(x: f32, y: f32, n: u8, level: i32) -> FingerprintRecord {
        FingerprintRecord {
            x,
            y,
            timestamp_ms: 0,
            ssid: "net".to_owned(),
            bssid: mac(n),
            level_dbm: level,
        }
    }

    fn empty_store(dir: &tempfile::TempDir) -> Arc<FingerprintStore> {
        Arc::new(FingerprintStore::open(dir.path().join("data.csv")).unwrap())
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    /// Let the spawned loop task run up to the next timer.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_request_uses_backoff_then_success_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        store
            .append(&[record(0.1, 0.1, 1, -50), record(0.1, 0.1, 2, -60)])
            .unwrap();

        let sampler = ScriptedSampler::new(vec![
            ScanScript::Refuse,
            ScanScript::Deliver(vec![obs(1, -50), obs(2, -60)]),
            ScanScript::Deliver(vec![obs(1, -50), obs(2, -60)]),
        ]);
        let sink = RecordingSink::new();
        let scheduler = ScanScheduler::new(
            config(),
            store,
            Arc::clone(&sampler) as Arc<dyn ScanSampler>,
            Arc::clone(&sink) as Arc<dyn LocalizationSink>,
        );

        let t0 = Instant::now();
        scheduler.start();
        settle().await;

        // First attempt fires immediately and is refused.
        assert_eq!(sampler.request_count(), 1);

        // Next attempt must wait the full backoff interval, not the normal one.
        advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(sampler.request_count(), 1);

        advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(sampler.request_count(), 2);

        // The successful attempt resets the interval to normal.
        advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(sampler.request_count(), 3);

        let instants = sampler.request_instants();
        assert_eq!(instants[0] - t0, Duration::ZERO);
        assert_eq!(instants[1] - t0, Duration::from_secs(30));
        assert_eq!(instants[2] - t0, Duration::from_secs(45));

        scheduler.stop();
        assert_eq!(sink.results().len(), 2);
        assert!(sink.results()[0].is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_requests_and_discards_inflight_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        store
            .append(&[record(0.1, 0.1, 1, -50), record(0.1, 0.1, 2, -60)])
            .unwrap();

        let sampler = ScriptedSampler::new(vec![ScanScript::Pending]);
        let sink = RecordingSink::new();
        let scheduler = ScanScheduler::new(
            config(),
            store,
            Arc::clone(&sampler) as Arc<dyn ScanSampler>,
            Arc::clone(&sink) as Arc<dyn LocalizationSink>,
        );

        scheduler.start();
        settle().await;
        assert_eq!(sampler.request_count(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Running);

        // Stop while the scan is still in flight.
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        settle().await;

        // The late-arriving result must be discarded, not applied.
        sampler.deliver_pending(Ok(vec![obs(1, -50), obs(2, -60)]));
        advance(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(sampler.request_count(), 1);
        assert!(sink.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_store_reports_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);

        let sampler = ScriptedSampler::new(vec![ScanScript::Deliver(vec![obs(1, -50)])]);
        let sink = RecordingSink::new();
        let scheduler = ScanScheduler::new(
            config(),
            store,
            Arc::clone(&sampler) as Arc<dyn ScanSampler>,
            Arc::clone(&sink) as Arc<dyn LocalizationSink>,
        );

        scheduler.start();
        settle().await;
        scheduler.stop();

        assert_eq!(sink.results(), vec![None]);
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_scan_error_skips_sink_and_stays_running() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);

        let sampler = ScriptedSampler::new(vec![
            ScanScript::Fail,
            ScanScript::Deliver(Vec::new()),
        ]);
        let sink = RecordingSink::new();
        let scheduler = ScanScheduler::new(
            config(),
            store,
            Arc::clone(&sampler) as Arc<dyn ScanSampler>,
            Arc::clone(&sink) as Arc<dyn LocalizationSink>,
        );

        scheduler.start();
        settle().await;

        // The failed delivery produced no sink call but kept Running with
        // the normal interval.
        assert!(sink.results().is_empty());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        advance(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(sampler.request_count(), 2);
        assert_eq!(sink.results(), vec![None]);

        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir);
        let sampler = ScriptedSampler::new(vec![ScanScript::Pending]);
        let sink = RecordingSink::new();
        let scheduler = ScanScheduler::new(
            config(),
            store,
            Arc::clone(&sampler) as Arc<dyn ScanSampler>,
            Arc::clone(&sink) as Arc<dyn LocalizationSink>,
        );

        scheduler.start();
        scheduler.start();
        settle().await;

        // Only one loop requested a scan.
        assert_eq!(sampler.request_count(), 1);
        scheduler.stop();
    }
}
