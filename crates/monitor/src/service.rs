//! Monitor service: Idle/Active state machine around the sampling loop

use camera_capture::{CameraProvider, VideoFrame};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::worker::{camera_loop, open_and_warm_up, LoopContext};
use crate::{
    Analyzer, EmotionSnapshot, LoopExit, MonitorConfig, MonitorError, SessionStats,
    SnapshotStore, StatsSummary,
};

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<LoopExit>,
}

/// Owns the snapshot, the analyzer, and at most one sampling loop.
///
/// Start and stop are serialized, so two concurrent start requests can
/// never both open the camera.
pub struct EmotionMonitor {
    provider: Arc<dyn CameraProvider>,
    analyzer: Arc<Analyzer>,
    store: SnapshotStore,
    stats: Arc<Mutex<Option<SessionStats>>>,
    config: MonitorConfig,
    active: Arc<AtomicBool>,
    running: tokio::sync::Mutex<Option<RunningLoop>>,
}

impl EmotionMonitor {
    pub fn new(provider: Arc<dyn CameraProvider>, analyzer: Analyzer, config: MonitorConfig) -> Self {
        Self {
            provider,
            analyzer: Arc::new(analyzer),
            store: SnapshotStore::new(),
            stats: Arc::new(Mutex::new(None)),
            config,
            active: Arc::new(AtomicBool::new(false)),
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// Idle -> Active.
    ///
    /// Opens and warms up the camera before returning; a camera that cannot
    /// be opened leaves the monitor idle.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut running = self.running.lock().await;
        if self.active.load(Ordering::SeqCst) {
            return Err(MonitorError::AlreadyActive);
        }

        // A loop that ended on its own still needs joining
        if let Some(previous) = running.take() {
            match previous.handle.await {
                Ok(exit) => info!("Reaped finished camera loop ({})", exit),
                Err(e) => warn!("Previous camera loop ended abnormally: {}", e),
            }
        }

        let provider = self.provider.clone();
        let config = self.config.clone();
        let source = tokio::task::spawn_blocking(move || open_and_warm_up(provider.as_ref(), &config))
            .await
            .map_err(|e| MonitorError::Internal(e.to_string()))??;

        let stats = SessionStats::new();
        let session_id = stats.session_id();
        *self.stats.lock() = Some(stats);
        self.active.store(true, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let ctx = LoopContext {
            source,
            analyzer: self.analyzer.clone(),
            store: self.store.clone(),
            stats: self.stats.clone(),
            active: self.active.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::task::spawn_blocking(move || camera_loop(ctx));
        *running = Some(RunningLoop { cancel, handle });

        metrics::counter!("monitor_sessions_started_total").increment(1);
        info!(%session_id, "Camera started");
        Ok(())
    }

    /// Active -> Idle. Returns whether a loop was running.
    ///
    /// Waits for the loop to exit, so the camera is released on return.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(run) = running.take() else {
            return false;
        };
        let was_active = self.active.load(Ordering::SeqCst);

        run.cancel.cancel();
        match run.handle.await {
            Ok(exit) => info!("Camera stopped ({})", exit),
            Err(e) => error!("Camera loop ended abnormally: {}", e),
        }
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> EmotionSnapshot {
        self.store.get()
    }

    /// Analyse a caller-supplied frame and publish the result.
    ///
    /// Works in both states and never touches the camera.
    pub async fn analyze_frame(&self, frame: VideoFrame) -> Result<EmotionSnapshot, MonitorError> {
        let analyzer = self.analyzer.clone();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || analyzer.analyze_into(&frame, &store))
            .await
            .map_err(|e| MonitorError::Internal(e.to_string()))
    }

    /// Report of the current or most recent camera session
    pub fn stats_summary(&self) -> Option<StatsSummary> {
        self.stats.lock().as_ref().map(SessionStats::summary)
    }

    pub fn model_loaded(&self) -> bool {
        self.analyzer.model_loaded()
    }

    pub fn landmarks_loaded(&self) -> bool {
        self.analyzer.landmarks_loaded()
    }

    /// Name of the active classification policy
    pub fn policy_name(&self) -> &'static str {
        self.analyzer.classifier().policy().name()
    }
}

impl Drop for EmotionMonitor {
    fn drop(&mut self) {
        if let Some(run) = self.running.get_mut().as_ref() {
            run.cancel.cancel();
        }
    }
}
