//! Camera sampling loop
//!
//! Runs on a blocking thread and owns the frame source for its whole life.
//! However the loop ends, [`SessionGuard`] releases the source before the
//! monitor is reported idle again.

use camera_capture::{CameraProvider, FrameSource};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{Analyzer, MonitorConfig, MonitorError, SessionStats, SnapshotStore};

/// Why the sampling loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Cancelled by a stop request
    Stopped,
    /// The source ran out of frames
    EndOfStream,
    /// Reading a frame failed
    ReadFailed(String),
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::Stopped => write!(f, "stopped"),
            LoopExit::EndOfStream => write!(f, "end of stream"),
            LoopExit::ReadFailed(e) => write!(f, "read failed: {}", e),
        }
    }
}

/// Everything the loop needs, moved onto its thread
pub(crate) struct LoopContext {
    pub source: Box<dyn FrameSource>,
    pub analyzer: Arc<Analyzer>,
    pub store: SnapshotStore,
    pub stats: Arc<Mutex<Option<SessionStats>>>,
    pub active: Arc<AtomicBool>,
    pub config: MonitorConfig,
    pub cancel: CancellationToken,
}

/// Owns the camera while the loop runs.
///
/// Dropping it (normal exit or unwind) closes the source, then clears the
/// active flag and closes the session stats.
struct SessionGuard {
    source: Option<Box<dyn FrameSource>>,
    active: Arc<AtomicBool>,
    stats: Arc<Mutex<Option<SessionStats>>>,
}

impl SessionGuard {
    fn read_frame(&mut self) -> Result<Option<camera_capture::VideoFrame>, camera_capture::CameraError> {
        match self.source.as_mut() {
            Some(source) => source.read_frame(),
            None => Ok(None),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.source.take());
        self.active.store(false, Ordering::SeqCst);

        if let Some(stats) = self.stats.lock().as_mut() {
            stats.finish();
            let summary = stats.summary();
            info!(
                session_id = %summary.session_id,
                seconds = summary.session_seconds,
                labels = summary.labels.len(),
                "Camera session closed"
            );
            for label in &summary.labels {
                info!(
                    "  {}: {:.1}s ({:.1}%), looked at screen {:.1}%",
                    label.emotion, label.seconds, label.percent, label.looked_percent
                );
            }
        }
    }
}

/// Sampling loop body.
///
/// Polls frames continuously, analyses at most once per
/// `analysis_interval`, and sleeps `poll_interval` between polls. The
/// cancellation token is checked once per iteration.
pub(crate) fn camera_loop(ctx: LoopContext) -> LoopExit {
    let LoopContext {
        source,
        analyzer,
        store,
        stats,
        active,
        config,
        cancel,
    } = ctx;

    let mut guard = SessionGuard {
        source: Some(source),
        active,
        stats,
    };

    let interval = config.analysis_interval();
    let poll = config.poll_interval();
    let mut last_analysis: Option<Instant> = None;
    let mut frames_read: u64 = 0;

    info!("Camera loop started (analysis every {:?})", interval);

    let exit = loop {
        if cancel.is_cancelled() {
            break LoopExit::Stopped;
        }

        match guard.read_frame() {
            Ok(Some(frame)) => {
                frames_read += 1;
                let now = Instant::now();
                let due = last_analysis.map_or(true, |t| now.duration_since(t) >= interval);
                if due {
                    last_analysis = Some(now);
                    let snapshot = analyzer.analyze_into(&frame, &store);
                    if let Some(stats) = guard.stats.lock().as_mut() {
                        stats.record(
                            snapshot.emotion,
                            snapshot.face_detected && snapshot.looking_at_screen,
                            now,
                        );
                    }
                }
            }
            Ok(None) => break LoopExit::EndOfStream,
            Err(e) => {
                error!("Failed to read frame: {}", e);
                break LoopExit::ReadFailed(e.to_string());
            }
        }

        std::thread::sleep(poll);
    };

    info!(frames_read, "Camera loop exited: {}", exit);
    exit
}

/// Open the camera and skip dark frames the sensor produces while starting.
///
/// Reads up to `warmup_frames` frames and returns as soon as one is brighter
/// than `dark_threshold`. Fails if the camera yields no frame at all.
pub(crate) fn open_and_warm_up(
    provider: &dyn CameraProvider,
    config: &MonitorConfig,
) -> Result<Box<dyn FrameSource>, MonitorError> {
    let mut source = provider.open()?;

    let mut got_frame = false;
    for attempt in 1..=config.warmup_frames.max(1) {
        match source.read_frame() {
            Ok(Some(frame)) => {
                got_frame = true;
                let brightness = frame.mean_brightness();
                if brightness > config.dark_threshold {
                    debug!(attempt, brightness, "Camera warmed up");
                    return Ok(source);
                }
                debug!(attempt, brightness, "Skipping dark frame");
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Warm-up read failed: {}", e);
                break;
            }
        }
    }

    if got_frame {
        warn!("Camera still dark after warm-up, continuing anyway");
        Ok(source)
    } else {
        Err(MonitorError::DeviceUnavailable(
            "camera opened but produced no frames".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analyzer::tests::{analyzer, FakeLandmarks};
    use camera_capture::{CameraError, VideoFrame};
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Frame source scripted step by step; flags `released` when dropped.
    pub(crate) struct ScriptedSource {
        pub steps: VecDeque<Step>,
        pub repeat_last: bool,
        pub released: Arc<AtomicBool>,
    }

    #[derive(Clone)]
    pub(crate) enum Step {
        Frame(u8),
        Fail,
        Panic,
        End,
    }

    impl ScriptedSource {
        pub(crate) fn new(steps: Vec<Step>, repeat_last: bool) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Self {
                    steps: steps.into(),
                    repeat_last,
                    released: released.clone(),
                },
                released,
            )
        }
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            let step = if self.repeat_last && self.steps.len() == 1 {
                self.steps.front().cloned()
            } else {
                self.steps.pop_front()
            };
            match step.unwrap_or(Step::End) {
                Step::Frame(v) => Ok(Some(VideoFrame::solid(8, 8, [v, v, v]))),
                Step::Fail => Err(CameraError::Stream("device unplugged".to_string())),
                Step::Panic => panic!("driver crashed"),
                Step::End => Ok(None),
            }
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn context(source: ScriptedSource) -> (LoopContext, Arc<AtomicBool>, SnapshotStore) {
        let active = Arc::new(AtomicBool::new(true));
        let store = SnapshotStore::new();
        let ctx = LoopContext {
            source: Box::new(source),
            analyzer: Arc::new(analyzer(FakeLandmarks::Looking(0.5), Some("smiling"))),
            store: store.clone(),
            stats: Arc::new(Mutex::new(Some(SessionStats::new()))),
            active: active.clone(),
            config: MonitorConfig {
                analysis_interval_ms: 0,
                poll_interval_ms: 1,
                ..Default::default()
            },
            cancel: CancellationToken::new(),
        };
        (ctx, active, store)
    }

    #[test]
    fn test_end_of_stream_releases_camera() {
        let (source, released) = ScriptedSource::new(vec![Step::Frame(100), Step::Frame(100)], false);
        let (ctx, active, store) = context(source);
        let stats = ctx.stats.clone();

        assert_eq!(camera_loop(ctx), LoopExit::EndOfStream);
        assert!(released.load(Ordering::SeqCst));
        assert!(!active.load(Ordering::SeqCst));
        assert!(store.get().face_detected);

        let summary = stats.lock().as_ref().unwrap().summary();
        assert!(!summary.active);
        assert_eq!(summary.labels[0].samples, 2);
    }

    #[test]
    fn test_read_failure_releases_camera() {
        let (source, released) = ScriptedSource::new(vec![Step::Frame(100), Step::Fail], false);
        let (ctx, active, _) = context(source);

        assert!(matches!(camera_loop(ctx), LoopExit::ReadFailed(_)));
        assert!(released.load(Ordering::SeqCst));
        assert!(!active.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panic_in_loop_still_releases_camera() {
        let (source, released) = ScriptedSource::new(vec![Step::Frame(100), Step::Panic], false);
        let (ctx, active, _) = context(source);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| camera_loop(ctx)));
        assert!(result.is_err());
        assert!(released.load(Ordering::SeqCst));
        assert!(!active.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_stops_loop() {
        let (source, released) = ScriptedSource::new(vec![Step::Frame(100)], true);
        let (ctx, active, _) = context(source);
        let cancel = ctx.cancel.clone();

        let handle = std::thread::spawn(move || camera_loop(ctx));
        std::thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert_eq!(handle.join().unwrap(), LoopExit::Stopped);
        assert!(released.load(Ordering::SeqCst));
        assert!(!active.load(Ordering::SeqCst));
    }

    #[test]
    fn test_analysis_cadence() {
        let (source, _) = ScriptedSource::new(vec![Step::Frame(100); 5], false);
        let (mut ctx, _, _) = context(source);
        ctx.config.analysis_interval_ms = 60_000;
        let stats = ctx.stats.clone();

        camera_loop(ctx);
        // Five frames polled, only the first analysed
        assert_eq!(stats.lock().as_ref().unwrap().summary().labels[0].samples, 1);
    }

    struct ScriptedProvider(Vec<Step>);

    impl CameraProvider for ScriptedProvider {
        fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
            Ok(Box::new(ScriptedSource::new(self.0.clone(), false).0))
        }
    }

    #[test]
    fn test_warm_up_skips_dark_frames() {
        let provider = ScriptedProvider(vec![Step::Frame(0), Step::Frame(2), Step::Frame(120), Step::Frame(7)]);
        let mut source = open_and_warm_up(&provider, &MonitorConfig::default()).unwrap();

        // The lit frame was consumed; the next one comes from after it
        let next = source.read_frame().unwrap().unwrap();
        assert_eq!(next.get_pixel(0, 0), Some([7, 7, 7]));
    }

    #[test]
    fn test_warm_up_without_frames_fails() {
        let provider = ScriptedProvider(vec![]);
        let err = open_and_warm_up(&provider, &MonitorConfig::default()).err().unwrap();
        assert!(matches!(err, MonitorError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_warm_up_accepts_dark_camera() {
        let provider = ScriptedProvider(vec![Step::Frame(1); 12]);
        assert!(open_and_warm_up(&provider, &MonitorConfig::default()).is_ok());
    }
}
