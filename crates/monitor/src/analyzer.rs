//! Per-frame pipeline: emotion decision, no-person veto, gaze

use camera_capture::VideoFrame;
use chrono::Local;
use emotion::{Decision, EmotionClassifier};
use gaze::{GazeEstimator, GazeReading, LandmarkModel};
use tracing::{debug, info, warn};

use crate::{EmotionSnapshot, SnapshotStore};

/// Result of analysing one frame
#[derive(Debug, Clone)]
pub struct Analysis {
    pub decision: Decision,
    pub gaze: GazeReading,
    /// Landmark extraction failed for this frame
    pub landmark_failure: bool,
}

impl Analysis {
    /// Apply this analysis to a snapshot
    pub fn write_into(&self, snapshot: &mut EmotionSnapshot) {
        if !self.landmark_failure {
            snapshot.emotion = self.decision.emotion;
            snapshot.confidence = self.decision.confidence;
        }
        snapshot.face_detected = self.gaze.face_detected;
        snapshot.looking_at_screen = self.gaze.face_detected && self.gaze.looking_at_screen;
        snapshot.timestamp = Local::now();
    }
}

/// Runs the landmark model, the gaze estimator, and the emotion classifier.
pub struct Analyzer {
    landmarks: Box<dyn LandmarkModel>,
    gaze: GazeEstimator,
    classifier: EmotionClassifier,
}

impl Analyzer {
    pub fn new(
        landmarks: Box<dyn LandmarkModel>,
        gaze: GazeEstimator,
        classifier: EmotionClassifier,
    ) -> Self {
        Self {
            landmarks,
            gaze,
            classifier,
        }
    }

    /// Analyse a frame. Never fails: model errors degrade to defaults.
    pub fn analyze(&self, frame: &VideoFrame) -> Analysis {
        let decision = match self.classifier.classify(frame) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Emotion classification failed: {}", e);
                metrics::counter!("monitor_frame_errors_total").increment(1);
                Decision::neutral_default()
            }
        };

        if decision.vetoed {
            metrics::counter!("monitor_no_person_vetoes_total").increment(1);
            return Analysis {
                decision,
                gaze: GazeReading::no_face(),
                landmark_failure: false,
            };
        }

        let (gaze, landmark_failure) = match self.landmarks.detect(frame) {
            Ok(faces) => (self.gaze.estimate(&faces), false),
            Err(e) => {
                warn!("Landmark extraction failed: {}", e);
                metrics::counter!("monitor_frame_errors_total").increment(1);
                (GazeReading::no_face(), true)
            }
        };

        if let Some(gaze_x) = gaze.gaze_x {
            debug!(
                gaze_x,
                gaze_px = gaze_x * frame.width as f32,
                on_screen_px = self.gaze.is_on_screen_px(gaze_x, frame.width),
                "gaze estimated"
            );
        }

        Analysis {
            decision,
            gaze,
            landmark_failure,
        }
    }

    /// Analyse a frame and publish the result to `store`
    pub fn analyze_into(&self, frame: &VideoFrame, store: &SnapshotStore) -> EmotionSnapshot {
        let analysis = self.analyze(frame);
        let snapshot = store.update(|s| analysis.write_into(s));
        metrics::counter!("monitor_frames_analyzed_total").increment(1);

        info!(
            emotion = %snapshot.emotion,
            confidence = snapshot.confidence,
            looking = snapshot.looking_at_screen,
            face = snapshot.face_detected,
            "frame analyzed"
        );
        snapshot
    }

    /// Emotion model is loaded
    pub fn model_loaded(&self) -> bool {
        self.classifier.is_loaded()
    }

    /// Landmark model is loaded
    pub fn landmarks_loaded(&self) -> bool {
        self.landmarks.is_loaded()
    }

    pub fn classifier(&self) -> &EmotionClassifier {
        &self.classifier
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use emotion::{Emotion, EmotionConfig, EmotionError, VisionLanguageModel};
    use gaze::{FaceLandmarks, GazeConfig, GazeError, Landmark, LEFT_IRIS, RIGHT_IRIS};

    /// Landmark model returning a fixed result
    pub(crate) enum FakeLandmarks {
        NoFace,
        Looking(f32),
        Fail,
    }

    impl LandmarkModel for FakeLandmarks {
        fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, GazeError> {
            match self {
                FakeLandmarks::NoFace => Ok(vec![]),
                FakeLandmarks::Looking(x) => {
                    let mut points = vec![Landmark::new(0.5, 0.5); 478];
                    for idx in LEFT_IRIS.iter().chain(RIGHT_IRIS.iter()) {
                        points[*idx] = Landmark::new(*x, 0.4);
                    }
                    Ok(vec![FaceLandmarks::new(points, 0.99)])
                }
                FakeLandmarks::Fail => Err(GazeError::Inference("mesh exploded".to_string())),
            }
        }
    }

    /// Vision-language model favouring prompts containing `keyword`
    pub(crate) struct KeywordModel(pub &'static str);

    impl VisionLanguageModel for KeywordModel {
        fn score(&self, _frame: &VideoFrame, prompts: &[String]) -> Result<Vec<f32>, EmotionError> {
            Ok(prompts
                .iter()
                .map(|p| if p.contains(self.0) { 30.0 } else { 20.0 })
                .collect())
        }
    }

    /// Model whose scores are all NaN
    struct NanModel;

    impl VisionLanguageModel for NanModel {
        fn score(&self, _frame: &VideoFrame, prompts: &[String]) -> Result<Vec<f32>, EmotionError> {
            Ok(vec![f32::NAN; prompts.len()])
        }
    }

    pub(crate) fn analyzer(landmarks: FakeLandmarks, keyword: Option<&'static str>) -> Analyzer {
        let config = EmotionConfig::default();
        let classifier = match keyword {
            Some(k) => EmotionClassifier::with_model(
                Box::new(KeywordModel(k)),
                config.prompt_bank(),
                config.classification_policy(),
            ),
            None => EmotionClassifier::unloaded(&config),
        };
        Analyzer::new(
            Box::new(landmarks),
            GazeEstimator::new(&GazeConfig::default()),
            classifier,
        )
    }

    fn frame() -> VideoFrame {
        VideoFrame::solid(16, 16, [90, 90, 90])
    }

    #[test]
    fn test_face_looking_at_screen() {
        let store = SnapshotStore::new();
        let snapshot = analyzer(FakeLandmarks::Looking(0.5), Some("smiling")).analyze_into(&frame(), &store);

        assert_eq!(snapshot.emotion, Emotion::Happy);
        assert!(snapshot.face_detected);
        assert!(snapshot.looking_at_screen);
        assert_eq!(store.get(), snapshot);
    }

    #[test]
    fn test_no_face_clears_flags_regardless_of_prior() {
        let store = SnapshotStore::new();
        store.set(EmotionSnapshot {
            emotion: Emotion::Happy,
            confidence: 0.9,
            face_detected: true,
            looking_at_screen: true,
            ..Default::default()
        });

        let snapshot = analyzer(FakeLandmarks::NoFace, Some("smiling")).analyze_into(&frame(), &store);
        assert!(!snapshot.face_detected);
        assert!(!snapshot.looking_at_screen);
    }

    #[test]
    fn test_veto_skips_gaze() {
        let store = SnapshotStore::new();
        // Landmarks would report a face looking at the screen, but the veto wins
        let snapshot = analyzer(FakeLandmarks::Looking(0.5), Some("empty")).analyze_into(&frame(), &store);

        assert_eq!(snapshot.emotion, Emotion::Neutral);
        assert!(!snapshot.face_detected);
        assert!(!snapshot.looking_at_screen);
        assert!(snapshot.confidence > 0.35);
    }

    #[test]
    fn test_landmark_failure_keeps_emotion() {
        let store = SnapshotStore::new();
        store.set(EmotionSnapshot {
            emotion: Emotion::Focused,
            confidence: 0.7,
            face_detected: true,
            looking_at_screen: true,
            ..Default::default()
        });

        let snapshot = analyzer(FakeLandmarks::Fail, Some("smiling")).analyze_into(&frame(), &store);
        assert_eq!(snapshot.emotion, Emotion::Focused);
        assert_eq!(snapshot.confidence, 0.7);
        assert!(!snapshot.face_detected);
        assert!(!snapshot.looking_at_screen);
    }

    #[test]
    fn test_unloaded_model_degrades_to_neutral() {
        let analyzer = analyzer(FakeLandmarks::Looking(0.2), None);
        assert!(!analyzer.model_loaded());

        let analysis = analyzer.analyze(&frame());
        assert_eq!(analysis.decision.emotion, Emotion::Neutral);
        assert_eq!(analysis.decision.confidence, 0.0);
        assert!(analysis.gaze.face_detected);
        assert!(!analysis.gaze.looking_at_screen);
    }

    #[test]
    fn test_non_finite_model_output_degrades_to_neutral() {
        let config = EmotionConfig::default();
        let analyzer = Analyzer::new(
            Box::new(FakeLandmarks::Looking(0.5)),
            GazeEstimator::new(&GazeConfig::default()),
            EmotionClassifier::with_model(
                Box::new(NanModel),
                config.prompt_bank(),
                config.classification_policy(),
            ),
        );

        let snapshot = analyzer.analyze_into(&frame(), &SnapshotStore::new());
        assert_eq!(snapshot.emotion, Emotion::Neutral);
        assert_eq!(snapshot.confidence, 0.0);
        assert!(snapshot.face_detected);
        assert!(snapshot.looking_at_screen);
    }
}
