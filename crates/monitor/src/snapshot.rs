//! The shared emotion snapshot

use chrono::{DateTime, Local};
use emotion::Emotion;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Latest emotion and gaze result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSnapshot {
    pub emotion: Emotion,
    /// Posterior of `emotion` (0-1)
    pub confidence: f32,
    pub timestamp: DateTime<Local>,
    /// Only meaningful when `face_detected`
    pub looking_at_screen: bool,
    pub face_detected: bool,
}

impl Default for EmotionSnapshot {
    fn default() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.0,
            timestamp: Local::now(),
            looking_at_screen: false,
            face_detected: false,
        }
    }
}

/// Holder of the single current snapshot.
///
/// Every read and write takes the same lock for the whole record, so readers
/// never see a half-written snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<Mutex<EmotionSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot
    pub fn get(&self) -> EmotionSnapshot {
        self.inner.lock().clone()
    }

    /// Replace the snapshot
    pub fn set(&self, snapshot: EmotionSnapshot) {
        *self.inner.lock() = snapshot;
    }

    /// Modify in place under the lock, returning the result
    pub fn update<F>(&self, f: F) -> EmotionSnapshot
    where
        F: FnOnce(&mut EmotionSnapshot),
    {
        let mut guard = self.inner.lock();
        f(&mut guard);
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let snapshot = SnapshotStore::new().get();
        assert_eq!(snapshot.emotion, Emotion::Neutral);
        assert_eq!(snapshot.confidence, 0.0);
        assert!(!snapshot.face_detected);
        assert!(!snapshot.looking_at_screen);
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(EmotionSnapshot::default()).unwrap();
        assert_eq!(json["emotion"], "neutral");
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["lookingAtScreen"], false);
        assert_eq!(json["faceDetected"], false);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_update_is_visible_to_clones() {
        let store = SnapshotStore::new();
        let reader = store.clone();
        let updated = store.update(|s| {
            s.emotion = Emotion::Happy;
            s.face_detected = true;
        });
        assert_eq!(updated.emotion, Emotion::Happy);
        assert_eq!(reader.get().emotion, Emotion::Happy);
        assert!(reader.get().face_detected);
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let store = SnapshotStore::new();
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let face = i % 2 == 0;
                        store.set(EmotionSnapshot {
                            emotion: if face { Emotion::Happy } else { Emotion::Sad },
                            face_detected: face,
                            looking_at_screen: face,
                            ..Default::default()
                        });
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let s = store.get();
            match s.emotion {
                Emotion::Happy => assert!(s.face_detected && s.looking_at_screen),
                Emotion::Sad => assert!(!s.face_detected && !s.looking_at_screen),
                _ => {}
            }
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
