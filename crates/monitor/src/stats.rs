//! Per-session emotion time accounting

use chrono::{DateTime, Local};
use emotion::Emotion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
struct LabelStats {
    seconds: f64,
    samples: u64,
    looked: u64,
}

/// Time spent in each emotion during one camera session.
///
/// Each sample is credited with the time elapsed since the previous sample
/// (or since the session started, for the first one).
#[derive(Debug, Clone)]
pub struct SessionStats {
    session_id: Uuid,
    started_at: DateTime<Local>,
    start: Instant,
    ended: Option<Instant>,
    last_sample: Instant,
    labels: BTreeMap<Emotion, LabelStats>,
}

/// Serializable per-label line of a [`StatsSummary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSummary {
    pub emotion: Emotion,
    pub seconds: f64,
    /// Share of the accounted time (0-100)
    pub percent: f64,
    pub samples: u64,
    /// Share of samples with the viewer looking at the screen (0-100)
    pub looked_percent: f64,
}

/// Serializable session report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Local>,
    pub active: bool,
    pub session_seconds: f64,
    pub labels: Vec<LabelSummary>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(start: Instant) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Local::now(),
            start,
            ended: None,
            last_sample: start,
            labels: BTreeMap::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Credit one analysed sample
    pub fn record(&mut self, emotion: Emotion, looking: bool, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_sample);
        self.last_sample = now;

        let entry = self.labels.entry(emotion).or_default();
        entry.seconds += elapsed.as_secs_f64();
        entry.samples += 1;
        if looking {
            entry.looked += 1;
        }
    }

    /// Close the session. Later calls keep the first end time.
    pub fn finish(&mut self) {
        if self.ended.is_none() {
            self.ended = Some(Instant::now());
        }
    }

    fn duration(&self) -> Duration {
        self.ended
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.start)
    }

    /// Report, labels sorted by time spent. Labels never sampled are omitted.
    pub fn summary(&self) -> StatsSummary {
        let accounted: f64 = self.labels.values().map(|s| s.seconds).sum();

        let mut labels: Vec<LabelSummary> = self
            .labels
            .iter()
            .filter(|(_, s)| s.samples > 0)
            .map(|(emotion, s)| LabelSummary {
                emotion: *emotion,
                seconds: s.seconds,
                percent: if accounted > 0.0 {
                    s.seconds / accounted * 100.0
                } else {
                    0.0
                },
                samples: s.samples,
                looked_percent: s.looked as f64 / s.samples as f64 * 100.0,
            })
            .collect();
        labels.sort_by(|a, b| b.seconds.total_cmp(&a.seconds));

        StatsSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            active: self.ended.is_none(),
            session_seconds: self.duration().as_secs_f64(),
            labels,
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session() {
        let stats = SessionStats::new();
        let summary = stats.summary();
        assert!(summary.active);
        assert!(summary.labels.is_empty());
    }

    #[test]
    fn test_time_credited_since_previous_sample() {
        let start = Instant::now();
        let mut stats = SessionStats::starting_at(start);

        stats.record(Emotion::Happy, true, start + Duration::from_secs(3));
        stats.record(Emotion::Happy, false, start + Duration::from_secs(6));
        stats.record(Emotion::Tired, false, start + Duration::from_secs(15));

        let summary = stats.summary();
        assert_eq!(summary.labels.len(), 2);

        // Sorted by time: tired got 9s, happy 6s
        assert_eq!(summary.labels[0].emotion, Emotion::Tired);
        assert!((summary.labels[0].seconds - 9.0).abs() < 1e-9);
        assert!((summary.labels[0].percent - 60.0).abs() < 1e-9);

        let happy = &summary.labels[1];
        assert_eq!(happy.samples, 2);
        assert!((happy.seconds - 6.0).abs() < 1e-9);
        assert!((happy.looked_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_is_sticky() {
        let mut stats = SessionStats::new();
        stats.finish();
        let first = stats.summary().session_seconds;
        std::thread::sleep(Duration::from_millis(5));
        stats.finish();

        let summary = stats.summary();
        assert!(!summary.active);
        assert_eq!(summary.session_seconds, first);
    }

    #[test]
    fn test_summary_serializes_labels_snake_case() {
        let mut stats = SessionStats::new();
        stats.record(Emotion::NoPerson, false, Instant::now());
        let json = serde_json::to_value(stats.summary()).unwrap();
        assert_eq!(json["labels"][0]["emotion"], "no_person");
        assert!(json["session_id"].is_string());
    }
}
