use serde::Serialize;
use std::time::Duration;

/// Fixed per-item allowance for UI refresh, added to every measured item.
pub const UI_ALLOWANCE: Duration = Duration::from_millis(50);

/// Result of one queue step.
///
/// Serializes as `{finished, avgTimeTaken, totalProcessed}` for conversion,
/// `{finished, avgTimeTaken, totalUploaded}` for uploads, and
/// `{finished: true}` once the worklist is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Progress {
    #[serde(rename_all = "camelCase")]
    Processing {
        finished: bool,
        /// Running average per item, milliseconds.
        avg_time_taken: f64,
        total_processed: usize,
    },
    #[serde(rename_all = "camelCase")]
    Uploading {
        finished: bool,
        avg_time_taken: f64,
        total_uploaded: usize,
    },
    Finished { finished: bool },
}

impl Progress {
    pub fn finished() -> Self {
        Progress::Finished { finished: true }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Progress::Finished { .. })
    }

    /// Items handled since the run started.
    pub fn total(&self) -> Option<usize> {
        match self {
            Progress::Processing {
                total_processed, ..
            } => Some(*total_processed),
            Progress::Uploading { total_uploaded, .. } => Some(*total_uploaded),
            Progress::Finished { .. } => None,
        }
    }

    pub fn avg_time_taken(&self) -> Option<f64> {
        match self {
            Progress::Processing { avg_time_taken, .. }
            | Progress::Uploading { avg_time_taken, .. } => Some(*avg_time_taken),
            Progress::Finished { .. } => None,
        }
    }
}

/// Running average of item times, for ETA display.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    items: usize,
    elapsed: Duration,
}

impl ProgressTracker {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn items(&self) -> usize {
        self.items
    }

    fn add(&mut self, elapsed: Duration) -> f64 {
        self.items += 1;
        self.elapsed += elapsed + UI_ALLOWANCE;
        self.elapsed.as_micros() as f64 / 1000.0 / self.items as f64
    }

    pub fn record_processed(&mut self, elapsed: Duration) -> Progress {
        let avg_time_taken = self.add(elapsed);
        Progress::Processing {
            finished: false,
            avg_time_taken,
            total_processed: self.items,
        }
    }

    pub fn record_uploaded(&mut self, elapsed: Duration) -> Progress {
        let avg_time_taken = self.add(elapsed);
        Progress::Uploading {
            finished: false,
            avg_time_taken,
            total_uploaded: self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_include_the_ui_allowance() {
        let mut tracker = ProgressTracker::default();
        tracker.record_processed(Duration::from_millis(50));
        let progress = tracker.record_processed(Duration::from_millis(150));
        assert_eq!(
            progress,
            Progress::Processing {
                finished: false,
                avg_time_taken: 150.0,
                total_processed: 2,
            }
        );

        tracker.reset();
        assert_eq!(tracker.items(), 0);
        assert_eq!(tracker.record_uploaded(Duration::ZERO).total(), Some(1));
    }

    #[test]
    fn counters_are_named_by_queue() {
        let value = serde_json::to_value(Progress::finished()).unwrap();
        assert_eq!(value, serde_json::json!({"finished": true}));

        let mut tracker = ProgressTracker::default();
        let value = serde_json::to_value(tracker.record_processed(Duration::ZERO)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"finished": false, "avgTimeTaken": 50.0, "totalProcessed": 1})
        );

        tracker.reset();
        let value = serde_json::to_value(tracker.record_uploaded(Duration::from_millis(50))).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"finished": false, "avgTimeTaken": 100.0, "totalUploaded": 1})
        );
    }
}
