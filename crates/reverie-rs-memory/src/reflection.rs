//! Importance accumulation that signals when an agent should reflect.

use parking_lot::Mutex;

/// Sums the importance of new memories until a threshold is crossed.
#[derive(Debug)]
pub struct ReflectionTracker {
    threshold: Option<f64>,
    accumulated: Mutex<f64>,
}

impl ReflectionTracker {
    /// Create a tracker. `None` disables reflection triggering.
    pub fn new(threshold: Option<f64>) -> Self {
        Self {
            threshold,
            accumulated: Mutex::new(0.0),
        }
    }

    /// Add an importance score; returns `true` and resets once the running
    /// total exceeds the threshold.
    pub fn record(&self, importance: f64) -> bool {
        let Some(threshold) = self.threshold else {
            return false;
        };
        let mut accumulated = self.accumulated.lock();
        *accumulated += importance;
        if *accumulated > threshold {
            *accumulated = 0.0;
            return true;
        }
        false
    }

    /// Importance accumulated since the last trigger.
    pub fn accumulated(&self) -> f64 {
        *self.accumulated.lock()
    }

    /// Configured threshold.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }
}
