//! Test metrics sink.

use std::sync::Mutex;

use orderflow_core::metrics::LagRecorder;

/// A lag recorder that keeps every observation in order.
#[derive(Debug, Default)]
pub struct RecordingLagRecorder {
    recorded: Mutex<Vec<(String, f64)>>,
}

impl RecordingLagRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all `(projector, seconds)` observations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn recorded(&self) -> Vec<(String, f64)> {
        self.recorded.lock().unwrap().clone()
    }

    /// Returns the most recent observation for `projector`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_for(&self, projector: &str) -> Option<f64> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == projector)
            .map(|(_, seconds)| *seconds)
    }
}

impl LagRecorder for RecordingLagRecorder {
    fn record_lag(&self, projector: &str, seconds: f64) {
        self.recorded
            .lock()
            .unwrap()
            .push((projector.to_owned(), seconds));
    }
}
