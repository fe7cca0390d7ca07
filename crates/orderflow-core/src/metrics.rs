//! Metrics sink for long-running loops.
//!
//! Loops are handed a [`LagRecorder`] explicitly. The production recorder
//! forwards to the `metrics` facade, so whichever exporter the process
//! installs picks the observations up.

/// Gauge name of the per-projector lag, labelled by `projector`.
pub const PROJECTOR_LAG_METRIC: &str = "projector_event_lag_seconds";

/// Receives projector lag observations.
pub trait LagRecorder: Send + Sync {
    /// Record the lag, in seconds, between now and the last event a
    /// projector processed.
    fn record_lag(&self, projector: &str, seconds: f64);
}

/// Clamps a raw lag value to a finite, non-negative number.
#[must_use]
pub fn clamp_lag(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds >= 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Sets the [`PROJECTOR_LAG_METRIC`] gauge on the installed recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsLagRecorder;

impl LagRecorder for MetricsLagRecorder {
    fn record_lag(&self, projector: &str, seconds: f64) {
        ::metrics::gauge!(PROJECTOR_LAG_METRIC, "projector" => projector.to_owned())
            .set(clamp_lag(seconds));
    }
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;

    fn render_after(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    fn value_of(rendered: &str, projector: &str) -> Option<f64> {
        let prefix = format!("{PROJECTOR_LAG_METRIC}{{projector=\"{projector}\"}} ");
        rendered
            .lines()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .map(|value| value.trim().parse().unwrap())
    }

    #[test]
    fn test_gauge_keeps_latest_value_per_projector() {
        // Act
        let rendered = render_after(|| {
            MetricsLagRecorder.record_lag("a", 3.0);
            MetricsLagRecorder.record_lag("a", 1.5);
            MetricsLagRecorder.record_lag("b", 9.0);
        });

        // Assert
        assert_eq!(value_of(&rendered, "a"), Some(1.5));
        assert_eq!(value_of(&rendered, "b"), Some(9.0));
        assert_eq!(value_of(&rendered, "c"), None);
    }

    #[test]
    fn test_gauge_clamps_negative_and_non_finite_values() {
        let rendered = render_after(|| {
            MetricsLagRecorder.record_lag("neg", -4.0);
            MetricsLagRecorder.record_lag("nan", f64::NAN);
        });

        assert_eq!(value_of(&rendered, "neg"), Some(0.0));
        assert_eq!(value_of(&rendered, "nan"), Some(0.0));
    }

    #[test]
    fn test_clamp_lag_passes_valid_values_through() {
        assert!((clamp_lag(2.5) - 2.5).abs() < f64::EPSILON);
        assert!(clamp_lag(f64::INFINITY).abs() < f64::EPSILON);
    }
}
