use std::sync::{Mutex, OnceLock};

/// Counters describing how much of a transect survived the validity filters.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

struct Metrics {
    ensembles: usize,
    invalid: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                ensembles: 0,
                invalid: 0,
            }),
        }
    }

    /// Process-wide recorder shared by the processing engines.
    pub fn global() -> &'static MetricsRecorder {
        static GLOBAL: OnceLock<MetricsRecorder> = OnceLock::new();
        GLOBAL.get_or_init(MetricsRecorder::new)
    }

    pub fn record_ensembles(&self, count: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.ensembles += count;
        }
    }

    pub fn record_invalid(&self, count: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.invalid += count;
        }
    }

    pub fn snapshot(&self) -> (usize, usize) {
        if let Ok(metrics) = self.inner.lock() {
            (metrics.ensembles, metrics.invalid)
        } else {
            (0, 0)
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
