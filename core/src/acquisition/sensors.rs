use serde::{Deserialize, Serialize};

use crate::math::nan_cumsum;

/// Per-ensemble attitude readings in degrees, from the sensors collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttitudeData {
    pub heading_deg: Vec<f64>,
    pub pitch_deg: Vec<f64>,
    pub roll_deg: Vec<f64>,
}

impl AttitudeData {
    /// Level attitude with the given headings, for instruments without
    /// pitch/roll sensors.
    pub fn level(heading_deg: Vec<f64>) -> Self {
        let n = heading_deg.len();
        Self {
            heading_deg,
            pitch_deg: vec![0.0; n],
            roll_deg: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.heading_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heading_deg.is_empty()
    }
}

/// Per-ensemble timing from the instrument clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleClock {
    pub ens_duration_sec: Vec<f64>,
}

impl EnsembleClock {
    pub fn new(ens_duration_sec: Vec<f64>) -> Self {
        Self { ens_duration_sec }
    }

    /// Elapsed time at each ensemble; missing durations contribute zero.
    pub fn elapsed_sec(&self) -> Vec<f64> {
        nan_cumsum(&self.ens_duration_sec)
    }

    pub fn len(&self) -> usize {
        self.ens_duration_sec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ens_duration_sec.is_empty()
    }
}
