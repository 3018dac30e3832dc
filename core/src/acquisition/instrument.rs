use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// ADCP models with distinct beam-geometry handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentModel {
    RiverRay,
    RioGrande,
    StreamPro,
    SonTekM9,
}

/// Instrument description from the InstrumentData collaborator: model plus
/// the beam-to-instrument transform, one 4x4 matrix per supported carrier
/// frequency.
#[derive(Debug, Clone)]
pub struct InstrumentInfo {
    pub model: InstrumentModel,
    frequencies_hz: Vec<f64>,
    t_matrices: Vec<Array2<f64>>,
}

impl InstrumentInfo {
    pub fn new(
        model: InstrumentModel,
        frequencies_hz: Vec<f64>,
        t_matrices: Vec<Array2<f64>>,
    ) -> Self {
        Self {
            model,
            frequencies_hz,
            t_matrices,
        }
    }

    /// Fixed-frequency instrument with a single transform matrix.
    pub fn single(model: InstrumentModel, t_matrix: Array2<f64>) -> Self {
        Self {
            model,
            frequencies_hz: Vec::new(),
            t_matrices: vec![t_matrix],
        }
    }

    /// Transform matrix for the given carrier frequency. Instruments with a
    /// single matrix always return it; unknown frequencies fall back to the
    /// first matrix.
    pub fn matrix_for(&self, frequency_hz: f64) -> Option<&Array2<f64>> {
        if self.t_matrices.len() > 1 {
            if let Some(idx) = self
                .frequencies_hz
                .iter()
                .position(|&f| (f - frequency_hz).abs() < f64::EPSILON)
            {
                if idx < self.t_matrices.len() {
                    return Some(&self.t_matrices[idx]);
                }
            }
        }
        self.t_matrices.first()
    }
}
