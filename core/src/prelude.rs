use serde::{Deserialize, Serialize};

/// Navigation source supplying a boat-velocity series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VelocitySource {
    BottomTrack,
    Gga,
    Vtg,
}

impl VelocitySource {
    pub fn label(&self) -> &'static str {
        match self {
            VelocitySource::BottomTrack => "BT",
            VelocitySource::Gga => "GGA",
            VelocitySource::Vtg => "VTG",
        }
    }
}

/// Coordinate frames in their fixed transform order.
///
/// Transforms are only permitted toward a strictly higher-order frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordFrame {
    Beam,
    Instrument,
    Ship,
    Earth,
}

impl CoordFrame {
    pub fn order(&self) -> u8 {
        match self {
            CoordFrame::Beam => 1,
            CoordFrame::Instrument => 2,
            CoordFrame::Ship => 3,
            CoordFrame::Earth => 4,
        }
    }
}

/// ADCP manufacturer tag controlling ingest quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Manufacturer {
    Trdi,
    SonTek,
}

/// Recorded origin of a fused or processed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    BottomTrack,
    Gga,
    Vtg,
    Interpolated,
    Invalid,
}

impl From<VelocitySource> for Provenance {
    fn from(source: VelocitySource) -> Self {
        match source {
            VelocitySource::BottomTrack => Provenance::BottomTrack,
            VelocitySource::Gga => Provenance::Gga,
            VelocitySource::Vtg => Provenance::Vtg,
        }
    }
}

/// Threshold policy for a validity filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterPolicy {
    /// Filter disabled; the validity row is forced true.
    Off,
    /// Fixed numeric threshold.
    Manual(f64),
    /// Threshold derived per transect from the trimmed-window statistic.
    Auto,
}

/// Gap-filling strategy for processed boat velocities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpMethod {
    /// Leave invalid samples missing.
    None,
    /// Hold the last valid sample indefinitely.
    HoldLast,
    /// Hold the last valid sample for at most nine consecutive gaps.
    Hold9,
    /// Back-fill from the next valid sample.
    HoldNext,
    /// Linear interpolation over elapsed ensemble time.
    Linear,
    /// Robust local regression fitted over elapsed ensemble time.
    Smoothed,
}

/// Transect-level faults. Per-ensemble faults (insufficient beams, degenerate
/// statistics windows, NaN arithmetic) never surface here; they are recovered
/// into NaN values or fail-open validity during the array passes.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("empty series: {0}")]
    EmptySeries(String),
    #[error("dimension mismatch: expected {expected} ensembles, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("no velocity series present for source {0:?}")]
    MissingSource(VelocitySource),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ProcessResult<T> = Result<T, ProcessError>;
