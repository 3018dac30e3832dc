use crate::acquisition::instrument::InstrumentInfo;
use crate::acquisition::sensors::{AttitudeData, EnsembleClock};
use crate::prelude::{ProcessError, ProcessResult};

/// Everything the processing chain needs about one transect besides the
/// velocity series themselves.
#[derive(Debug, Clone)]
pub struct TransectContext {
    pub attitude: AttitudeData,
    pub instrument: InstrumentInfo,
    pub clock: EnsembleClock,
}

impl TransectContext {
    pub fn new(attitude: AttitudeData, instrument: InstrumentInfo, clock: EnsembleClock) -> Self {
        Self {
            attitude,
            instrument,
            clock,
        }
    }

    pub fn ensemble_count(&self) -> usize {
        self.clock.len()
    }

    /// Confirms the context spans `expected` ensembles.
    pub fn check_len(&self, expected: usize) -> ProcessResult<()> {
        for actual in [self.attitude.len(), self.clock.len()] {
            if actual != expected {
                return Err(ProcessError::DimensionMismatch { expected, actual });
            }
        }
        Ok(())
    }
}
