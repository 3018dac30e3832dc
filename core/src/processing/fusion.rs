use crate::prelude::{ProcessError, ProcessResult, Provenance, VelocitySource};
use crate::processing::interpolate::linear_fill;
use crate::series::velocity::VelocitySeries;
use crate::telemetry::log::LogManager;

/// Composite boat velocity for one primary source, with a per-ensemble
/// record of which source supplied each sample.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub provenance: Vec<Provenance>,
}

/// Builds composite tracks by borrowing samples from alternate navigation
/// sources wherever the primary source is invalid.
pub struct SourceFusion {
    logger: LogManager,
}

impl SourceFusion {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new(),
        }
    }

    /// Fallback order for a primary source. Bottom track prefers GGA over
    /// VTG; each GPS source prefers the other GPS source over bottom track.
    fn fallback_order(primary: VelocitySource) -> [VelocitySource; 2] {
        match primary {
            VelocitySource::BottomTrack => [VelocitySource::Gga, VelocitySource::Vtg],
            VelocitySource::Gga => [VelocitySource::Vtg, VelocitySource::BottomTrack],
            VelocitySource::Vtg => [VelocitySource::Gga, VelocitySource::BottomTrack],
        }
    }

    /// Composite track with `primary` as the preferred source. Per ensemble
    /// the chain is: primary valid, first fallback valid, second fallback
    /// valid, primary interpolated. Gaps that survive the chain are closed
    /// with a linear fill over elapsed time and attributed to interpolation.
    ///
    /// The v component always follows the u component's source so one
    /// ensemble never mixes sources between components.
    pub fn compose(
        &self,
        primary: VelocitySource,
        bt: Option<&VelocitySeries>,
        gga: Option<&VelocitySeries>,
        vtg: Option<&VelocitySeries>,
        elapsed_sec: &[f64],
    ) -> ProcessResult<CompositeResult> {
        let lookup = |source: VelocitySource| -> Option<&VelocitySeries> {
            match source {
                VelocitySource::BottomTrack => bt,
                VelocitySource::Gga => gga,
                VelocitySource::Vtg => vtg,
            }
        };

        let primary_series = lookup(primary).ok_or(ProcessError::MissingSource(primary))?;
        let n = primary_series.len();
        if elapsed_sec.len() != n {
            return Err(ProcessError::DimensionMismatch {
                expected: n,
                actual: elapsed_sec.len(),
            });
        }
        for source in Self::fallback_order(primary) {
            if let Some(series) = lookup(source) {
                if series.len() != n {
                    return Err(ProcessError::DimensionMismatch {
                        expected: n,
                        actual: series.len(),
                    });
                }
            }
        }

        let mut u = vec![f64::NAN; n];
        let mut v = vec![f64::NAN; n];
        let mut provenance = vec![Provenance::Invalid; n];

        for i in 0..n {
            if let Some((su, sv)) = valid_sample(primary_series, i) {
                u[i] = su;
                v[i] = sv;
                provenance[i] = Provenance::from(primary);
                continue;
            }
            let mut borrowed = false;
            for source in Self::fallback_order(primary) {
                if let Some(series) = lookup(source) {
                    if let Some((su, sv)) = valid_sample(series, i) {
                        u[i] = su;
                        v[i] = sv;
                        provenance[i] = Provenance::from(source);
                        borrowed = true;
                        break;
                    }
                }
            }
            if borrowed {
                continue;
            }
            // No source has a valid sample; use the primary's own
            // interpolated value when its filter chain produced one.
            let pu = primary_series.processed_u()[i];
            let pv = primary_series.processed_v()[i];
            if pu.is_finite() && pv.is_finite() {
                u[i] = pu;
                v[i] = pv;
                provenance[i] = Provenance::Interpolated;
            }
        }

        // Close the gaps no source could cover.
        let before: Vec<bool> = u.iter().map(|s| s.is_finite()).collect();
        linear_fill(elapsed_sec, &before, &mut u);
        linear_fill(elapsed_sec, &before, &mut v);
        for i in 0..n {
            if !before[i] && u[i].is_finite() && v[i].is_finite() {
                provenance[i] = Provenance::Interpolated;
            }
        }

        let borrowed = provenance
            .iter()
            .filter(|&&p| p != Provenance::from(primary) && p != Provenance::Invalid)
            .count();
        self.logger.record(&format!(
            "composite track for {}: {} of {} ensembles from alternate or interpolated data",
            primary.label(),
            borrowed,
            n
        ));

        Ok(CompositeResult { u, v, provenance })
    }

    /// Single-source track used when compositing is off: every ensemble is
    /// attributed to the source itself, its interpolation, or nothing.
    pub fn single_source(&self, series: &VelocitySeries) -> CompositeResult {
        let n = series.len();
        let mut provenance = vec![Provenance::Invalid; n];
        for i in 0..n {
            if series.validity().is_valid(i) {
                provenance[i] = Provenance::from(series.source());
            } else if series.processed_u()[i].is_finite()
                && series.processed_v()[i].is_finite()
            {
                provenance[i] = Provenance::Interpolated;
            }
        }
        CompositeResult {
            u: series.processed_u().to_vec(),
            v: series.processed_v().to_vec(),
            provenance,
        }
    }
}

impl Default for SourceFusion {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid measured sample for one ensemble, u and v together.
fn valid_sample(series: &VelocitySeries, i: usize) -> Option<(f64, f64)> {
    if !series.validity().is_valid(i) {
        return None;
    }
    let u = series.processed_u()[i];
    let v = series.processed_v()[i];
    if u.is_finite() && v.is_finite() {
        Some((u, v))
    } else {
        None
    }
}
