use crate::acquisition::context::TransectContext;
use crate::acquisition::payload::BeamPolicy;
use crate::math::{lowess, nan_mean, run_std_trim};
use crate::prelude::{FilterPolicy, ProcessResult, VelocitySource};
use crate::processing::interpolate::InterpolationEngine;
use crate::series::validity::ValidityLayer;
use crate::series::velocity::VelocitySeries;
use crate::telemetry::log::LogManager;

/// Multiplier applied to the trimmed-window statistic for `Auto` thresholds,
/// shared with the water-track engine.
const AUTO_MULTIPLIER: f64 = 5.0;
/// `Auto` thresholds are rounded to this precision.
const THRESHOLD_PRECISION: f64 = 0.01;
/// Half-width of the trimmed-statistic window, in ensembles.
const TRIM_HALF_WIDTH: usize = 10;
/// Smoothing-filter span, in samples (scaled by the series length).
const SMOOTH_SPAN_SAMPLES: f64 = 10.0;
/// Default altitude-change threshold for the `Auto` policy, in metres.
const ALTITUDE_CHANGE_DEFAULT_M: f64 = 3.0;
/// Default HDOP ceiling for the `Auto` policy.
const HDOP_MAX_DEFAULT: f64 = 2.5;

/// Applies the layered validity filters to a velocity series. Each filter
/// writes exactly one validity row; the composite row is recomputed by the
/// layer setter.
pub struct FilterEngine {
    logger: LogManager,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new(),
        }
    }

    /// Run every filter relevant to the series' source, then re-apply the
    /// configured interpolation so the processed copies stay consistent.
    pub fn apply_all(&self, series: &mut VelocitySeries, ctx: &TransectContext) -> ProcessResult<()> {
        match series.source() {
            VelocitySource::BottomTrack => {
                self.beam_filter(series)?;
                self.difference_filter(series)?;
                self.vertical_filter(series)?;
            }
            _ => {
                self.gps_quality_filter(series)?;
                self.gps_altitude_filter(series)?;
                self.gps_hdop_filter(series)?;
            }
        }
        self.smooth_filter(series, ctx)?;

        self.logger.record(&format!(
            "{} filters left {} of {} ensembles invalid",
            series.source().label(),
            series.invalid_count(),
            series.len()
        ));

        InterpolationEngine::new().apply(series, &ctx.clock)
    }

    /// Beam-count filter for bottom track. `Auto` keeps whichever solution
    /// the instrument reported, so the row mirrors raw validity.
    pub fn beam_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let n = series.len();
        let row = match series.beam_policy() {
            BeamPolicy::Auto => series.validity().layer(ValidityLayer::Raw).to_vec(),
            BeamPolicy::Min3 => (0..n).map(|i| self.beam_count(series, i) >= 3).collect(),
            BeamPolicy::Min4 => (0..n).map(|i| self.beam_count(series, i) >= 4).collect(),
        };
        series.set_validity_layer(ValidityLayer::Beam, row)
    }

    fn beam_count(&self, series: &VelocitySeries, ensemble: usize) -> usize {
        series
            .raw_rows()
            .iter()
            .filter(|row| row[ensemble].is_finite())
            .count()
    }

    /// Difference-velocity (error-velocity) filter.
    pub fn difference_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let threshold = self.resolve_threshold(series.difference_filter(), series.d());
        series.note_difference_threshold(threshold);
        let row = Self::threshold_row(series.d(), threshold);
        series.set_validity_layer(ValidityLayer::Difference, row)
    }

    /// Vertical-velocity filter.
    pub fn vertical_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let threshold = self.resolve_threshold(series.vertical_filter(), series.w());
        series.note_vertical_threshold(threshold);
        let row = Self::threshold_row(series.w(), threshold);
        series.set_validity_layer(ValidityLayer::Vertical, row)
    }

    fn resolve_threshold(&self, policy: FilterPolicy, values: &[f64]) -> f64 {
        match policy {
            FilterPolicy::Off => f64::NAN,
            FilterPolicy::Manual(threshold) => threshold,
            FilterPolicy::Auto => {
                let stds = run_std_trim(TRIM_HALF_WIDTH, values);
                let base = nan_mean(&stds) * AUTO_MULTIPLIER;
                let threshold = (base / THRESHOLD_PRECISION).round() * THRESHOLD_PRECISION;
                self.logger
                    .record(&format!("auto threshold {:.2}", threshold));
                threshold
            }
        }
    }

    /// A `NaN` threshold (filter off, or a degenerate statistic) fails open:
    /// the comparison is false and every sample stays valid.
    fn threshold_row(values: &[f64], threshold: f64) -> Vec<bool> {
        values.iter().map(|v| !(v.abs() > threshold)).collect()
    }

    /// Differential-quality filter: accepts codes at or above the configured
    /// minimum. Ensembles with no quality code have no satellite fix and are
    /// invalid.
    pub fn gps_quality_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let minimum = series.gps_quality_min();
        let row = match series.gps() {
            Some(ancillary) if !ancillary.quality.is_empty() => {
                ancillary.quality.iter().map(|&q| q >= minimum).collect()
            }
            _ => vec![true; series.len()],
        };
        series.set_validity_layer(ValidityLayer::Difference, row)
    }

    /// Altitude-change filter: invalid where the altitude deviates from the
    /// transect mean beyond the threshold.
    pub fn gps_altitude_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let change = match series.gps_altitude_filter() {
            FilterPolicy::Off => {
                series.clear_validity_layer(ValidityLayer::Vertical);
                return Ok(());
            }
            FilterPolicy::Manual(change) => change,
            FilterPolicy::Auto => ALTITUDE_CHANGE_DEFAULT_M,
        };
        let row = match series.gps() {
            Some(ancillary) if !ancillary.altitude_m.is_empty() => {
                let mean = nan_mean(&ancillary.altitude_m);
                ancillary
                    .altitude_m
                    .iter()
                    .map(|&alt| !((alt - mean).abs() > change))
                    .collect()
            }
            _ => vec![true; series.len()],
        };
        series.set_validity_layer(ValidityLayer::Vertical, row)
    }

    /// HDOP filter: invalid where HDOP exceeds the ceiling or departs from
    /// the transect mean by more than the change threshold.
    pub fn gps_hdop_filter(&self, series: &mut VelocitySeries) -> ProcessResult<()> {
        let max = match series.gps_hdop_filter() {
            FilterPolicy::Off => {
                series.clear_validity_layer(ValidityLayer::Beam);
                return Ok(());
            }
            FilterPolicy::Manual(max) => max,
            FilterPolicy::Auto => HDOP_MAX_DEFAULT,
        };
        let change_max = series.gps_hdop_change_max();
        let row = match series.gps() {
            Some(ancillary) if !ancillary.hdop.is_empty() => {
                let mean = nan_mean(&ancillary.hdop);
                ancillary
                    .hdop
                    .iter()
                    .map(|&h| !(h > max) && !((h - mean).abs() > change_max))
                    .collect()
            }
            _ => vec![true; series.len()],
        };
        series.set_validity_layer(ValidityLayer::Beam, row)
    }

    /// Smoothing filter: flags samples whose speed departs from a robust
    /// locally smoothed speed by more than the residual spread allows.
    pub fn smooth_filter(
        &self,
        series: &mut VelocitySeries,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        let n = series.len();
        if !series.smooth_filter_on() {
            series.clear_validity_layer(ValidityLayer::Smooth);
            series.note_smooth_limits(
                vec![f64::NAN; n],
                vec![f64::NAN; n],
                vec![f64::NAN; n],
            );
            return Ok(());
        }

        ctx.check_len(n)?;
        let ens_time = ctx.clock.elapsed_sec();
        let speed: Vec<f64> = series
            .u()
            .iter()
            .zip(series.v().iter())
            .map(|(&u, &v)| (u * u + v * v).sqrt())
            .collect();

        let smooth = lowess(&ens_time, &speed, SMOOTH_SPAN_SAMPLES / n as f64);
        let residual: Vec<f64> = speed
            .iter()
            .zip(smooth.iter())
            .map(|(&s, &m)| s - m)
            .collect();
        let spread = run_std_trim(TRIM_HALF_WIDTH, &residual);

        let mut lower = vec![f64::NAN; n];
        let mut upper = vec![f64::NAN; n];
        let mut row = vec![true; n];
        for i in 0..n {
            lower[i] = smooth[i] - AUTO_MULTIPLIER * spread[i];
            upper[i] = smooth[i] + AUTO_MULTIPLIER * spread[i];
            // NaN limits fail open.
            row[i] = !(speed[i] < lower[i]) && !(speed[i] > upper[i]);
        }
        series.note_smooth_limits(smooth, lower, upper);
        series.set_validity_layer(ValidityLayer::Smooth, row)
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}
