use crate::acquisition::context::TransectContext;
use crate::math::nan_cumsum;
use crate::prelude::{
    CoordFrame, FilterPolicy, InterpMethod, ProcessError, ProcessResult, Provenance,
    VelocitySource,
};
use crate::processing::filter::FilterEngine;
use crate::processing::fusion::SourceFusion;
use crate::processing::transform::CoordinateTransformer;
use crate::series::velocity::VelocitySeries;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;

/// Cumulative ship track derived from the selected source's processed
/// velocities.
#[derive(Debug, Clone, PartialEq)]
pub struct BoatTrack {
    /// Cumulative east displacement per ensemble, m.
    pub track_x_m: Vec<f64>,
    /// Cumulative north displacement per ensemble, m.
    pub track_y_m: Vec<f64>,
    /// Cumulative along-track distance per ensemble, m.
    pub distance_m: Vec<f64>,
    /// Distance made good per ensemble, m.
    pub dmg_m: Vec<f64>,
}

/// All navigation sources for one transect plus the reference selection.
///
/// Holds the per-source series, runs the filter and interpolation chain on
/// each of them, and keeps every source's composite track current so a
/// reference change never needs a second processing pass.
#[derive(Debug, Clone)]
pub struct BoatVelocityBundle {
    bt: Option<VelocitySeries>,
    gga: Option<VelocitySeries>,
    vtg: Option<VelocitySeries>,
    selected: VelocitySource,
    composite: bool,
}

impl BoatVelocityBundle {
    pub fn new(selected: VelocitySource) -> Self {
        Self {
            bt: None,
            gga: None,
            vtg: None,
            selected,
            composite: false,
        }
    }

    pub fn add_source(&mut self, series: VelocitySeries) {
        match series.source() {
            VelocitySource::BottomTrack => self.bt = Some(series),
            VelocitySource::Gga => self.gga = Some(series),
            VelocitySource::Vtg => self.vtg = Some(series),
        }
    }

    pub fn source(&self, source: VelocitySource) -> Option<&VelocitySeries> {
        match source {
            VelocitySource::BottomTrack => self.bt.as_ref(),
            VelocitySource::Gga => self.gga.as_ref(),
            VelocitySource::Vtg => self.vtg.as_ref(),
        }
    }

    pub fn source_mut(&mut self, source: VelocitySource) -> Option<&mut VelocitySeries> {
        match source {
            VelocitySource::BottomTrack => self.bt.as_mut(),
            VelocitySource::Gga => self.gga.as_mut(),
            VelocitySource::Vtg => self.vtg.as_mut(),
        }
    }

    pub fn selected(&self) -> VelocitySource {
        self.selected
    }

    pub fn selected_series(&self) -> Option<&VelocitySeries> {
        self.source(self.selected)
    }

    pub fn composite(&self) -> bool {
        self.composite
    }

    fn sources_mut(&mut self) -> impl Iterator<Item = &mut VelocitySeries> {
        [self.bt.as_mut(), self.gga.as_mut(), self.vtg.as_mut()]
            .into_iter()
            .flatten()
    }

    /// Select the navigation reference without reprocessing. Fails when the
    /// requested source was never ingested.
    pub fn set_nav_reference(&mut self, source: VelocitySource) -> ProcessResult<()> {
        if self.source(source).is_none() {
            return Err(ProcessError::MissingSource(source));
        }
        self.selected = source;
        LogManager::new().record(&format!("navigation reference set to {}", source.label()));
        Ok(())
    }

    /// Select the navigation reference and bring every source current.
    pub fn change_nav_reference(
        &mut self,
        source: VelocitySource,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        self.set_nav_reference(source)?;
        self.reprocess(ctx)
    }

    /// Transform every source toward `target` and reprocess from the raw
    /// data. Sources already at or above `target` are left alone.
    pub fn change_coord_sys(
        &mut self,
        target: CoordFrame,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        let transformer = CoordinateTransformer::new();
        for series in self.sources_mut() {
            if series.frame().order() < target.order() {
                transformer.change_frame(series, target, ctx)?;
            }
        }
        self.reprocess(ctx)
    }

    pub fn set_composite(&mut self, on: bool, ctx: &TransectContext) -> ProcessResult<()> {
        self.composite = on;
        self.reprocess(ctx)
    }

    pub fn set_difference_filter(
        &mut self,
        source: VelocitySource,
        policy: FilterPolicy,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        self.source_mut(source)
            .ok_or(ProcessError::MissingSource(source))?
            .set_difference_filter(policy);
        self.reprocess(ctx)
    }

    pub fn set_vertical_filter(
        &mut self,
        source: VelocitySource,
        policy: FilterPolicy,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        self.source_mut(source)
            .ok_or(ProcessError::MissingSource(source))?
            .set_vertical_filter(policy);
        self.reprocess(ctx)
    }

    pub fn set_interp_method(
        &mut self,
        source: VelocitySource,
        method: InterpMethod,
        ctx: &TransectContext,
    ) -> ProcessResult<()> {
        self.source_mut(source)
            .ok_or(ProcessError::MissingSource(source))?
            .set_interp_method(method);
        self.reprocess(ctx)
    }

    /// Run the full chain on every source: filters, interpolation, and the
    /// per-source composite tracks. Always starts from the raw data, so
    /// repeated calls with unchanged settings land on identical output.
    pub fn reprocess(&mut self, ctx: &TransectContext) -> ProcessResult<()> {
        let engine = FilterEngine::new();
        let metrics = MetricsRecorder::global();
        let mut ensembles = 0usize;
        let mut invalid = 0usize;

        for series in self.sources_mut() {
            engine.apply_all(series, ctx)?;
            ensembles += series.len();
            invalid += series.invalid_count();
        }
        metrics.record_ensembles(ensembles);
        metrics.record_invalid(invalid);

        self.composite_tracks(ctx)
    }

    /// Refresh the composite track of every ingested source. With
    /// compositing off each source keeps its own samples and provenance.
    fn composite_tracks(&mut self, ctx: &TransectContext) -> ProcessResult<()> {
        let fusion = SourceFusion::new();
        let elapsed = ctx.clock.elapsed_sec();

        for source in [
            VelocitySource::BottomTrack,
            VelocitySource::Gga,
            VelocitySource::Vtg,
        ] {
            if self.source(source).is_none() {
                continue;
            }
            let result = if self.composite {
                fusion.compose(
                    source,
                    self.bt.as_ref(),
                    self.gga.as_ref(),
                    self.vtg.as_ref(),
                    &elapsed,
                )?
            } else {
                fusion.single_source(self.source(source).unwrap())
            };
            let series = self.source_mut(source).unwrap();
            series.set_processed(result.u, result.v)?;
            series.set_provenance(result.provenance)?;
        }
        Ok(())
    }

    /// Ship track from the selected source. Displacements integrate the
    /// processed velocities over the ensemble durations; invalid ensembles
    /// contribute no displacement. Distance made good is the straight-line
    /// distance from the start to each ensemble's position.
    pub fn compute_boat_track(&self, ctx: &TransectContext) -> ProcessResult<BoatTrack> {
        // Fall back to bottom track when the selected source was never
        // ingested.
        let series = self
            .selected_series()
            .or_else(|| self.source(VelocitySource::BottomTrack))
            .ok_or(ProcessError::MissingSource(self.selected))?;
        let n = series.len();
        ctx.check_len(n)?;

        let durations = &ctx.clock.ens_duration_sec;
        let dx: Vec<f64> = (0..n)
            .map(|i| {
                let step = series.processed_u()[i] * durations[i];
                if step.is_finite() {
                    step
                } else {
                    f64::NAN
                }
            })
            .collect();
        let dy: Vec<f64> = (0..n)
            .map(|i| {
                let step = series.processed_v()[i] * durations[i];
                if step.is_finite() {
                    step
                } else {
                    f64::NAN
                }
            })
            .collect();

        let track_x_m = nan_cumsum(&dx);
        let track_y_m = nan_cumsum(&dy);
        let step_lengths: Vec<f64> = dx
            .iter()
            .zip(&dy)
            .map(|(&x, &y)| {
                if x.is_finite() && y.is_finite() {
                    x.hypot(y)
                } else {
                    f64::NAN
                }
            })
            .collect();
        let distance_m = nan_cumsum(&step_lengths);
        let dmg_m: Vec<f64> = track_x_m
            .iter()
            .zip(&track_y_m)
            .map(|(&x, &y)| x.hypot(y))
            .collect();

        Ok(BoatTrack {
            track_x_m,
            track_y_m,
            distance_m,
            dmg_m,
        })
    }

    /// Per-ensemble provenance of the selected source's processed track.
    pub fn provenance(&self) -> ProcessResult<&[Provenance]> {
        self.selected_series()
            .map(|series| series.provenance())
            .ok_or(ProcessError::MissingSource(self.selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::instrument::{InstrumentInfo, InstrumentModel};
    use crate::acquisition::payload::{BeamPolicy, GpsAncillary, RawNavInput};
    use crate::acquisition::sensors::{AttitudeData, EnsembleClock};
    use crate::prelude::Manufacturer;
    use ndarray::Array2;

    fn context(n: usize) -> TransectContext {
        TransectContext::new(
            AttitudeData::level(vec![0.0; n]),
            InstrumentInfo::single(InstrumentModel::RioGrande, Array2::eye(4)),
            EnsembleClock::new(vec![1.0; n]),
        )
    }

    fn bt_series(u: Vec<f64>, error: Vec<f64>) -> VelocitySeries {
        let n = u.len();
        let row_u: Vec<f64> = u.iter().map(|s| -s).collect();
        let row_v = vec![0.0; n];
        VelocitySeries::from_input(RawNavInput::bottom_track(
            Manufacturer::Trdi,
            vec![row_u, row_v, vec![0.0; n], error],
            vec![600_000.0],
            CoordFrame::Earth,
            BeamPolicy::Auto,
            "Mode 12",
        ))
        .unwrap()
    }

    fn gps_series(source: VelocitySource, u: Vec<f64>) -> VelocitySeries {
        let n = u.len();
        VelocitySeries::from_input(RawNavInput::gps(
            Manufacturer::Trdi,
            source,
            vec![u, vec![0.0; n]],
            GpsAncillary::default(),
        ))
        .unwrap()
    }

    #[test]
    fn nav_reference_requires_an_ingested_source() {
        let mut bundle = BoatVelocityBundle::new(VelocitySource::BottomTrack);
        bundle.add_source(bt_series(vec![1.0, 1.0], vec![0.0, 0.0]));
        assert!(matches!(
            bundle.set_nav_reference(VelocitySource::Gga),
            Err(ProcessError::MissingSource(VelocitySource::Gga))
        ));
        bundle.set_nav_reference(VelocitySource::BottomTrack).unwrap();
        assert_eq!(bundle.selected(), VelocitySource::BottomTrack);
    }

    #[test]
    fn filter_interpolate_chain_end_to_end() {
        // One missing sample, one error-velocity spike; manual threshold 5
        // drops the spike and hold-last fills both gaps from the left.
        let nan = f64::NAN;
        let mut bundle = BoatVelocityBundle::new(VelocitySource::BottomTrack);
        bundle.add_source(bt_series(
            vec![1.0, 1.0, nan, 1.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0, 20.0],
        ));
        let ctx = context(5);
        {
            let series = bundle
                .source_mut(VelocitySource::BottomTrack)
                .unwrap();
            series.set_difference_filter(FilterPolicy::Manual(5.0));
            series.set_interp_method(InterpMethod::HoldLast);
        }
        bundle.reprocess(&ctx).unwrap();

        let series = bundle.selected_series().unwrap();
        for &value in series.processed_u() {
            assert!((value - 1.0).abs() < 1e-12);
        }
        assert_eq!(
            series.provenance(),
            &[
                Provenance::BottomTrack,
                Provenance::BottomTrack,
                Provenance::Interpolated,
                Provenance::BottomTrack,
                Provenance::Interpolated,
            ]
        );
    }

    #[test]
    fn composite_borrows_from_alternate_sources() {
        let nan = f64::NAN;
        let mut bundle = BoatVelocityBundle::new(VelocitySource::BottomTrack);
        bundle.add_source(bt_series(
            vec![1.0, nan, 1.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ));
        bundle.add_source(gps_series(VelocitySource::Gga, vec![2.0, 2.0, 2.0, 2.0]));
        let ctx = context(4);
        bundle.set_composite(true, &ctx).unwrap();

        let series = bundle.selected_series().unwrap();
        assert_eq!(series.provenance()[1], Provenance::Gga);
        assert!((series.processed_u()[1] - 2.0).abs() < 1e-12);

        // The GGA source's own composite stays GGA-first.
        let gga = bundle.source(VelocitySource::Gga).unwrap();
        assert!(gga.provenance().iter().all(|&p| p == Provenance::Gga));
    }

    #[test]
    fn reprocessing_twice_is_idempotent() {
        let nan = f64::NAN;
        let mut bundle = BoatVelocityBundle::new(VelocitySource::BottomTrack);
        bundle.add_source(bt_series(
            vec![1.0, nan, 3.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ));
        let ctx = context(4);
        bundle
            .set_interp_method(
                VelocitySource::BottomTrack,
                InterpMethod::Linear,
                &ctx,
            )
            .unwrap();
        let first = bundle.selected_series().unwrap().processed_u().to_vec();
        bundle.reprocess(&ctx).unwrap();
        let second = bundle.selected_series().unwrap().processed_u().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn boat_track_integrates_processed_velocity() {
        let mut bundle = BoatVelocityBundle::new(VelocitySource::BottomTrack);
        bundle.add_source(bt_series(
            vec![1.0, 1.0, -1.0, -1.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ));
        let ctx = context(4);
        bundle.reprocess(&ctx).unwrap();
        let track = bundle.compute_boat_track(&ctx).unwrap();

        assert!((track.track_x_m[1] - 2.0).abs() < 1e-12);
        // The boat returns to its start: distance keeps accumulating while
        // distance made good returns to zero.
        assert!((track.track_x_m[3] - 0.0).abs() < 1e-12);
        assert!((track.distance_m[3] - 4.0).abs() < 1e-12);
        assert!(track.dmg_m[3].abs() < 1e-12);
    }
}
