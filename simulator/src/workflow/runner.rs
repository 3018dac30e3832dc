use anyhow::Context;
use log::info;
use rivelcore::prelude::{CoordFrame, FilterPolicy};
use rivelcore::series::{BoatTrack, BoatVelocityBundle, VelocitySeries};
use rivelcore::{Provenance, VelocitySource};

use crate::generator::profile::SyntheticTransect;
use crate::workflow::config::WorkflowConfig;

pub struct WorkflowResult {
    pub ensembles: usize,
    pub invalid_count: usize,
    /// Per-ensemble provenance of the selected track, counted per label.
    pub provenance_counts: Vec<(String, usize)>,
    pub track: BoatTrack,
}

impl WorkflowResult {
    /// Total along-track distance, m.
    pub fn distance_m(&self) -> f64 {
        self.track
            .distance_m
            .last()
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Final distance made good, m.
    pub fn dmg_m(&self) -> f64 {
        self.track.dmg_m.last().copied().unwrap_or(f64::NAN)
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Run the full chain on a synthetic transect: ingest all three sources,
    /// transform bottom track to earth coordinates, filter, interpolate,
    /// fuse, and integrate the selected track.
    pub fn execute(&self, transect: &SyntheticTransect) -> anyhow::Result<WorkflowResult> {
        let ctx = &transect.context;

        let mut bundle = BoatVelocityBundle::new(self.config.nav_source()?);
        bundle.add_source(
            VelocitySeries::from_input(transect.bottom_track.clone())
                .context("ingesting bottom track")?,
        );
        bundle.add_source(
            VelocitySeries::from_input(transect.gga.clone()).context("ingesting GGA")?,
        );
        bundle.add_source(
            VelocitySeries::from_input(transect.vtg.clone()).context("ingesting VTG")?,
        );

        for source in [
            VelocitySource::BottomTrack,
            VelocitySource::Gga,
            VelocitySource::Vtg,
        ] {
            if let Some(series) = bundle.source_mut(source) {
                if source == VelocitySource::BottomTrack {
                    series.set_difference_filter(self.config.difference_filter);
                    series.set_vertical_filter(self.config.vertical_filter);
                } else {
                    series.set_gps_altitude_filter(FilterPolicy::Auto);
                    series.set_gps_hdop_filter(FilterPolicy::Auto, 1.0);
                }
                series.set_interp_method(self.config.interp_method);
            }
        }

        bundle
            .change_coord_sys(CoordFrame::Earth, ctx)
            .context("transforming to earth coordinates")?;
        bundle
            .set_composite(self.config.composite, ctx)
            .context("compositing tracks")?;

        let series = bundle
            .selected_series()
            .context("selected source missing after processing")?;
        let ensembles = series.len();
        let invalid_count = series.invalid_count();

        let mut provenance_counts: Vec<(String, usize)> = Vec::new();
        for label in [
            Provenance::BottomTrack,
            Provenance::Gga,
            Provenance::Vtg,
            Provenance::Interpolated,
            Provenance::Invalid,
        ] {
            let count = series.provenance().iter().filter(|&&p| p == label).count();
            if count > 0 {
                provenance_counts.push((format!("{label:?}"), count));
            }
        }

        let track = bundle
            .compute_boat_track(ctx)
            .context("integrating the boat track")?;

        info!(
            "workflow processed {} ensembles, {} invalid on the selected source",
            ensembles, invalid_count
        );

        Ok(WorkflowResult {
            ensembles,
            invalid_count,
            provenance_counts,
            track,
        })
    }
}
