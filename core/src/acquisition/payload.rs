use serde::{Deserialize, Serialize};

use crate::prelude::{CoordFrame, Manufacturer, VelocitySource};

/// Minimum-beam policy for bottom-track ensembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeamPolicy {
    /// Keep whichever beam solution the instrument reported.
    Auto,
    /// Accept 3-beam solutions.
    Min3,
    /// Require all four beams.
    Min4,
}

/// Satellite-quality readings accompanying a GPS velocity source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpsAncillary {
    /// Differential correction quality code per ensemble (1, 2, 4, ...).
    pub quality: Vec<f64>,
    pub altitude_m: Vec<f64>,
    pub hdop: Vec<f64>,
}

/// Raw per-source velocity block handed over by the vendor-file parsers.
///
/// `velocity` carries 4 rows for bottom track (beams 1-4 in the beam frame,
/// u/v/w/d otherwise) and 2 rows (east/north) for GPS sources. All rows span
/// the same ensemble count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNavInput {
    pub manufacturer: Manufacturer,
    pub velocity: Vec<Vec<f64>>,
    /// Carrier frequency per ensemble; a single entry means a fixed-frequency
    /// instrument.
    pub frequency_hz: Vec<f64>,
    pub coord_frame: CoordFrame,
    pub nav_ref: VelocitySource,
    pub beam_policy: BeamPolicy,
    pub bottom_mode: String,
    pub gps: Option<GpsAncillary>,
}

impl RawNavInput {
    /// Convenience constructor for a bottom-track block.
    pub fn bottom_track(
        manufacturer: Manufacturer,
        velocity: Vec<Vec<f64>>,
        frequency_hz: Vec<f64>,
        coord_frame: CoordFrame,
        beam_policy: BeamPolicy,
        bottom_mode: &str,
    ) -> Self {
        Self {
            manufacturer,
            velocity,
            frequency_hz,
            coord_frame,
            nav_ref: VelocitySource::BottomTrack,
            beam_policy,
            bottom_mode: bottom_mode.to_string(),
            gps: None,
        }
    }

    /// Convenience constructor for a GPS block (GGA or VTG), always earth
    /// referenced.
    pub fn gps(
        manufacturer: Manufacturer,
        nav_ref: VelocitySource,
        velocity: Vec<Vec<f64>>,
        gps: GpsAncillary,
    ) -> Self {
        Self {
            manufacturer,
            velocity,
            frequency_hz: Vec::new(),
            coord_frame: CoordFrame::Earth,
            nav_ref,
            beam_policy: BeamPolicy::Auto,
            bottom_mode: "Variable".to_string(),
            gps: Some(gps),
        }
    }
}
