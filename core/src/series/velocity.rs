use crate::acquisition::payload::{BeamPolicy, GpsAncillary, RawNavInput};
use crate::prelude::{
    CoordFrame, FilterPolicy, InterpMethod, Manufacturer, ProcessError, ProcessResult, Provenance,
    VelocitySource,
};
use crate::series::validity::{ValidityLayer, ValidityLayers};

/// SonTek instruments flag missing samples with large sentinel magnitudes.
const SONTEK_SENTINEL_MPS: f64 = 100.0;

/// One navigation source's boat-velocity series for a single transect.
///
/// `raw_vel` keeps the rows exactly as ingested (beam order or u/v/w/d) so a
/// coordinate transform can always be recomputed from the original frame.
/// The u/v/w/d components are derived from it, and `processed_u`/`processed_v`
/// are the working copies written by interpolation and fusion.
#[derive(Debug, Clone)]
pub struct VelocitySeries {
    source: VelocitySource,
    manufacturer: Manufacturer,
    raw_vel: Vec<Vec<f64>>,
    orig_frame: CoordFrame,
    frame: CoordFrame,
    frequency_hz: Vec<f64>,
    bottom_mode: String,

    u_mps: Vec<f64>,
    v_mps: Vec<f64>,
    w_mps: Vec<f64>,
    d_mps: Vec<f64>,
    processed_u: Vec<f64>,
    processed_v: Vec<f64>,

    validity: ValidityLayers,
    provenance: Vec<Provenance>,
    gps: Option<GpsAncillary>,

    // Filter and interpolation settings.
    beam_policy: BeamPolicy,
    difference_filter: FilterPolicy,
    vertical_filter: FilterPolicy,
    smooth_filter_on: bool,
    gps_quality_min: f64,
    gps_altitude_filter: FilterPolicy,
    gps_hdop_filter: FilterPolicy,
    gps_hdop_change_max: f64,
    interp_method: InterpMethod,

    // Diagnostics recorded by the filter engine.
    difference_threshold: f64,
    vertical_threshold: f64,
    smooth_speed: Vec<f64>,
    smooth_upper_limit: Vec<f64>,
    smooth_lower_limit: Vec<f64>,
}

impl VelocitySeries {
    /// Build a series from a parsed vendor block, applying ingest screening,
    /// the bottom-track sign convention, per-source default filter settings,
    /// and raw-validity seeding.
    pub fn from_input(input: RawNavInput) -> ProcessResult<Self> {
        let RawNavInput {
            manufacturer,
            mut velocity,
            frequency_hz,
            coord_frame,
            nav_ref,
            beam_policy,
            bottom_mode,
            gps,
        } = input;

        if velocity.is_empty() || velocity[0].is_empty() {
            return Err(ProcessError::EmptySeries(nav_ref.label().to_string()));
        }
        let n = velocity[0].len();
        for row in &velocity {
            if row.len() != n {
                return Err(ProcessError::DimensionMismatch {
                    expected: n,
                    actual: row.len(),
                });
            }
        }
        if let Some(ancillary) = &gps {
            for row in [&ancillary.quality, &ancillary.altitude_m, &ancillary.hdop] {
                if !row.is_empty() && row.len() != n {
                    return Err(ProcessError::DimensionMismatch {
                        expected: n,
                        actual: row.len(),
                    });
                }
            }
        }

        if manufacturer == Manufacturer::SonTek {
            for row in velocity.iter_mut() {
                for value in row.iter_mut() {
                    if !value.is_finite() || value.abs() > SONTEK_SENTINEL_MPS {
                        *value = f64::NAN;
                    }
                }
            }
        }

        let (u_mps, v_mps, w_mps, d_mps, min_components) = match nav_ref {
            VelocitySource::BottomTrack => {
                if velocity.len() != 4 {
                    return Err(ProcessError::InvalidConfig(format!(
                        "bottom track requires 4 velocity rows, got {}",
                        velocity.len()
                    )));
                }
                // Bottom track senses the streambed moving past the ADCP;
                // downstream consumers expect boat motion.
                let u: Vec<f64> = velocity[0].iter().map(|v| -v).collect();
                let v: Vec<f64> = velocity[1].iter().map(|v| -v).collect();
                (u, v, velocity[2].clone(), velocity[3].clone(), 3usize)
            }
            _ => {
                if velocity.len() < 2 {
                    return Err(ProcessError::InvalidConfig(format!(
                        "GPS source requires 2 velocity rows, got {}",
                        velocity.len()
                    )));
                }
                (
                    velocity[0].clone(),
                    velocity[1].clone(),
                    vec![f64::NAN; n],
                    vec![f64::NAN; n],
                    2usize,
                )
            }
        };

        let mut validity = ValidityLayers::new(n);
        // A usable ensemble needs enough finite components overall. Outside
        // the beam frame the rows are velocity components, so both
        // horizontal components must be present as well; in the beam frame
        // any three beams reconstruct them.
        let raw_valid: Vec<bool> = (0..n)
            .map(|i| {
                let finite = velocity.iter().filter(|row| row[i].is_finite()).count();
                finite >= min_components
                    && (coord_frame == CoordFrame::Beam
                        || (velocity[0][i].is_finite() && velocity[1][i].is_finite()))
            })
            .collect();
        validity.set_layer(ValidityLayer::Raw, raw_valid)?;

        let provenance: Vec<Provenance> = validity
            .composite()
            .iter()
            .map(|&valid| {
                if valid {
                    Provenance::from(nav_ref)
                } else {
                    Provenance::Invalid
                }
            })
            .collect();

        Ok(Self {
            source: nav_ref,
            manufacturer,
            raw_vel: velocity,
            orig_frame: coord_frame,
            frame: coord_frame,
            frequency_hz,
            bottom_mode,
            processed_u: u_mps.clone(),
            processed_v: v_mps.clone(),
            u_mps,
            v_mps,
            w_mps,
            d_mps,
            validity,
            provenance,
            gps,
            beam_policy,
            difference_filter: FilterPolicy::Off,
            vertical_filter: FilterPolicy::Off,
            smooth_filter_on: false,
            gps_quality_min: 2.0,
            gps_altitude_filter: FilterPolicy::Off,
            gps_hdop_filter: FilterPolicy::Off,
            gps_hdop_change_max: 1.0,
            interp_method: InterpMethod::None,
            difference_threshold: f64::NAN,
            vertical_threshold: f64::NAN,
            smooth_speed: vec![f64::NAN; n],
            smooth_upper_limit: vec![f64::NAN; n],
            smooth_lower_limit: vec![f64::NAN; n],
        })
    }

    pub fn len(&self) -> usize {
        self.u_mps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u_mps.is_empty()
    }

    pub fn source(&self) -> VelocitySource {
        self.source
    }

    pub fn manufacturer(&self) -> Manufacturer {
        self.manufacturer
    }

    pub fn frame(&self) -> CoordFrame {
        self.frame
    }

    pub fn orig_frame(&self) -> CoordFrame {
        self.orig_frame
    }

    pub fn bottom_mode(&self) -> &str {
        &self.bottom_mode
    }

    /// Carrier frequency for one ensemble; fixed-frequency instruments carry
    /// a single entry.
    pub fn frequency_at(&self, ensemble: usize) -> f64 {
        self.frequency_hz
            .get(ensemble)
            .or_else(|| self.frequency_hz.first())
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn u(&self) -> &[f64] {
        &self.u_mps
    }

    pub fn v(&self) -> &[f64] {
        &self.v_mps
    }

    pub fn w(&self) -> &[f64] {
        &self.w_mps
    }

    pub fn d(&self) -> &[f64] {
        &self.d_mps
    }

    pub fn processed_u(&self) -> &[f64] {
        &self.processed_u
    }

    pub fn processed_v(&self) -> &[f64] {
        &self.processed_v
    }

    pub fn validity(&self) -> &ValidityLayers {
        &self.validity
    }

    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }

    pub fn gps(&self) -> Option<&GpsAncillary> {
        self.gps.as_ref()
    }

    pub fn invalid_count(&self) -> usize {
        self.validity.invalid_count()
    }

    /// Original ingested rows (beam order or u/v/w/d) for one ensemble.
    pub fn raw_column(&self, ensemble: usize) -> Vec<f64> {
        self.raw_vel.iter().map(|row| row[ensemble]).collect()
    }

    pub fn raw_rows(&self) -> &[Vec<f64>] {
        &self.raw_vel
    }

    /// Install transformed components; used only by the coordinate
    /// transformer. Resets the processed copies.
    pub fn set_components(
        &mut self,
        u: Vec<f64>,
        v: Vec<f64>,
        w: Vec<f64>,
        d: Vec<f64>,
        frame: CoordFrame,
    ) -> ProcessResult<()> {
        for row in [&u, &v, &w, &d] {
            if row.len() != self.len() {
                return Err(ProcessError::DimensionMismatch {
                    expected: self.len(),
                    actual: row.len(),
                });
            }
        }
        self.u_mps = u;
        self.v_mps = v;
        self.w_mps = w;
        self.d_mps = d;
        self.frame = frame;
        self.processed_u = self.u_mps.clone();
        self.processed_v = self.v_mps.clone();
        Ok(())
    }

    /// Reset the processed copies from the components, masking
    /// composite-invalid samples. The first step of every interpolation.
    pub fn reset_processed(&mut self) {
        self.processed_u = self.u_mps.clone();
        self.processed_v = self.v_mps.clone();
        for (i, &valid) in self.validity.composite().iter().enumerate() {
            if !valid {
                self.processed_u[i] = f64::NAN;
                self.processed_v[i] = f64::NAN;
            }
        }
    }

    pub fn processed_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.processed_u, &mut self.processed_v)
    }

    /// Install fused velocities; used only by the fusion engine.
    pub fn set_processed(&mut self, u: Vec<f64>, v: Vec<f64>) -> ProcessResult<()> {
        for row in [&u, &v] {
            if row.len() != self.len() {
                return Err(ProcessError::DimensionMismatch {
                    expected: self.len(),
                    actual: row.len(),
                });
            }
        }
        self.processed_u = u;
        self.processed_v = v;
        Ok(())
    }

    pub fn set_provenance(&mut self, provenance: Vec<Provenance>) -> ProcessResult<()> {
        if provenance.len() != self.len() {
            return Err(ProcessError::DimensionMismatch {
                expected: self.len(),
                actual: provenance.len(),
            });
        }
        self.provenance = provenance;
        Ok(())
    }

    pub fn set_validity_layer(
        &mut self,
        layer: ValidityLayer,
        values: Vec<bool>,
    ) -> ProcessResult<()> {
        self.validity.set_layer(layer, values)
    }

    pub fn clear_validity_layer(&mut self, layer: ValidityLayer) {
        self.validity.clear_layer(layer);
    }

    // Filter and interpolation settings.

    pub fn beam_policy(&self) -> BeamPolicy {
        self.beam_policy
    }

    pub fn set_beam_policy(&mut self, policy: BeamPolicy) {
        self.beam_policy = policy;
    }

    pub fn difference_filter(&self) -> FilterPolicy {
        self.difference_filter
    }

    pub fn set_difference_filter(&mut self, policy: FilterPolicy) {
        self.difference_filter = policy;
    }

    pub fn vertical_filter(&self) -> FilterPolicy {
        self.vertical_filter
    }

    pub fn set_vertical_filter(&mut self, policy: FilterPolicy) {
        self.vertical_filter = policy;
    }

    pub fn smooth_filter_on(&self) -> bool {
        self.smooth_filter_on
    }

    pub fn set_smooth_filter(&mut self, on: bool) {
        self.smooth_filter_on = on;
    }

    pub fn gps_quality_min(&self) -> f64 {
        self.gps_quality_min
    }

    pub fn set_gps_quality_min(&mut self, min: f64) {
        self.gps_quality_min = min;
    }

    pub fn gps_altitude_filter(&self) -> FilterPolicy {
        self.gps_altitude_filter
    }

    pub fn set_gps_altitude_filter(&mut self, policy: FilterPolicy) {
        self.gps_altitude_filter = policy;
    }

    pub fn gps_hdop_filter(&self) -> FilterPolicy {
        self.gps_hdop_filter
    }

    pub fn gps_hdop_change_max(&self) -> f64 {
        self.gps_hdop_change_max
    }

    pub fn set_gps_hdop_filter(&mut self, policy: FilterPolicy, change_max: f64) {
        self.gps_hdop_filter = policy;
        self.gps_hdop_change_max = change_max;
    }

    pub fn interp_method(&self) -> InterpMethod {
        self.interp_method
    }

    pub fn set_interp_method(&mut self, method: InterpMethod) {
        self.interp_method = method;
    }

    // Diagnostics recorded by the filter engine.

    pub fn difference_threshold(&self) -> f64 {
        self.difference_threshold
    }

    pub fn note_difference_threshold(&mut self, threshold: f64) {
        self.difference_threshold = threshold;
    }

    pub fn vertical_threshold(&self) -> f64 {
        self.vertical_threshold
    }

    pub fn note_vertical_threshold(&mut self, threshold: f64) {
        self.vertical_threshold = threshold;
    }

    pub fn smooth_limits(&self) -> (&[f64], &[f64], &[f64]) {
        (
            &self.smooth_speed,
            &self.smooth_lower_limit,
            &self.smooth_upper_limit,
        )
    }

    pub fn note_smooth_limits(&mut self, speed: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) {
        self.smooth_speed = speed;
        self.smooth_lower_limit = lower;
        self.smooth_upper_limit = upper;
    }
}
