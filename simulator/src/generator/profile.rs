use std::f64::consts::PI;

use ndarray::{arr2, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rivelcore::acquisition::{
    AttitudeData, BeamPolicy, EnsembleClock, GpsAncillary, InstrumentInfo, InstrumentModel,
    RawNavInput, TransectContext,
};
use rivelcore::math::hpr_matrix;
use rivelcore::prelude::{CoordFrame, Manufacturer};
use serde::{Deserialize, Serialize};

/// Configuration for generating a synthetic transect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub ensembles: usize,
    /// Boat speed along the crossing, m/s.
    pub boat_speed_mps: f64,
    /// Heading at the start of the crossing, degrees.
    pub heading_start_deg: f64,
    /// Total heading change over the crossing, degrees.
    pub heading_sweep_deg: f64,
    pub noise_mps: f64,
    pub seed: u64,
    /// Every n-th bottom-track ensemble loses one beam; 0 disables dropouts.
    pub beam_dropout_every: usize,
    /// Every n-th bottom-track ensemble loses all beams; 0 disables.
    pub full_dropout_every: usize,
    pub description: Option<String>,
    pub scenario: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ensembles: 600,
            boat_speed_mps: 1.2,
            heading_start_deg: 80.0,
            heading_sweep_deg: 20.0,
            noise_mps: 0.02,
            seed: 0,
            beam_dropout_every: 37,
            full_dropout_every: 113,
            description: None,
            scenario: None,
        }
    }
}

impl GeneratorConfig {
    fn normalized_ensembles(&self) -> usize {
        self.ensembles.max(2)
    }
}

/// One synthetic transect: the sensor context plus a raw block per source.
pub struct SyntheticTransect {
    pub context: TransectContext,
    pub bottom_track: RawNavInput,
    pub gga: RawNavInput,
    pub vtg: RawNavInput,
}

/// Standard 20-degree Janus beam-to-instrument transform.
pub fn janus_matrix() -> Array2<f64> {
    let theta = 20.0f64.to_radians();
    let a = 1.0 / (2.0 * theta.sin());
    let b = 1.0 / (4.0 * theta.cos());
    let d = a / 2.0f64.sqrt();
    arr2(&[
        [a, -a, 0.0, 0.0],
        [0.0, 0.0, -a, a],
        [b, b, b, b],
        [d, d, -d, -d],
    ])
}

/// Radial velocities the four beams would report for an instrument-frame
/// velocity with zero error velocity.
fn beams_from_instrument(x: f64, y: f64, z: f64) -> [f64; 4] {
    let theta = 20.0f64.to_radians();
    let (s, c) = (theta.sin(), theta.cos());
    [
        x * s + z * c,
        -x * s + z * c,
        -y * s + z * c,
        y * s + z * c,
    ]
}

pub fn build_transect(config: &GeneratorConfig) -> anyhow::Result<SyntheticTransect> {
    let n = config.normalized_ensembles();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let heading_deg: Vec<f64> = (0..n)
        .map(|i| {
            config.heading_start_deg
                + config.heading_sweep_deg * (i as f64 / (n - 1) as f64)
        })
        .collect();
    let pitch_deg: Vec<f64> = (0..n)
        .map(|i| 1.5 * (2.0 * PI * i as f64 / 40.0).sin())
        .collect();
    let roll_deg: Vec<f64> = (0..n)
        .map(|i| 2.0 * (2.0 * PI * i as f64 / 55.0).sin())
        .collect();

    // Boat velocity in the earth frame; the boat slows toward both banks.
    let mut boat_u = Vec::with_capacity(n);
    let mut boat_v = Vec::with_capacity(n);
    for (i, heading) in heading_deg.iter().enumerate() {
        let ramp = (PI * i as f64 / (n - 1) as f64).sin().max(0.1);
        let speed = config.boat_speed_mps * ramp;
        let az = heading.to_radians();
        boat_u.push(speed * az.sin());
        boat_v.push(speed * az.cos());
    }

    // Beam radials that transform back to the boat velocity above.
    let mut beams = vec![vec![f64::NAN; n]; 4];
    for i in 0..n {
        let rotation = hpr_matrix(heading_deg[i], pitch_deg[i], roll_deg[i]);
        // The processing chain negates after rotating, so the instrument
        // sees the opposite of the boat motion.
        let earth = [-boat_u[i], -boat_v[i], 0.0];
        let mut inst = [0.0f64; 3];
        for row in 0..3 {
            // Transpose of an orthonormal rotation is its inverse.
            inst[row] = (0..3).map(|col| rotation[[col, row]] * earth[col]).sum();
        }
        let radials = beams_from_instrument(inst[0], inst[1], inst[2]);
        for beam in 0..4 {
            beams[beam][i] = radials[beam] + rng.gen_range(-config.noise_mps..config.noise_mps);
        }
    }
    if config.beam_dropout_every > 0 {
        for i in (config.beam_dropout_every..n).step_by(config.beam_dropout_every) {
            beams[i % 4][i] = f64::NAN;
        }
    }
    if config.full_dropout_every > 0 {
        for i in (config.full_dropout_every..n).step_by(config.full_dropout_every) {
            for row in beams.iter_mut() {
                row[i] = f64::NAN;
            }
        }
    }

    let gga_u: Vec<f64> = (0..n)
        .map(|i| boat_u[i] + rng.gen_range(-config.noise_mps..config.noise_mps))
        .collect();
    let gga_v: Vec<f64> = (0..n)
        .map(|i| boat_v[i] + rng.gen_range(-config.noise_mps..config.noise_mps))
        .collect();
    let vtg_u: Vec<f64> = (0..n)
        .map(|i| boat_u[i] + rng.gen_range(-config.noise_mps..config.noise_mps))
        .collect();
    let vtg_v: Vec<f64> = (0..n)
        .map(|i| boat_v[i] + rng.gen_range(-config.noise_mps..config.noise_mps))
        .collect();

    let quality: Vec<f64> = (0..n)
        .map(|i| if i % 97 == 96 { 1.0 } else { 4.0 })
        .collect();
    let altitude_m: Vec<f64> = (0..n)
        .map(|_| 102.0 + rng.gen_range(-0.5..0.5))
        .collect();
    let hdop: Vec<f64> = (0..n)
        .map(|i| {
            if i % 131 == 130 {
                4.0
            } else {
                0.8 + rng.gen_range(-0.1..0.1)
            }
        })
        .collect();
    let ancillary = GpsAncillary {
        quality,
        altitude_m,
        hdop,
    };

    let context = TransectContext::new(
        AttitudeData {
            heading_deg,
            pitch_deg,
            roll_deg,
        },
        InstrumentInfo::single(InstrumentModel::RioGrande, janus_matrix()),
        EnsembleClock::new(vec![1.0; n]),
    );

    let bottom_track = RawNavInput::bottom_track(
        Manufacturer::Trdi,
        beams,
        vec![600_000.0],
        CoordFrame::Beam,
        BeamPolicy::Auto,
        "Mode 12",
    );
    let gga = RawNavInput::gps(
        Manufacturer::Trdi,
        rivelcore::VelocitySource::Gga,
        vec![gga_u, gga_v],
        ancillary.clone(),
    );
    let vtg = RawNavInput::gps(
        Manufacturer::Trdi,
        rivelcore::VelocitySource::Vtg,
        vec![vtg_u, vtg_v],
        ancillary,
    );

    Ok(SyntheticTransect {
        context,
        bottom_track,
        gga,
        vtg,
    })
}
