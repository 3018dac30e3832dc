use ndarray::{arr1, Array2};

use crate::acquisition::context::TransectContext;
use crate::acquisition::instrument::InstrumentModel;
use crate::math::rotation::hpr_matrix;
use crate::prelude::{CoordFrame, ProcessResult};
use crate::series::velocity::VelocitySeries;
use crate::telemetry::log::LogManager;

/// Speed-of-sound correction used by the paired-beam reconstruction.
/// WinRiver assumes the reference speed of sound equals the measured one,
/// which reduces the correction factor to sqrt(3).
const SOS_CORRECTION: f64 = 1.732_050_807_568_877_2;

/// Reconstruction strategy for ensembles where exactly one beam is missing.
/// Selected once per transect from the instrument model.
pub trait BeamSolver {
    /// Instrument-frame (x, y, z, error) components for the ensemble.
    /// The error velocity of a 3-beam solution is always missing.
    fn solve(&self, beam_vel: [f64; 4], missing: usize, t_matrix: &Array2<f64>) -> [f64; 4];
}

/// RiverRay reconstruction: the surviving beam of the broken pair is doubled,
/// the broken pair is removed from the vertical computation, and the
/// horizontal component is corrected with the vertical velocity scaled by
/// the speed-of-sound factor.
pub struct PairedBeamSolver;

impl BeamSolver for PairedBeamSolver {
    fn solve(&self, beam_vel: [f64; 4], missing: usize, t_matrix: &Array2<f64>) -> [f64; 4] {
        let partner = missing ^ 1;
        let mut t = t_matrix.clone();
        t[[0, partner]] *= 2.0;
        t[[1, partner]] *= 2.0;

        // Remove the broken pair from the vertical velocity and rescale the
        // surviving pair by the speed-of-sound correction.
        let surviving_pair = if missing < 2 { [2usize, 3] } else { [0usize, 1] };
        for beam in 0..4 {
            t[[2, beam]] = if surviving_pair.contains(&beam) {
                1.0 / SOS_CORRECTION
            } else {
                0.0
            };
        }

        let mut valid_beams: Vec<usize> = (0..4).filter(|&b| b != missing).collect();
        valid_beams.sort_unstable();
        let reduced = arr1(&[
            beam_vel[valid_beams[0]],
            beam_vel[valid_beams[1]],
            beam_vel[valid_beams[2]],
        ]);

        let mut out = [0.0f64; 3];
        for row in 0..3 {
            let coeffs = arr1(&[
                t[[row, valid_beams[0]]],
                t[[row, valid_beams[1]]],
                t[[row, valid_beams[2]]],
            ]);
            out[row] = coeffs.dot(&reduced);
        }

        // Correct the horizontal component facing the broken pair.
        match missing {
            0 => out[0] += out[2] * SOS_CORRECTION,
            1 => out[0] -= out[2] * SOS_CORRECTION,
            2 => out[1] -= out[2] * SOS_CORRECTION,
            _ => out[1] += out[2] * SOS_CORRECTION,
        }

        [out[0], out[1], out[2], f64::NAN]
    }
}

/// Generic TRDI/SonTek reconstruction: the missing beam is recovered from
/// the error-velocity null constraint, then the full 4-beam transform is
/// applied.
pub struct ErrorNullBeamSolver;

impl BeamSolver for ErrorNullBeamSolver {
    fn solve(&self, beam_vel: [f64; 4], missing: usize, t_matrix: &Array2<f64>) -> [f64; 4] {
        let mut vel = beam_vel;
        vel[missing] = 0.0;
        let vel = arr1(&vel);

        let error_row = t_matrix.row(3);
        let residual = error_row.dot(&vel);
        let coeff = t_matrix[[3, missing]];
        if coeff.abs() < f64::EPSILON {
            return [f64::NAN, f64::NAN, f64::NAN, f64::NAN];
        }
        let mut full = beam_vel;
        full[missing] = -residual / coeff;
        let full = arr1(&full);

        let inst = t_matrix.dot(&full);
        [inst[0], inst[1], inst[2], f64::NAN]
    }
}

pub fn solver_for(model: InstrumentModel) -> &'static dyn BeamSolver {
    match model {
        InstrumentModel::RiverRay => &PairedBeamSolver,
        _ => &ErrorNullBeamSolver,
    }
}

/// Transforms a series toward a higher-order coordinate frame.
///
/// The transform always recomputes from the series' original raw rows and
/// original frame, so chained requests (Beam to Instrument to Ship to Earth)
/// land on exactly the same values as a direct request.
pub struct CoordinateTransformer {
    logger: LogManager,
}

impl CoordinateTransformer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new(),
        }
    }

    /// Returns `Ok(false)` without touching the series when the target is
    /// not strictly higher than the current frame; the skip is logged so
    /// callers can detect misuse.
    pub fn change_frame(
        &self,
        series: &mut VelocitySeries,
        target: CoordFrame,
        ctx: &TransectContext,
    ) -> ProcessResult<bool> {
        if target.order() <= series.frame().order() {
            self.logger.flag(&format!(
                "coordinate transform skipped: {:?} is not above {:?}",
                target,
                series.frame()
            ));
            return Ok(false);
        }

        let n = series.len();
        ctx.check_len(n)?;

        let origin = series.orig_frame();
        let solver = solver_for(ctx.instrument.model);

        let mut u = vec![f64::NAN; n];
        let mut v = vec![f64::NAN; n];
        let mut w = vec![f64::NAN; n];
        let mut d = vec![f64::NAN; n];

        for i in 0..n {
            // Frames at Ship or above have already removed pitch and roll.
            let (pitch, roll) = if origin.order() >= CoordFrame::Ship.order() {
                (0.0, 0.0)
            } else {
                (ctx.attitude.pitch_deg[i], ctx.attitude.roll_deg[i])
            };
            let rotation = hpr_matrix(ctx.attitude.heading_deg[i], pitch, roll);

            let (x, y, z, err) = if origin == CoordFrame::Beam {
                let column = series.raw_column(i);
                if column.len() != 4 {
                    continue;
                }
                let beams = [column[0], column[1], column[2], column[3]];
                let t_matrix = match ctx.instrument.matrix_for(series.frequency_at(i)) {
                    Some(matrix) => matrix,
                    None => continue,
                };
                let missing: Vec<usize> =
                    (0..4).filter(|&b| !beams[b].is_finite()).collect();
                match missing.len() {
                    0 => {
                        let inst = t_matrix.dot(&arr1(&beams));
                        (inst[0], inst[1], inst[2], inst[3])
                    }
                    1 => {
                        let solved = solver.solve(beams, missing[0], t_matrix);
                        (solved[0], solved[1], solved[2], solved[3])
                    }
                    // Too few beams: the ensemble stays missing.
                    _ => continue,
                }
            } else {
                // Instrument or Ship origin: the beam-to-instrument rotation
                // is already applied; the raw rows are u/v/w/d.
                let column = series.raw_column(i);
                let err = column.get(3).copied().unwrap_or(f64::NAN);
                (
                    column.first().copied().unwrap_or(f64::NAN),
                    column.get(1).copied().unwrap_or(f64::NAN),
                    column.get(2).copied().unwrap_or(f64::NAN),
                    err,
                )
            };

            let rotated = rotation.dot(&arr1(&[x, y, z]));
            // Downstream consumers expect boat motion, not ADCP-relative
            // motion.
            u[i] = -rotated[0];
            v[i] = -rotated[1];
            w[i] = -rotated[2];
            d[i] = -err;
        }

        series.set_components(u, v, w, d, target)?;
        self.logger.record(&format!(
            "{} transformed {:?} -> {:?}",
            series.source().label(),
            origin,
            target
        ));
        Ok(true)
    }
}

impl Default for CoordinateTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::instrument::InstrumentInfo;
    use crate::acquisition::payload::{BeamPolicy, RawNavInput};
    use crate::acquisition::sensors::{AttitudeData, EnsembleClock};
    use crate::prelude::Manufacturer;
    use ndarray::arr2;

    /// Standard 20-degree Janus transform for a TRDI-style instrument.
    fn janus_matrix() -> Array2<f64> {
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

    fn context(model: InstrumentModel, attitude: AttitudeData, n: usize) -> TransectContext {
        TransectContext::new(
            attitude,
            InstrumentInfo::single(model, janus_matrix()),
            EnsembleClock::new(vec![1.0; n]),
        )
    }

    /// Beam radial velocities consistent with the Janus matrix for a given
    /// instrument-frame velocity and zero error velocity.
    fn beams_for(x: f64, y: f64, z: f64) -> [f64; 4] {
        let theta = 20.0f64.to_radians();
        let (s, c) = (theta.sin(), theta.cos());
        [
            x * s + z * c,
            -x * s + z * c,
            -y * s + z * c,
            y * s + z * c,
        ]
    }

    fn beam_series(columns: &[[f64; 4]]) -> VelocitySeries {
        let n = columns.len();
        let rows: Vec<Vec<f64>> = (0..4)
            .map(|r| (0..n).map(|i| columns[i][r]).collect())
            .collect();
        VelocitySeries::from_input(RawNavInput::bottom_track(
            Manufacturer::Trdi,
            rows,
            vec![600_000.0],
            CoordFrame::Beam,
            BeamPolicy::Auto,
            "Variable",
        ))
        .unwrap()
    }

    #[test]
    fn four_beam_transform_recovers_instrument_velocity() {
        let series_cols = [beams_for(0.4, -0.2, 0.1)];
        let mut series = beam_series(&series_cols);
        let ctx = context(
            InstrumentModel::RioGrande,
            AttitudeData::level(vec![0.0]),
            1,
        );
        let applied = CoordinateTransformer::new()
            .change_frame(&mut series, CoordFrame::Earth, &ctx)
            .unwrap();
        assert!(applied);
        assert!((series.u()[0] - -0.4).abs() < 1e-9);
        assert!((series.v()[0] - 0.2).abs() < 1e-9);
        assert!((series.w()[0] - -0.1).abs() < 1e-9);
        assert!(series.d()[0].abs() < 1e-9);
    }

    #[test]
    fn lower_or_equal_target_is_a_no_op() {
        let series_cols = [beams_for(0.4, -0.2, 0.1)];
        let mut series = beam_series(&series_cols);
        let ctx = context(
            InstrumentModel::RioGrande,
            AttitudeData::level(vec![0.0]),
            1,
        );
        let applied = CoordinateTransformer::new()
            .change_frame(&mut series, CoordFrame::Beam, &ctx)
            .unwrap();
        assert!(!applied);
        assert_eq!(series.frame(), CoordFrame::Beam);
    }

    #[test]
    fn chained_transform_equals_direct_transform() {
        let columns: Vec<[f64; 4]> = (0..6)
            .map(|i| beams_for(0.3 + 0.05 * i as f64, -0.1, 0.05))
            .collect();
        let attitude = AttitudeData {
            heading_deg: vec![15.0, 30.0, 45.0, 60.0, 75.0, 90.0],
            pitch_deg: vec![2.0; 6],
            roll_deg: vec![-1.0; 6],
        };
        let ctx = context(InstrumentModel::RioGrande, attitude, 6);
        let transformer = CoordinateTransformer::new();

        let mut direct = beam_series(&columns);
        transformer
            .change_frame(&mut direct, CoordFrame::Earth, &ctx)
            .unwrap();

        let mut chained = beam_series(&columns);
        transformer
            .change_frame(&mut chained, CoordFrame::Instrument, &ctx)
            .unwrap();
        transformer
            .change_frame(&mut chained, CoordFrame::Ship, &ctx)
            .unwrap();
        transformer
            .change_frame(&mut chained, CoordFrame::Earth, &ctx)
            .unwrap();

        for i in 0..6 {
            assert!((direct.u()[i] - chained.u()[i]).abs() < 1e-9);
            assert!((direct.v()[i] - chained.v()[i]).abs() < 1e-9);
            assert!((direct.w()[i] - chained.w()[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn paired_solver_matches_the_documented_reconstruction() {
        // Beam 2 (index 1) missing.
        let t = janus_matrix();
        let beams = beams_for(0.5, -0.3, 0.2);
        let mut broken = beams;
        broken[1] = f64::NAN;

        let solved = PairedBeamSolver.solve(broken, 1, &t);

        // Manual computation of the documented doubling/correction formula.
        let mut tm = t.clone();
        tm[[0, 0]] *= 2.0;
        tm[[1, 0]] *= 2.0;
        for beam in 0..4 {
            tm[[2, beam]] = if beam >= 2 { 1.0 / SOS_CORRECTION } else { 0.0 };
        }
        let kept = [0usize, 2, 3];
        let mut expected = [0.0f64; 3];
        for row in 0..3 {
            expected[row] = kept
                .iter()
                .map(|&bidx| tm[[row, bidx]] * beams[bidx])
                .sum();
        }
        expected[0] -= expected[2] * SOS_CORRECTION;

        assert!((solved[0] - expected[0]).abs() < 1e-12);
        assert!((solved[1] - expected[1]).abs() < 1e-12);
        assert!((solved[2] - expected[2]).abs() < 1e-12);
        assert!(solved[3].is_nan());
    }

    #[test]
    fn error_null_solver_recovers_the_missing_beam() {
        // Synthetic beams with a zero error velocity: nulling the error row
        // reconstructs the missing beam exactly.
        let t = janus_matrix();
        let beams = beams_for(0.5, -0.3, 0.2);
        for missing in 0..4 {
            let mut broken = beams;
            broken[missing] = f64::NAN;
            let solved = ErrorNullBeamSolver.solve(broken, missing, &t);
            let full = t.dot(&arr1(&beams));
            assert!((solved[0] - full[0]).abs() < 1e-9);
            assert!((solved[1] - full[1]).abs() < 1e-9);
            assert!((solved[2] - full[2]).abs() < 1e-9);
            assert!(solved[3].is_nan());
        }
    }

    #[test]
    fn three_beam_ensembles_lose_their_error_velocity() {
        let good = beams_for(0.4, 0.1, 0.05);
        let mut broken = good;
        broken[2] = f64::NAN;
        let columns = [good, broken];
        let mut series = beam_series(&columns);
        let ctx = context(
            InstrumentModel::RioGrande,
            AttitudeData::level(vec![0.0, 0.0]),
            2,
        );
        CoordinateTransformer::new()
            .change_frame(&mut series, CoordFrame::Earth, &ctx)
            .unwrap();
        assert!(series.d()[0].abs() < 1e-9);
        assert!(series.d()[1].is_nan());
        // The reconstructed horizontal velocity still matches.
        assert!((series.u()[1] - series.u()[0]).abs() < 1e-9);
    }

    #[test]
    fn two_missing_beams_leave_the_ensemble_missing() {
        let mut broken = beams_for(0.4, 0.1, 0.05);
        broken[0] = f64::NAN;
        broken[3] = f64::NAN;
        let columns = [broken];
        let mut series = beam_series(&columns);
        let ctx = context(
            InstrumentModel::RioGrande,
            AttitudeData::level(vec![0.0]),
            1,
        );
        CoordinateTransformer::new()
            .change_frame(&mut series, CoordFrame::Earth, &ctx)
            .unwrap();
        assert!(series.u()[0].is_nan());
        assert!(series.v()[0].is_nan());
    }
}
