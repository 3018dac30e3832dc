use ndarray::{arr2, Array2};

pub fn cosd(angle_deg: f64) -> f64 {
    angle_deg.to_radians().cos()
}

pub fn sind(angle_deg: f64) -> f64 {
    angle_deg.to_radians().sin()
}

/// Heading/pitch/roll rotation taking instrument-frame velocities into the
/// earth frame (WinRiver convention, angles in degrees).
pub fn hpr_matrix(heading_deg: f64, pitch_deg: f64, roll_deg: f64) -> Array2<f64> {
    let ch = cosd(heading_deg);
    let sh = sind(heading_deg);
    let cp = cosd(pitch_deg);
    let sp = sind(pitch_deg);
    let cr = cosd(roll_deg);
    let sr = sind(roll_deg);

    arr2(&[
        [ch * cr + sh * sp * sr, sh * cp, ch * sr - sh * sp * cr],
        [-sh * cr + ch * sp * sr, ch * cp, -sh * sr - ch * sp * cr],
        [-cp * sr, sp, cp * cr],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn zero_attitude_gives_identity() {
        let m = hpr_matrix(0.0, 0.0, 0.0);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((m[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn heading_rotates_in_the_horizontal_plane() {
        let m = hpr_matrix(90.0, 0.0, 0.0);
        let v = m.dot(&arr1(&[0.0, 1.0, 0.0]));
        // An instrument-forward velocity headed due east maps onto x.
        assert!((v[0] - 1.0).abs() < 1e-12);
        assert!(v[1].abs() < 1e-12);
        assert!(v[2].abs() < 1e-12);
    }

    #[test]
    fn rotation_preserves_magnitude() {
        let m = hpr_matrix(37.0, 4.0, -3.0);
        let v = m.dot(&arr1(&[1.0, 2.0, 0.5]));
        let mag_in = (1.0f64 + 4.0 + 0.25).sqrt();
        let mag_out = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        assert!((mag_in - mag_out).abs() < 1e-12);
    }
}
