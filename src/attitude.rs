//! Attitude angles and rotation/Euler conversions
//!
//! One convention rules the whole crate (the source material mixed
//! several and we call that out rather than reconcile it silently):
//! vessel frame X starboard, Y forward, Z up; world frame local ENU.
//! Rotations are composed intrinsic Z-X'-Y'' (yaw → pitch → roll):
//! `R = Rz(-heading) · Rx(pitch) · Ry(roll)`, mapping vessel frame
//! vectors into ENU. Heading is clockwise from north in [0, 360)°,
//! pitch positive bow up, roll positive port up.
use hifitime::Epoch;
use nalgebra::{Matrix3, Vector3};

/// How an [Attitude] was derived.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum AttitudeMethod {
    /// Full rigid-body fit over >= 3 antennas.
    #[default]
    ProcrustesFit,
    /// Two-antenna approximation: heading and pitch from one baseline
    /// vector, roll unobservable. Explicitly lower accuracy, never
    /// mixed silently with the full fit.
    SingleBaseline,
}

impl std::fmt::Display for AttitudeMethod {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ProcrustesFit => write!(fmt, "procrustes"),
            Self::SingleBaseline => write!(fmt, "single-baseline"),
        }
    }
}

/// Per-epoch attitude estimate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Attitude {
    /// Estimation [Epoch]
    pub epoch: Epoch,
    /// Heading, clockwise from north, [0, 360)°
    pub heading_deg: f64,
    /// Pitch, positive bow up [°]
    pub pitch_deg: f64,
    /// Roll, positive port up [°]. NaN for [AttitudeMethod::SingleBaseline].
    pub roll_deg: f64,
    /// Sum of squared point-distance errors of the fit [m²].
    /// Zero for the single-baseline path.
    pub residual: f64,
    /// Derivation method
    pub method: AttitudeMethod,
}

impl std::fmt::Display for Attitude {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "hdg {:.3}° pitch {:.3}° roll {:.3}° ({})",
            self.heading_deg, self.pitch_deg, self.roll_deg, self.method
        )
    }
}

/// Wraps an angle to [0, 360)°.
pub fn wrap_360(angle_deg: f64) -> f64 {
    angle_deg.rem_euclid(360.0)
}

/// Circular difference `a - b`, wrapped to (-180, 180]°.
/// Applies to heading only: pitch and roll differences stay linear.
pub fn heading_diff_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b + 180.0).rem_euclid(360.0) - 180.0;
    if diff == -180.0 {
        180.0
    } else {
        diff
    }
}

/// Builds the vessel → ENU rotation from attitude angles in degrees,
/// intrinsic Z-X'-Y'' (yaw → pitch → roll).
pub fn rotation_from_angles(heading_deg: f64, pitch_deg: f64, roll_deg: f64) -> Matrix3<f64> {
    let (sy, cy) = (-heading_deg.to_radians()).sin_cos();
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let (sr, cr) = roll_deg.to_radians().sin_cos();

    let rz = Matrix3::new(cy, -sy, 0.0, sy, cy, 0.0, 0.0, 0.0, 1.0);
    let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cp, -sp, 0.0, sp, cp);
    let ry = Matrix3::new(cr, 0.0, sr, 0.0, 1.0, 0.0, -sr, 0.0, cr);

    rz * rx * ry
}

/// Decomposes a vessel → ENU rotation into (heading, pitch, roll)
/// degrees under the crate convention. Heading comes out in [0, 360),
/// pitch in [-90, 90], roll in (-180, 180].
///
/// At gimbal lock (|pitch| = 90°) heading and roll degenerate into a
/// single degree of freedom: roll is reported as 0 and heading
/// carries the remaining rotation.
pub fn angles_from_rotation(rotation: &Matrix3<f64>) -> (f64, f64, f64) {
    let r21 = rotation[(2, 1)].clamp(-1.0, 1.0);
    let pitch = r21.asin();

    if r21.abs() > 1.0 - 1e-12 {
        // gimbal lock
        let heading = if r21 > 0.0 {
            (-rotation[(0, 2)]).atan2(rotation[(0, 0)])
        } else {
            rotation[(0, 2)].atan2(rotation[(0, 0)])
        };
        return (
            wrap_360(heading.to_degrees()),
            pitch.to_degrees(),
            0.0,
        );
    }

    let heading = rotation[(0, 1)].atan2(rotation[(1, 1)]);
    let roll = (-rotation[(2, 0)]).atan2(rotation[(2, 2)]);

    (
        wrap_360(heading.to_degrees()),
        pitch.to_degrees(),
        roll.to_degrees(),
    )
}

/// Attitude from a fitted rotation: heading of the rotated forward
/// (bow) axis projected on the horizontal plane, pitch and roll from
/// the Z-X'-Y'' decomposition.
pub fn attitude_from_rotation(
    epoch: Epoch,
    rotation: &Matrix3<f64>,
    residual: f64,
) -> Attitude {
    let (heading_deg, pitch_deg, roll_deg) = angles_from_rotation(rotation);

    Attitude {
        epoch,
        heading_deg,
        pitch_deg,
        roll_deg,
        residual,
        method: AttitudeMethod::ProcrustesFit,
    }
}

/// Azimuth of a horizontal-plane projection, clockwise from north [rad].
pub(crate) fn azimuth_rad(v: &Vector3<f64>) -> f64 {
    v[0].atan2(v[1])
}

/// Elevation above the horizontal plane [rad].
pub(crate) fn elevation_rad(v: &Vector3<f64>) -> f64 {
    v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt())
}

/// Two-antenna fallback: attitude approximated from a single observed
/// baseline vector against its nominal (vessel frame) counterpart.
/// Heading from the azimuth difference, pitch from the elevation
/// difference, roll unobservable (NaN). Labeled
/// [AttitudeMethod::SingleBaseline] in the result.
pub fn attitude_from_baseline(
    epoch: Epoch,
    nominal: &Vector3<f64>,
    observed: &Vector3<f64>,
) -> Attitude {
    let heading = azimuth_rad(observed) - azimuth_rad(nominal);
    let pitch = elevation_rad(observed) - elevation_rad(nominal);

    Attitude {
        epoch,
        heading_deg: wrap_360(heading.to_degrees()),
        pitch_deg: pitch.to_degrees(),
        roll_deg: f64::NAN,
        residual: 0.0,
        method: AttitudeMethod::SingleBaseline,
    }
}

#[cfg(test)]
mod test {
    use super::{
        angles_from_rotation, attitude_from_baseline, heading_diff_deg, rotation_from_angles,
        wrap_360,
    };
    use hifitime::Epoch;
    use nalgebra::Vector3;

    #[test]
    fn wrapping() {
        assert_eq!(wrap_360(0.0), 0.0);
        assert_eq!(wrap_360(360.0), 0.0);
        assert_eq!(wrap_360(-10.0), 350.0);
        assert_eq!(wrap_360(725.0), 5.0);
    }

    #[test]
    fn circular_difference() {
        assert!((heading_diff_deg(359.9, 0.1) - (-0.2)).abs() < 1e-9);
        assert!((heading_diff_deg(0.1, 359.9) - 0.2).abs() < 1e-9);
        assert!((heading_diff_deg(180.0, 0.0) - 180.0).abs() < 1e-9);
        assert_eq!(heading_diff_deg(90.0, 90.0), 0.0);
    }

    #[test]
    fn pure_heading_rotation() {
        let rot = rotation_from_angles(90.0, 0.0, 0.0);
        // bow points due east
        let forward = rot * Vector3::new(0.0, 1.0, 0.0);
        assert!((forward[0] - 1.0).abs() < 1e-12);
        assert!(forward[1].abs() < 1e-12);

        let (h, p, r) = angles_from_rotation(&rot);
        assert!((h - 90.0).abs() < 1e-9);
        assert!(p.abs() < 1e-9);
        assert!(r.abs() < 1e-9);
    }

    #[test]
    fn pure_pitch_lifts_bow() {
        let rot = rotation_from_angles(0.0, 10.0, 0.0);
        let forward = rot * Vector3::new(0.0, 1.0, 0.0);
        assert!(forward[2] > 0.0);
    }

    #[test]
    fn pure_roll_lifts_port() {
        let rot = rotation_from_angles(0.0, 0.0, 10.0);
        let port = rot * Vector3::new(-1.0, 0.0, 0.0);
        assert!(port[2] > 0.0);
    }

    #[test]
    fn single_baseline_attitude() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2025, 7, 16);
        let nominal = Vector3::new(0.0, 30.0, 0.0);
        // bow swung 90° east, slightly raised
        let observed = Vector3::new(30.0, 0.0, 0.5);

        let attitude = attitude_from_baseline(epoch, &nominal, &observed);
        assert!((attitude.heading_deg - 90.0).abs() < 1e-9);
        assert!(attitude.pitch_deg > 0.0);
        assert!(attitude.roll_deg.is_nan());
    }
}
