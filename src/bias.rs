//! Static geometric bias of the as-built antenna plane
use nalgebra::Vector3;

use crate::geometry::AntennaGeometry;

/// Systematic pitch/roll offset implied by the as-built antenna plane
/// deviating from the nominal (level) design plane. Computed once per
/// run from the static geometry, constant over the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricBias {
    /// Pitch bias [°]
    pub pitch_bias_deg: f64,
    /// Roll bias [°]
    pub roll_bias_deg: f64,
    /// Unit normal of the antenna plane, vertical component positive
    pub normal: Vector3<f64>,
}

impl std::fmt::Display for GeometricBias {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "pitch bias {:+.3}°, roll bias {:+.3}°",
            self.pitch_bias_deg, self.roll_bias_deg
        )
    }
}

/// Derives the [GeometricBias] from the first three antennas of the
/// geometry (plane-tilt method).
///
/// The plane normal comes from the cross product of two in-plane
/// vectors, normalized, with its vertical component forced positive
/// (upward) by convention. The tilt then decomposes as
/// `roll = asin(-n_x)`, `pitch = asin(n_y / cos(roll))`: a closed
/// form that assumes the roll and pitch axes stay orthogonal, which
/// only holds for small bias angles. Known approximation, not exact
/// for large tilts.
pub fn geometric_bias(geometry: &AntennaGeometry) -> GeometricBias {
    let points = geometry.points();

    let v1 = points[1] - points[0];
    let v2 = points[2] - points[0];

    // non-collinearity is a construction invariant of the geometry
    let mut normal = v1.cross(&v2);
    if normal[2] < 0.0 {
        normal = -normal;
    }
    let normal = normal.normalize();

    let roll_bias = (-normal[0]).clamp(-1.0, 1.0).asin();
    let pitch_bias = (normal[1] / roll_bias.cos()).clamp(-1.0, 1.0).asin();

    GeometricBias {
        pitch_bias_deg: pitch_bias.to_degrees(),
        roll_bias_deg: roll_bias.to_degrees(),
        normal,
    }
}

#[cfg(test)]
mod test {
    use super::geometric_bias;
    use crate::geometry::AntennaGeometry;

    #[test]
    fn level_plane_is_unbiased() {
        let geometry = AntennaGeometry::new([
            ("AFT", (0.0, 0.0, 0.0)),
            ("PORT", (-10.0, 36.0, 0.0)),
            ("STBD", (10.0, 36.0, 0.0)),
        ])
        .unwrap();

        let bias = geometric_bias(&geometry);
        assert!(bias.pitch_bias_deg.abs() < 1e-12);
        assert!(bias.roll_bias_deg.abs() < 1e-12);
        assert!((bias.normal[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normal_points_upward() {
        // antenna order chosen so the raw cross product points down
        let geometry = AntennaGeometry::new([
            ("AFT", (0.0, 0.0, 0.0)),
            ("STBD", (10.0, 36.0, 0.0)),
            ("PORT", (-10.0, 36.0, 0.0)),
        ])
        .unwrap();

        let bias = geometric_bias(&geometry);
        assert!(bias.normal[2] > 0.0);
    }

    #[test]
    fn forward_tilt_reads_as_pitch_bias() {
        // plane rises toward the bow: normal leans backward (n_y < 0)
        let geometry = AntennaGeometry::new([
            ("AFT", (0.0, 0.0, 0.0)),
            ("PORT", (-10.0, 36.0, 1.0)),
            ("STBD", (10.0, 36.0, 1.0)),
        ])
        .unwrap();

        let bias = geometric_bias(&geometry);
        assert!(bias.pitch_bias_deg < 0.0);
        assert!(bias.roll_bias_deg.abs() < 1e-9);
    }

    #[test]
    fn lateral_tilt_reads_as_roll_bias() {
        // starboard antenna mounted higher than port
        let geometry = AntennaGeometry::new([
            ("AFT", (0.0, 0.0, 0.0)),
            ("PORT", (-10.0, 36.0, -0.5)),
            ("STBD", (10.0, 36.0, 0.5)),
        ])
        .unwrap();

        let bias = geometric_bias(&geometry);
        assert!(bias.roll_bias_deg.abs() > 0.1);
        assert!(bias.pitch_bias_deg.abs() < 1.0);
    }
}
