//! As-designed antenna mounting geometry
use itertools::Itertools;
use nalgebra::Vector3;

use crate::error::Error;

/// Fixed mapping from antenna identifier to its as-designed position
/// in the vessel local frame (X starboard, Y forward, Z up, meters).
/// Configuration data: supplied once per vessel, read-only during
/// processing, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaGeometry {
    names: Vec<String>,
    points: Vec<Vector3<f64>>,
}

impl AntennaGeometry {
    /// Builds a new [AntennaGeometry] from (identifier, position [m]) pairs.
    /// At least 3 non-collinear antennas are required for a rigid
    /// transform solution; anything less is rejected here rather than
    /// checked ad hoc at use sites.
    pub fn new<S: Into<String>, I: IntoIterator<Item = (S, (f64, f64, f64))>>(
        entries: I,
    ) -> Result<Self, Error> {
        let mut names = Vec::<String>::new();
        let mut points = Vec::<Vector3<f64>>::new();

        for (name, (x, y, z)) in entries {
            let name = name.into();
            if names.contains(&name) {
                return Err(Error::DuplicateAntenna(name));
            }
            names.push(name);
            points.push(Vector3::new(x, y, z));
        }

        if points.len() < 3 {
            return Err(Error::NotEnoughAntennas(points.len()));
        }

        if !Self::spans_plane(&points) {
            return Err(Error::CollinearGeometry);
        }

        Ok(Self { names, points })
    }

    /// True when at least one antenna triple spans a plane.
    fn spans_plane(points: &[Vector3<f64>]) -> bool {
        points.iter().tuple_combinations().any(|(a, b, c)| {
            let normal = (b - a).cross(&(c - a));
            normal.norm() > 1e-9 * (b - a).norm().max(1.0) * (c - a).norm().max(1.0)
        })
    }

    /// Number of antennas.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Antenna identifiers, in definition order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Antenna positions in the vessel frame, in definition order.
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Position of antenna `name`, if defined.
    pub fn position(&self, name: &str) -> Option<Vector3<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.points[idx])
    }

    /// Positions relative to the first antenna (the base/reference
    /// antenna by convention): the configuration the per-epoch
    /// observed ENU offsets are matched against.
    pub fn relative_points(&self) -> Vec<Vector3<f64>> {
        let origin = self.points[0];
        self.points.iter().map(|p| p - origin).collect()
    }

    /// Nominal baseline length between antennas `i` and `j` in meters.
    /// Ground truth for the per-epoch consistency check.
    pub fn baseline_length(&self, i: usize, j: usize) -> f64 {
        (self.points[j] - self.points[i]).norm()
    }

    /// All pairwise nominal baseline lengths, `((i, j), meters)`.
    pub fn baseline_lengths(&self) -> Vec<((usize, usize), f64)> {
        (0..self.points.len())
            .tuple_combinations()
            .map(|(i, j)| ((i, j), self.baseline_length(i, j)))
            .collect()
    }
}
