//! Orthogonal Procrustes rigid transform solver
//!
//! Finds the proper rotation (optionally with uniform scale and
//! translation) best aligning the as-designed antenna configuration
//! with its observed counterpart, by minimizing the sum of squared
//! point distances. SVD orthogonalization is the default and
//! reference method; the per-axis Euler path is a stopgap kept for
//! environments where the full fit misbehaves, and is validated
//! against the same vectors at its own (looser) accuracy.
use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::{
    attitude::{azimuth_rad, rotation_from_angles},
    cfg::{SolverMethod, SolverOpts},
    error::Error,
};

/// Best-fit rigid transform for one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    /// Proper rotation (det = +1), vessel frame → observed frame
    pub rotation: Matrix3<f64>,
    /// Uniform scale, when estimation is enabled
    pub scale: Option<f64>,
    /// Translation [m]
    pub translation: Vector3<f64>,
    /// Sum of squared point-distance errors [m²], fit quality indicator
    pub residual: f64,
}

/// Rigid transform solver. Stateless: one instance may serve any
/// number of epochs and threads.
#[derive(Debug, Clone)]
pub struct ProcrustesSolver {
    opts: SolverOpts,
}

impl ProcrustesSolver {
    pub fn new(opts: &SolverOpts) -> Self {
        Self { opts: opts.clone() }
    }

    /// Solves `min Σ ‖s·Q·refᵢ + t − obsᵢ‖²` over proper rotations Q.
    /// Both configurations must hold the same points in the same
    /// order. Degenerate inputs (near-collinear points, near-zero
    /// reference variance) are detected and rejected rather than
    /// producing a near-arbitrary rotation.
    pub fn solve(
        &self,
        reference: &[Vector3<f64>],
        observed: &[Vector3<f64>],
    ) -> Result<RigidTransform, Error> {
        if reference.len() != observed.len() {
            return Err(Error::ConfigurationMismatch);
        }
        if reference.len() < 3 {
            return Err(Error::NotEnoughAntennas(reference.len()));
        }

        let n = reference.len() as f64;

        let ref_centroid = reference.iter().sum::<Vector3<f64>>() / n;
        let obs_centroid = observed.iter().sum::<Vector3<f64>>() / n;

        let centered_ref: Vec<Vector3<f64>> =
            reference.iter().map(|p| p - ref_centroid).collect();
        let centered_obs: Vec<Vector3<f64>> =
            observed.iter().map(|p| p - obs_centroid).collect();

        let ref_variance: f64 = centered_ref.iter().map(|p| p.norm_squared()).sum();
        if ref_variance < self.opts.degeneracy_epsilon {
            return Err(Error::SolverDegenerate);
        }

        // cross covariance H = Σ refᵢ obsᵢᵀ
        let mut cross = Matrix3::<f64>::zeros();
        for (r, o) in centered_ref.iter().zip(centered_obs.iter()) {
            cross += r * o.transpose();
        }

        let rotation = match self.opts.method {
            SolverMethod::Svd => self.svd_rotation(&cross)?,
            SolverMethod::EulerFallback => {
                self.euler_rotation(&centered_ref, &centered_obs)?
            },
        };

        // optimal uniform scale: tr(Q·H) over the reference variance
        let scale = if self.opts.estimate_scale {
            Some((rotation * cross).trace() / ref_variance)
        } else {
            None
        };

        let s = scale.unwrap_or(1.0);
        let translation = obs_centroid - s * rotation * ref_centroid;

        let residual: f64 = reference
            .iter()
            .zip(observed.iter())
            .map(|(r, o)| (s * rotation * r + translation - o).norm_squared())
            .sum();

        debug!(
            "{} fit: residual {:.6} m², scale {:?}",
            self.opts.method, residual, scale
        );

        Ok(RigidTransform {
            rotation,
            scale,
            translation,
            residual,
        })
    }

    /// Kabsch: H = UΣVᵀ, Q = V·diag(1, 1, det(VUᵀ))·Uᵀ.
    /// The diag term corrects reflections so Q is always a proper
    /// rotation. Antenna sets are planar, so the smallest singular
    /// value is structurally zero: collinearity shows up as a
    /// collapsing second singular value.
    fn svd_rotation(&self, cross: &Matrix3<f64>) -> Result<Matrix3<f64>, Error> {
        let svd = cross.svd(true, true);

        let u = svd.u.ok_or(Error::SolverDegenerate)?;
        let v_t = svd.v_t.ok_or(Error::SolverDegenerate)?;

        // singular values come out sorted descending
        let sigma = svd.singular_values;
        if sigma[1] <= self.opts.degeneracy_epsilon * sigma[0].max(f64::MIN_POSITIVE) {
            return Err(Error::SolverDegenerate);
        }

        let v = v_t.transpose();
        let d = (v * u.transpose()).determinant().signum();

        let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));

        Ok(v * correction * u.transpose())
    }

    /// Fallback path: heading from the first baseline azimuth, pitch
    /// and roll from the tilt of the antenna plane normal, composed
    /// per axis and re-orthogonalized through the Gram matrix.
    /// Small-angle approximation in pitch/roll: documented as inferior
    /// to [SolverMethod::Svd].
    fn euler_rotation(
        &self,
        centered_ref: &[Vector3<f64>],
        centered_obs: &[Vector3<f64>],
    ) -> Result<Matrix3<f64>, Error> {
        let b_ref = centered_ref[1] - centered_ref[0];
        let b_obs = centered_obs[1] - centered_obs[0];

        if b_ref.norm() < self.opts.degeneracy_epsilon
            || b_obs.norm() < self.opts.degeneracy_epsilon
        {
            return Err(Error::SolverDegenerate);
        }

        let heading = azimuth_rad(&b_obs) - azimuth_rad(&b_ref);

        let n_ref = plane_normal(centered_ref, self.opts.degeneracy_epsilon)?;
        let n_obs = plane_normal(centered_obs, self.opts.degeneracy_epsilon)?;

        // de-rotate the observed normal by the heading estimate
        let (sh, ch) = heading.sin_cos();
        let rz = Matrix3::new(ch, sh, 0.0, -sh, ch, 0.0, 0.0, 0.0, 1.0);
        let n_level = rz.transpose() * n_obs;

        let (pitch_obs, roll_obs) = normal_tilt(&n_level);
        let (pitch_ref, roll_ref) = normal_tilt(&n_ref);

        let seed = rotation_from_angles(
            heading.to_degrees(),
            (pitch_obs - pitch_ref).to_degrees(),
            (roll_obs - roll_ref).to_degrees(),
        );

        Ok(gram_stabilize(&seed))
    }
}

/// Unit normal of the point-set plane, vertical component forced
/// positive (upward) by convention.
fn plane_normal(points: &[Vector3<f64>], epsilon: f64) -> Result<Vector3<f64>, Error> {
    let v1 = points[1] - points[0];
    let v2 = points[2] - points[0];

    let mut normal = v1.cross(&v2);
    if normal.norm() < epsilon {
        return Err(Error::SolverDegenerate);
    }

    if normal[2] < 0.0 {
        normal = -normal;
    }

    Ok(normal.normalize())
}

/// Tilt decomposition of an upward plane normal:
/// `n = Rx(pitch)·Ry(roll)·ez` → (pitch, roll) [rad].
fn normal_tilt(normal: &Vector3<f64>) -> (f64, f64) {
    let roll = normal[0].clamp(-1.0, 1.0).asin();
    let pitch = (-normal[1] / roll.cos()).clamp(-1.0, 1.0).asin();
    (pitch, roll)
}

/// Gram matrix stabilization `Q ← Q·(QᵀQ)^(-1/2)`: forces the seed
/// back onto the rotation manifold after the per-axis composition.
fn gram_stabilize(seed: &Matrix3<f64>) -> Matrix3<f64> {
    let gram = seed.transpose() * seed;
    let eigen = gram.symmetric_eigen();

    let mut inv_sqrt = Matrix3::<f64>::zeros();
    for i in 0..3 {
        let lambda = eigen.eigenvalues[i].max(f64::MIN_POSITIVE);
        inv_sqrt[(i, i)] = 1.0 / lambda.sqrt();
    }

    seed * (eigen.eigenvectors * inv_sqrt * eigen.eigenvectors.transpose())
}
