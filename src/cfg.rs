//! Processing configuration
#[cfg(feature = "serde")]
use serde::Deserialize;

use hifitime::{Duration, Unit};

/// Rigid transform solving method
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum SolverMethod {
    /// SVD based orthogonal Procrustes solution (Kabsch).
    /// Numerically stable under observation noise: this is the
    /// default and the reference method.
    #[default]
    Svd,
    /// Per-axis Euler seed re-orthogonalized through the Gram matrix.
    /// Kept as a fallback only, validated against the same test
    /// vectors as [SolverMethod::Svd].
    EulerFallback,
}

impl std::fmt::Display for SolverMethod {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Svd => write!(fmt, "SVD"),
            Self::EulerFallback => write!(fmt, "Euler-Fallback"),
        }
    }
}

fn default_max_sigma_3d() -> f64 {
    0.1
}

fn default_baseline_tolerance() -> f64 {
    1.0
}

fn default_min_valid_ratio() -> f64 {
    0.5
}

fn default_grid_points() -> usize {
    1024
}

fn default_merge_tolerance() -> Duration {
    Duration::from_milliseconds(500.0)
}

fn default_degeneracy_epsilon() -> f64 {
    1e-9
}

fn default_estimate_scale() -> bool {
    false
}

fn default_timeout() -> Duration {
    5.0 * Unit::Minute
}

/// Epoch quality criteria
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct QualityOpts {
    /// Maximal acceptable combined 3D standard deviation
    /// sqrt(sde² + sdn² + sdu²) in meters. Epochs above this
    /// threshold are physically removed from the parsed series.
    #[cfg_attr(feature = "serde", serde(default = "default_max_sigma_3d"))]
    pub max_sigma_3d: f64,
    /// Maximal deviation in meters between an observed baseline length
    /// and its nominal (as-designed) value before the epoch is
    /// rejected as geometrically inconsistent.
    #[cfg_attr(feature = "serde", serde(default = "default_baseline_tolerance"))]
    pub baseline_tolerance_m: f64,
    /// Minimal fraction ]0; 1] of epochs that must resolve to an
    /// attitude for the run to be trusted.
    #[cfg_attr(feature = "serde", serde(default = "default_min_valid_ratio"))]
    pub min_valid_ratio: f64,
}

impl Default for QualityOpts {
    fn default() -> Self {
        Self {
            max_sigma_3d: default_max_sigma_3d(),
            baseline_tolerance_m: default_baseline_tolerance(),
            min_valid_ratio: default_min_valid_ratio(),
        }
    }
}

/// Time synchronization options
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct SyncOpts {
    /// Number of points of the uniform grid generated across the
    /// common window when resampling by interpolation.
    #[cfg_attr(feature = "serde", serde(default = "default_grid_points"))]
    pub grid_points: usize,
    /// Tolerance window of the nearest-match merge policy. Primary
    /// epochs with no secondary sample within this window are dropped.
    #[cfg_attr(feature = "serde", serde(default = "default_merge_tolerance"))]
    pub merge_tolerance: Duration,
}

impl Default for SyncOpts {
    fn default() -> Self {
        Self {
            grid_points: default_grid_points(),
            merge_tolerance: default_merge_tolerance(),
        }
    }
}

/// Rigid transform solver options
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct SolverOpts {
    /// Method to use. [SolverMethod::Svd] unless you have a reason.
    #[cfg_attr(feature = "serde", serde(default))]
    pub method: SolverMethod,
    /// Estimate a uniform scale along with the rotation.
    /// Baselines are expressed in meters on both sides, so scale
    /// should remain disabled in nominal processing.
    #[cfg_attr(feature = "serde", serde(default = "default_estimate_scale"))]
    pub estimate_scale: bool,
    /// Degeneracy threshold: the fit is rejected when the second
    /// singular value of the cross covariance collapses below
    /// epsilon relative to the first.
    #[cfg_attr(feature = "serde", serde(default = "default_degeneracy_epsilon"))]
    pub degeneracy_epsilon: f64,
}

impl Default for SolverOpts {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            estimate_scale: default_estimate_scale(),
            degeneracy_epsilon: default_degeneracy_epsilon(),
        }
    }
}

/// External RTK solver invocation options
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct ProcessOpts {
    /// Hard timeout per baseline. The solver process is killed past
    /// this duration and the baseline reported failed.
    #[cfg_attr(feature = "serde", serde(default = "default_timeout"))]
    pub timeout: Duration,
}

impl Default for ProcessOpts {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

/// Processing configuration, one per run.
/// No process-wide state: every pipeline stage receives the [Config]
/// (or the relevant option group) explicitly.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Epoch quality criteria
    #[cfg_attr(feature = "serde", serde(default))]
    pub quality: QualityOpts,
    /// Time synchronization options
    #[cfg_attr(feature = "serde", serde(default))]
    pub sync: SyncOpts,
    /// Rigid transform solver options
    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverOpts,
    /// External process options
    #[cfg_attr(feature = "serde", serde(default))]
    pub process: ProcessOpts,
}

#[cfg(test)]
#[cfg(feature = "serde")]
mod test {
    use super::Config;

    #[test]
    fn deserialize_partial_config() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "quality": { "max_sigma_3d": 0.05 },
                "solver": { "estimate_scale": true }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.quality.max_sigma_3d, 0.05);
        assert_eq!(cfg.quality.baseline_tolerance_m, 1.0);
        assert!(cfg.solver.estimate_scale);
        assert_eq!(cfg.sync.grid_points, 1024);
    }
}
