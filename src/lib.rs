#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

pub mod attitude;
pub mod bias;
pub mod cfg;
pub mod geometry;
pub mod pipeline;
pub mod procrustes;
pub mod reader;
pub mod rtkproc;
pub mod solution;
pub mod stats;
pub mod sync;

mod error;

// prelude
pub mod prelude {
    pub use crate::attitude::{
        angles_from_rotation, attitude_from_baseline, attitude_from_rotation, heading_diff_deg,
        rotation_from_angles, wrap_360, Attitude, AttitudeMethod,
    };
    pub use crate::bias::{geometric_bias, GeometricBias};
    pub use crate::cfg::{Config, ProcessOpts, QualityOpts, SolverMethod, SolverOpts, SyncOpts};
    pub use crate::geometry::AntennaGeometry;
    pub use crate::pipeline::{
        process_run, single_baseline_attitudes, ReferenceComparison, RunSummary,
    };
    pub use crate::procrustes::{ProcrustesSolver, RigidTransform};
    pub use crate::reader::{
        read_ins_log, read_pos_file, read_split_ins_logs, InsRecord, InsSeries, SignConvention,
    };
    pub use crate::rtkproc::{run_baselines, BaselineJob, ProcessReport, RtkInvocation};
    pub use crate::solution::{BaselineSeries, Quality, SolutionRecord};
    pub use crate::stats::{
        angle_stats, circular_mean_deg, difference_stats, heading_stats, sampling_stats,
        AngleStats, Averager, SamplingStats,
    };
    pub use crate::sync::{common_window, interpolate, nearest_merge, SyncFrame, TimeSeries};
    pub use crate::Error;
    // re-export
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::{Matrix3, Vector3};
}

// pub export
pub use error::Error;

#[cfg(test)]
mod tests;
