//! Per-baseline processing pipeline
//!
//! Raw solution series → synchronized frame → per-epoch rigid
//! transform → attitude time series + geometric bias + attrition
//! statistics. Pure function of its inputs: safe to run one pipeline
//! per baseline set on any number of worker threads.
use hifitime::Epoch;
use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::{
    attitude::{attitude_from_baseline, attitude_from_rotation, Attitude},
    bias::{geometric_bias, GeometricBias},
    cfg::Config,
    error::Error,
    geometry::AntennaGeometry,
    procrustes::ProcrustesSolver,
    reader::InsSeries,
    solution::BaselineSeries,
    stats::{difference_stats, sampling_stats, AngleStats},
    sync::{nearest_merge, SyncFrame, TimeSeries},
};

/// Computed-minus-reference angle statistics, when an inertial
/// reference sensor was synchronized into the run. Heading
/// differences are circular, pitch/roll linear.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceComparison {
    pub heading: Option<AngleStats>,
    pub pitch: Option<AngleStats>,
    pub roll: Option<AngleStats>,
}

/// Outcome of one processing run.
///
/// Unresolved epochs stay in the time index as `None` so the
/// attrition rate stays visible downstream; they are never silently
/// dropped.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Per-epoch attitude estimates over the synchronized time index
    pub attitudes: Vec<(Epoch, Option<Attitude>)>,
    /// Static geometric bias of the antenna plane
    pub bias: GeometricBias,
    /// Synchronized epochs processed
    pub total_epochs: usize,
    /// Epochs that resolved to an attitude
    pub valid_epochs: usize,
    /// Epochs rejected by the baseline-length consistency check
    pub rejected_geometry: usize,
    /// Epochs where the rigid transform fit failed
    pub solver_failures: usize,
    /// Rows dropped during synchronization
    pub dropped_rows: usize,
    /// Reference sensor comparison, when available
    pub reference: Option<ReferenceComparison>,
}

impl RunSummary {
    /// Fraction of synchronized epochs that resolved.
    pub fn valid_ratio(&self) -> f64 {
        if self.total_epochs == 0 {
            0.0
        } else {
            self.valid_epochs as f64 / self.total_epochs as f64
        }
    }
}

/// Runs the full multi-antenna pipeline.
///
/// The geometry's first antenna is the base; each following antenna
/// pairs with the baseline series of the same rank (`baselines[k]`
/// observes antenna `k + 1`). An inertial series, when provided, is
/// synchronized in and compared against the computed attitudes.
///
/// Fails with [Error::RunQuality] when fewer than the configured
/// fraction of epochs resolve; partial losses below that threshold
/// are reported through the [RunSummary] counters instead.
pub fn process_run(
    cfg: &Config,
    geometry: &AntennaGeometry,
    baselines: &[BaselineSeries],
    ins: Option<&InsSeries>,
) -> Result<RunSummary, Error> {
    if baselines.len() + 1 != geometry.len() {
        return Err(Error::ConfigurationMismatch);
    }

    let series: Vec<TimeSeries> = baselines.iter().map(TimeSeries::from).collect();
    let ins_series = ins.map(TimeSeries::from);

    let mut secondaries: Vec<&TimeSeries> = series[1..].iter().collect();
    if let Some(ref ins_series) = ins_series {
        secondaries.push(ins_series);
    }

    let frame = nearest_merge(&series[0], &secondaries, cfg.sync.merge_tolerance)?;
    if frame.is_empty() {
        return Err(Error::NoOverlap);
    }

    if let Some(cadence) = sampling_stats(&frame.epochs) {
        debug!(
            "synchronized {} epochs at {:.2} Hz (regularity {:.2})",
            frame.len(),
            cadence.rate_hz,
            cadence.regularity
        );
    }

    let reference_points = geometry.relative_points();
    let solver = ProcrustesSolver::new(&cfg.solver);

    let columns = enu_columns(&frame, baselines)?;

    let mut attitudes = Vec::<(Epoch, Option<Attitude>)>::with_capacity(frame.len());
    let mut rejected_geometry = 0;
    let mut solver_failures = 0;

    for (row, epoch) in frame.epochs.iter().enumerate() {
        let mut observed = Vec::<Vector3<f64>>::with_capacity(geometry.len());
        // base antenna anchors the observed configuration
        observed.push(Vector3::zeros());

        for (east, north, up) in columns.iter() {
            observed.push(Vector3::new(east[row], north[row], up[row]));
        }

        if observed.iter().any(|p| p.iter().any(|v| v.is_nan())) {
            solver_failures += 1;
            attitudes.push((*epoch, None));
            continue;
        }

        if !baselines_consistent(
            &reference_points,
            &observed,
            cfg.quality.baseline_tolerance_m,
        ) {
            rejected_geometry += 1;
            attitudes.push((*epoch, None));
            debug!("{}: inconsistent baseline geometry, epoch rejected", epoch);
            continue;
        }

        match solver.solve(&reference_points, &observed) {
            Ok(fit) => {
                attitudes.push((
                    *epoch,
                    Some(attitude_from_rotation(*epoch, &fit.rotation, fit.residual)),
                ));
            },
            Err(error) => {
                solver_failures += 1;
                attitudes.push((*epoch, None));
                warn!("{}: {}", epoch, error);
            },
        }
    }

    let total_epochs = attitudes.len();
    let valid_epochs = attitudes.iter().filter(|(_, a)| a.is_some()).count();

    info!(
        "run: {}/{} epochs resolved ({} geometry rejects, {} solver failures)",
        valid_epochs, total_epochs, rejected_geometry, solver_failures
    );

    if (valid_epochs as f64) < cfg.quality.min_valid_ratio * total_epochs as f64 {
        return Err(Error::RunQuality {
            valid: valid_epochs,
            total: total_epochs,
        });
    }

    let reference = ins_series
        .as_ref()
        .map(|ins| compare_reference(&frame, &ins.name, &attitudes));

    Ok(RunSummary {
        bias: geometric_bias(geometry),
        total_epochs,
        valid_epochs,
        rejected_geometry,
        solver_failures,
        dropped_rows: frame.dropped_rows,
        reference,
        attitudes,
    })
}

/// Two-antenna alternative: attitudes approximated from a single
/// baseline series against its nominal vessel-frame vector. Heading
/// and pitch only, roll unobservable; every produced [Attitude] is
/// labeled with the single-baseline method. Lower accuracy than the
/// full fit of [process_run]: do not mix the two outputs.
pub fn single_baseline_attitudes(
    series: &BaselineSeries,
    nominal: &Vector3<f64>,
) -> Vec<(Epoch, Option<Attitude>)> {
    series
        .records
        .iter()
        .map(|rec| {
            let usable = !rec.enu.iter().any(|v| v.is_nan()) && rec.enu.norm() > 0.0;
            if usable {
                (
                    rec.epoch,
                    Some(attitude_from_baseline(rec.epoch, nominal, &rec.enu)),
                )
            } else {
                (rec.epoch, None)
            }
        })
        .collect()
}

/// Borrows the e/n/u columns of every rover from the frame.
fn enu_columns<'a>(
    frame: &'a SyncFrame,
    baselines: &[BaselineSeries],
) -> Result<Vec<(&'a [f64], &'a [f64], &'a [f64])>, Error> {
    let mut columns = Vec::with_capacity(baselines.len());

    for series in baselines.iter() {
        let east = frame
            .channel(&format!("{}.e", series.name))
            .ok_or_else(|| Error::MissingColumn(format!("{}.e", series.name)))?;
        let north = frame
            .channel(&format!("{}.n", series.name))
            .ok_or_else(|| Error::MissingColumn(format!("{}.n", series.name)))?;
        let up = frame
            .channel(&format!("{}.u", series.name))
            .ok_or_else(|| Error::MissingColumn(format!("{}.u", series.name)))?;
        columns.push((east, north, up));
    }

    Ok(columns)
}

/// Observed pairwise baseline lengths must stay within tolerance of
/// the as-designed values: the nominal geometry is ground truth.
fn baselines_consistent(
    reference: &[Vector3<f64>],
    observed: &[Vector3<f64>],
    tolerance_m: f64,
) -> bool {
    for i in 0..reference.len() {
        for j in (i + 1)..reference.len() {
            let nominal = (reference[j] - reference[i]).norm();
            let actual = (observed[j] - observed[i]).norm();
            if (actual - nominal).abs() > tolerance_m {
                return false;
            }
        }
    }
    true
}

/// Heading/pitch/roll differences against the synchronized reference
/// sensor channels.
fn compare_reference(
    frame: &SyncFrame,
    ins_name: &str,
    attitudes: &[(Epoch, Option<Attitude>)],
) -> ReferenceComparison {
    let channel = |angle: &str| frame.channel(&format!("{}.{}", ins_name, angle));

    let computed = |f: fn(&Attitude) -> f64| -> Vec<f64> {
        attitudes
            .iter()
            .map(|(_, a)| a.as_ref().map(f).unwrap_or(f64::NAN))
            .collect()
    };

    let heading = channel("heading")
        .and_then(|r| difference_stats(&computed(|a| a.heading_deg), r, true));
    let pitch = channel("pitch").and_then(|r| difference_stats(&computed(|a| a.pitch_deg), r, false));
    let roll = channel("roll").and_then(|r| difference_stats(&computed(|a| a.roll_deg), r, false));

    ReferenceComparison {
        heading,
        pitch,
        roll,
    }
}
