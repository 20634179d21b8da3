use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Solution file header is opened with the comment marker
    /// but the data section is never reached.
    #[error("{0:?}: header terminator never found")]
    HeaderNotTerminated(PathBuf),

    /// Valid file structure, but not a single data row could be parsed.
    /// Isolated malformed rows are skipped and counted, so winding up
    /// here means the whole data section is unusable.
    #[error("{0:?}: no parsable data records")]
    NoRecords(PathBuf),

    /// Inertial sensor log misses one of the expected columns.
    #[error("missing column \"{0}\" in sensor log")]
    MissingColumn(String),

    /// Sensor log timestamp that does not follow any supported format.
    #[error("unparsable timestamp \"{0}\"")]
    InvalidTimestamp(String),

    /// Valid file, but zero usable epochs are left once the
    /// quality threshold has been applied.
    #[error("no usable epochs after quality filtering")]
    InsufficientData,

    /// Time synchronization requires all series to share a common
    /// window of positive duration.
    #[error("input series do not overlap in time")]
    NoOverlap,

    /// Geometry requires at least 3 antennas for a rigid transform solution.
    #[error("at least 3 antennas required, {0} given")]
    NotEnoughAntennas(usize),

    /// All antennas lie on one line: the mounting plane is undefined.
    #[error("antenna geometry is collinear")]
    CollinearGeometry,

    /// Duplicate antenna identifier in the geometry definition.
    #[error("duplicate antenna \"{0}\"")]
    DuplicateAntenna(String),

    /// Procrustes fit is numerically unstable: near-collinear observed
    /// points or near-zero reference variance. We abort rather than
    /// return a near-arbitrary rotation.
    #[error("degenerate point configuration: procrustes fit aborted")]
    SolverDegenerate,

    /// Reference and observed configurations must pair up point by point.
    #[error("reference and observed configurations differ in size")]
    ConfigurationMismatch,

    /// Too many per-epoch failures to trust this run.
    #[error("only {valid}/{total} epochs resolved, below the configured minimum")]
    RunQuality { valid: usize, total: usize },

    /// RTK solver binary is not present at the configured path.
    #[error("solver executable not found: {0:?}")]
    MissingExecutable(PathBuf),

    /// RTK solver returned a non-zero exit status for this baseline.
    /// Sibling baselines are unaffected.
    #[error("baseline {name}: solver exited with {status:?}")]
    ProcessFailed { name: String, status: Option<i32> },

    /// RTK solver exceeded the configured timeout and was killed.
    #[error("baseline {name}: solver timed out after {seconds} s")]
    ProcessTimeout { name: String, seconds: u64 },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
