//! RTK solution records and baseline series
use hifitime::{Duration, Epoch};
use nalgebra::Vector3;

/// RTK solution quality tier, mapped from the integer Q code of the
/// solution file. Ordinal from best (Fix) to worst (NoSolution), for
/// display and statistics only, never for numeric computation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Integer ambiguity resolved
    Fix,
    /// Float ambiguity
    Float,
    /// Single point (uncorrected)
    Single,
    /// Differential code solution
    DGps,
    /// Raw pseudo range solution
    Pseudorange,
    /// Dead reckoning
    DeadReckoning,
    /// No solution
    #[default]
    NoSolution,
}

impl Quality {
    /// Maps the solution file Q code (0-6).
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Fix,
            2 => Self::Float,
            3 => Self::Pseudorange,
            4 => Self::DGps,
            5 => Self::Single,
            6 => Self::DeadReckoning,
            _ => Self::NoSolution,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fix => write!(fmt, "FIX"),
            Self::Float => write!(fmt, "FLOAT"),
            Self::Single => write!(fmt, "SINGLE"),
            Self::DGps => write!(fmt, "DGPS"),
            Self::Pseudorange => write!(fmt, "PR"),
            Self::DeadReckoning => write!(fmt, "DR"),
            Self::NoSolution => write!(fmt, "NONE"),
        }
    }
}

/// One timestamped rover-minus-base observation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolutionRecord {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// East/North/Up offset to the base antenna [m]
    pub enu: Vector3<f64>,
    /// Solution [Quality]
    pub quality: Quality,
    /// Number of satellites
    pub nsat: u16,
    /// East/North/Up standard deviations [m], all >= 0
    pub sigma_enu: Vector3<f64>,
    /// Differential age [s]
    pub age: f64,
    /// Ambiguity validation ratio
    pub ratio: f64,
}

impl SolutionRecord {
    /// Combined 3D standard deviation sqrt(sde² + sdn² + sdu²) [m],
    /// the quantity the quality threshold applies to.
    pub fn sigma_3d(&self) -> f64 {
        self.sigma_enu.norm()
    }
}

/// Ordered epoch records for one rover-minus-base antenna pair,
/// immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSeries {
    /// Baseline label, e.g. "Base-Port"
    pub name: String,
    /// Quality-filtered records, in chronological order
    pub records: Vec<SolutionRecord>,
    /// Rows that failed to parse and were skipped
    pub skipped_rows: usize,
    /// Epochs removed by the sigma threshold
    pub filtered_epochs: usize,
}

impl BaselineSeries {
    /// First epoch of the series.
    pub fn start(&self) -> Epoch {
        self.records[0].epoch
    }

    /// Last epoch of the series.
    pub fn end(&self) -> Epoch {
        self.records[self.records.len() - 1].epoch
    }

    /// Covered interval.
    pub fn duration(&self) -> Duration {
        self.end() - self.start()
    }

    /// Number of retained epochs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Epoch count per [Quality] tier, for display collaborators.
    pub fn quality_tally(&self) -> Vec<(Quality, usize)> {
        let mut tally = Vec::<(Quality, usize)>::new();
        for rec in self.records.iter() {
            match tally.iter_mut().find(|(q, _)| *q == rec.quality) {
                Some((_, count)) => *count += 1,
                None => tally.push((rec.quality, 1)),
            }
        }
        tally
    }
}
