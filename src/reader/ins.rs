//! Inertial sensor (heading/pitch/roll) log reader
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use hifitime::{Duration, Epoch};
use log::{debug, warn};

use crate::error::Error;

/// One inertial sensor sample, angles in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InsRecord {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Heading, clockwise from north, [0, 360)°
    pub heading_deg: f64,
    /// Pitch, positive bow up, [-90, 90]°
    pub pitch_deg: f64,
    /// Roll, positive port up, (-180, 180]°
    pub roll_deg: f64,
}

/// Reference sensor time series.
#[derive(Debug, Clone, PartialEq)]
pub struct InsSeries {
    /// Sensor label (file stem)
    pub name: String,
    /// Chronological samples
    pub records: Vec<InsRecord>,
    /// Rows that failed to parse and were skipped
    pub skipped_rows: usize,
    /// Rows dropped because the heading and pitch/roll sub-streams
    /// could not be merged (split-log path only)
    pub unmerged_rows: usize,
}

impl InsSeries {
    pub fn start(&self) -> Epoch {
        self.records[0].epoch
    }

    pub fn end(&self) -> Epoch {
        self.records[self.records.len() - 1].epoch
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sign factors mapping a sensor's native conventions onto the vessel
/// frame (heading clockwise from north, pitch + bow up, roll + port
/// up). Angles are normalized after the factors apply: heading to
/// [0, 360), pitch clamped to ±90, roll wrapped to ±180.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SignConvention {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Default for SignConvention {
    fn default() -> Self {
        Self {
            heading: 1.0,
            pitch: 1.0,
            roll: 1.0,
        }
    }
}

impl SignConvention {
    fn apply(&self, heading: f64, pitch: f64, roll: f64) -> (f64, f64, f64) {
        let heading = (heading * self.heading).rem_euclid(360.0);
        let pitch = (pitch * self.pitch).clamp(-90.0, 90.0);
        let roll = (roll * self.roll + 180.0).rem_euclid(360.0) - 180.0;
        (heading, pitch, roll)
    }
}

/// Candidate names of the timestamp column, lowercase.
const TIME_COLUMNS: [&str; 3] = ["time", "timestamp", "datetime"];

/// Sniffs the delimiter from the first line: `,`, `;` or tab,
/// whichever occurs most.
fn sniff_delimiter<P: AsRef<Path>>(path: P) -> Result<u8, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut first = String::new();
    reader.read_line(&mut first)?;

    let delimiter = [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| first.bytes().filter(|b| b == d).count())
        .unwrap_or(b',');

    Ok(delimiter)
}

fn column_index(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

fn required_column(headers: &StringRecord, name: &str) -> Result<usize, Error> {
    column_index(headers, &[name]).ok_or_else(|| Error::MissingColumn(name.to_string()))
}

fn file_stem<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "ins".to_string())
}

/// Parses a complete sensor log (timestamp + heading + pitch + roll
/// columns, delimiter auto-detected) into an [InsSeries], applying
/// the sensor [SignConvention] on ingestion.
pub fn read_ins_log<P: AsRef<Path>>(
    path: P,
    convention: SignConvention,
) -> Result<InsSeries, Error> {
    let path = path.as_ref();
    let name = file_stem(path);
    let delimiter = sniff_delimiter(path)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let time_idx =
        column_index(&headers, &TIME_COLUMNS).ok_or_else(|| Error::MissingColumn("time".into()))?;
    let heading_idx = required_column(&headers, "heading")?;
    let pitch_idx = required_column(&headers, "pitch")?;
    let roll_idx = required_column(&headers, "roll")?;

    let mut records = Vec::<InsRecord>::new();
    let mut skipped_rows = 0;

    for (index, row) in reader.records().enumerate() {
        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|row| parse_angles(&row, time_idx, &[heading_idx, pitch_idx, roll_idx]));

        match parsed {
            Ok((epoch, angles)) => {
                let (heading_deg, pitch_deg, roll_deg) =
                    convention.apply(angles[0], angles[1], angles[2]);
                records.push(InsRecord {
                    epoch,
                    heading_deg,
                    pitch_deg,
                    roll_deg,
                });
            },
            Err(error) => {
                skipped_rows += 1;
                warn!("{}: skipping row {}: {}", name, index + 2, error);
            },
        }
    }

    finalize(path, name, records, skipped_rows, 0)
}

/// Parses split heading-only and pitch/roll-only logs and merges them
/// on near-exact timestamp match (`tolerance`). Rows that fail to
/// merge are discarded and counted.
pub fn read_split_ins_logs<P: AsRef<Path>>(
    heading_path: P,
    pitchroll_path: P,
    convention: SignConvention,
    tolerance: Duration,
) -> Result<InsSeries, Error> {
    let heading_path = heading_path.as_ref();
    let name = file_stem(heading_path);

    let (mut heading_rows, heading_skips) = read_columns(heading_path, &["heading"])?;
    let (mut pitchroll_rows, pitchroll_skips) =
        read_columns(pitchroll_path.as_ref(), &["pitch", "roll"])?;

    heading_rows.sort_by(|a, b| a.0.cmp(&b.0));
    pitchroll_rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut records = Vec::<InsRecord>::new();
    let mut unmerged_rows = 0;
    let mut cursor = 0;

    for (epoch, angles) in heading_rows.iter() {
        // advance to the nearest pitch/roll sample
        while cursor + 1 < pitchroll_rows.len()
            && (pitchroll_rows[cursor + 1].0 - *epoch).abs()
                <= (pitchroll_rows[cursor].0 - *epoch).abs()
        {
            cursor += 1;
        }

        match pitchroll_rows.get(cursor) {
            Some((pr_epoch, pr_angles)) if (*pr_epoch - *epoch).abs() <= tolerance => {
                let (heading_deg, pitch_deg, roll_deg) =
                    convention.apply(angles[0], pr_angles[0], pr_angles[1]);
                records.push(InsRecord {
                    epoch: *epoch,
                    heading_deg,
                    pitch_deg,
                    roll_deg,
                });
            },
            _ => unmerged_rows += 1,
        }
    }

    debug!(
        "{}: merged {} samples, {} unmerged",
        name,
        records.len(),
        unmerged_rows
    );

    finalize(
        heading_path,
        name,
        records,
        heading_skips + pitchroll_skips,
        unmerged_rows,
    )
}

type AngleRows = Vec<(Epoch, Vec<f64>)>;

/// Reads (timestamp, angle columns) rows from one CSV log.
fn read_columns(path: &Path, columns: &[&str]) -> Result<(AngleRows, usize), Error> {
    let name = file_stem(path);
    let delimiter = sniff_delimiter(path)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let time_idx =
        column_index(&headers, &TIME_COLUMNS).ok_or_else(|| Error::MissingColumn("time".into()))?;

    let mut indexes = Vec::<usize>::with_capacity(columns.len());
    for column in columns {
        indexes.push(required_column(&headers, column)?);
    }

    let mut rows = AngleRows::new();
    let mut skipped = 0;

    for (index, row) in reader.records().enumerate() {
        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|row| parse_angles(&row, time_idx, &indexes));

        match parsed {
            Ok(parsed) => rows.push(parsed),
            Err(error) => {
                skipped += 1;
                warn!("{}: skipping row {}: {}", name, index + 2, error);
            },
        }
    }

    Ok((rows, skipped))
}

fn parse_angles(
    row: &StringRecord,
    time_idx: usize,
    angle_idx: &[usize],
) -> Result<(Epoch, Vec<f64>), String> {
    let stamp = row.get(time_idx).ok_or("missing timestamp field")?;
    let epoch = super::parse_datetime(stamp).map_err(|e| e.to_string())?;

    let mut values = Vec::<f64>::with_capacity(angle_idx.len());
    for idx in angle_idx {
        let field = row.get(*idx).ok_or("missing angle field")?;
        let value = field
            .parse::<f64>()
            .map_err(|_| format!("non numeric field \"{}\"", field))?;
        values.push(value);
    }

    Ok((epoch, values))
}

fn finalize(
    path: &Path,
    name: String,
    mut records: Vec<InsRecord>,
    skipped_rows: usize,
    unmerged_rows: usize,
) -> Result<InsSeries, Error> {
    if records.is_empty() {
        return Err(Error::NoRecords(path.to_path_buf()));
    }

    records.sort_by(|a, b| a.epoch.cmp(&b.epoch));

    Ok(InsSeries {
        name,
        records,
        skipped_rows,
        unmerged_rows,
    })
}
