//! RTK solution (.pos) file reader
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};
use nalgebra::Vector3;

use crate::{
    error::Error,
    reader::parse_timestamp,
    solution::{BaselineSeries, Quality, SolutionRecord},
};

/// Header lines open with this comment marker.
const HEADER_MARKER: char = '%';

/// Fields per data row:
/// date time e n u Q ns sdn sde sdu sdne sdeu sdun age ratio
const ROW_FIELDS: usize = 15;

/// Parses one RTK solution file into a [BaselineSeries], removing
/// every epoch whose combined 3D sigma exceeds `max_sigma_3d` [m].
///
/// Isolated malformed rows are skipped with a warning and counted in
/// the returned series. Structural failures (header never terminated,
/// nothing parsable) and an empty post-filter result abort with the
/// matching [Error] kind.
pub fn read_pos_file<P: AsRef<Path>>(path: P, max_sigma_3d: f64) -> Result<BaselineSeries, Error> {
    let path = path.as_ref();

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "baseline".to_string());

    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::<SolutionRecord>::new();
    let mut skipped_rows = 0;
    let mut data_reached = false;
    let mut total_rows = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with(HEADER_MARKER) {
            if data_reached {
                // trailing comment, tolerated
                debug!("{}: comment past header (line {})", name, index + 1);
            }
            continue;
        }

        data_reached = true;
        total_rows += 1;

        match parse_row(trimmed) {
            Ok(record) => records.push(record),
            Err(error) => {
                skipped_rows += 1;
                warn!("{}: skipping line {}: {}", name, index + 1, error);
            },
        }
    }

    if !data_reached {
        return Err(Error::HeaderNotTerminated(path.to_path_buf()));
    }

    if records.is_empty() {
        return Err(Error::NoRecords(path.to_path_buf()));
    }

    records.sort_by(|a, b| a.epoch.cmp(&b.epoch));

    let parsed = records.len();
    records.retain(|rec| rec.sigma_3d() <= max_sigma_3d);
    let filtered_epochs = parsed - records.len();

    debug!(
        "{}: {} rows, {} parsed, {} retained (sigma <= {} m)",
        name,
        total_rows,
        parsed,
        records.len(),
        max_sigma_3d
    );

    if records.is_empty() {
        return Err(Error::InsufficientData);
    }

    Ok(BaselineSeries {
        name,
        records,
        skipped_rows,
        filtered_epochs,
    })
}

/// Row level problems are recovered locally (row skipped and counted),
/// so they carry a plain diagnostic instead of an [Error] kind.
fn parse_row(row: &str) -> Result<SolutionRecord, String> {
    let fields: Vec<&str> = row.split_whitespace().collect();

    if fields.len() < ROW_FIELDS {
        return Err(format!("{} fields, {} required", fields.len(), ROW_FIELDS));
    }

    let epoch =
        parse_timestamp(fields[0], fields[1]).map_err(|_| "unparsable timestamp".to_string())?;

    let number = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|_| format!("non numeric field \"{}\"", field))
    };

    let east = number(fields[2])?;
    let north = number(fields[3])?;
    let up = number(fields[4])?;

    let quality = fields[5]
        .parse::<u8>()
        .map(Quality::from_code)
        .map_err(|_| format!("invalid quality code \"{}\"", fields[5]))?;

    let nsat = fields[6]
        .parse::<u16>()
        .map_err(|_| format!("invalid satellite count \"{}\"", fields[6]))?;

    let sdn = number(fields[7])?;
    let sde = number(fields[8])?;
    let sdu = number(fields[9])?;

    if sdn < 0.0 || sde < 0.0 || sdu < 0.0 {
        return Err(format!("negative sigma ({}, {}, {})", sde, sdn, sdu));
    }

    // correlation terms (fields 10-12) are not consumed
    let age = number(fields[13])?;
    let ratio = number(fields[14])?;

    Ok(SolutionRecord {
        epoch,
        enu: Vector3::new(east, north, up),
        quality,
        nsat,
        sigma_enu: Vector3::new(sde, sdn, sdu),
        age,
        ratio,
    })
}
