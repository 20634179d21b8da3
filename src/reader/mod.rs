//! Input file readers: RTK solution files and inertial sensor logs
use hifitime::Epoch;

use crate::error::Error;

mod ins;
mod pos;

pub use ins::{read_ins_log, read_split_ins_logs, InsRecord, InsSeries, SignConvention};
pub use pos::read_pos_file;

/// Parses a solution/sensor timestamp into an [Epoch] (UTC).
/// Accepts `YYYY/MM/DD hh:mm:ss.sss` (RTKLIB) and the dash/`T`
/// separated equivalents found in sensor exports.
pub(crate) fn parse_timestamp(date: &str, time: &str) -> Result<Epoch, Error> {
    let invalid = || Error::InvalidTimestamp(format!("{} {}", date, time));

    let mut ymd = date.split(['/', '-']);
    let year = ymd
        .next()
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = ymd
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(invalid)?;
    let day = ymd
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(invalid)?;

    let mut hms = time.split(':');
    let hour = hms
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(invalid)?;
    let minute = hms
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(invalid)?;
    let seconds = hms
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(invalid)?;

    let plausible = (1..=12).contains(&month)
        && (1..=31).contains(&day)
        && hour <= 23
        && minute <= 59
        && (0.0..60.0).contains(&seconds);
    if !plausible {
        return Err(invalid());
    }

    let second = seconds.floor();
    let nanos = ((seconds - second) * 1.0E9).round() as u32;

    Ok(Epoch::from_gregorian_utc(
        year,
        month,
        day,
        hour,
        minute,
        second as u8,
        nanos,
    ))
}

/// Single-field variant: date and time joined by a blank or `T`.
pub(crate) fn parse_datetime(stamp: &str) -> Result<Epoch, Error> {
    let stamp = stamp.trim();
    let (date, time) = stamp
        .split_once([' ', 'T'])
        .ok_or_else(|| Error::InvalidTimestamp(stamp.to_string()))?;
    parse_timestamp(date.trim(), time.trim())
}

#[cfg(test)]
mod test {
    use super::{parse_datetime, parse_timestamp};
    use hifitime::Epoch;

    #[test]
    fn rtklib_timestamp() {
        let epoch = parse_timestamp("2025/07/16", "01:23:45.500").unwrap();
        assert_eq!(
            epoch,
            Epoch::from_gregorian_utc(2025, 7, 16, 1, 23, 45, 500_000_000)
        );
    }

    #[test]
    fn iso_datetime() {
        let epoch = parse_datetime("2025-07-16T01:23:45").unwrap();
        assert_eq!(epoch, Epoch::from_gregorian_utc_hms(2025, 7, 16, 1, 23, 45));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("not a date").is_err());
        assert!(parse_timestamp("2025/07/16", "25:xx:00").is_err());
    }
}
