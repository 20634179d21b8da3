//! Multi sensor time synchronization
//!
//! Two resampling policies, both deterministic and free of any wall
//! clock dependency:
//! - [interpolate]: common-window uniform grid, piecewise linear
//!   interpolation of every input channel onto that grid.
//! - [nearest_merge]: nearest-match merge of slower/irregular series
//!   onto a primary series' own timestamps, within a bounded
//!   tolerance window.
use hifitime::{Duration, Epoch, Unit};
use log::{debug, warn};

use crate::{
    error::Error,
    reader::InsSeries,
    solution::BaselineSeries,
};

/// One independently sampled input to the synchronizer: a shared
/// chronological epoch axis and named scalar channels over it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Series label, prefixes channel keys in the output frame
    pub name: String,
    /// Chronological sampling instants
    pub epochs: Vec<Epoch>,
    /// (channel name, one value per epoch)
    pub channels: Vec<(String, Vec<f64>)>,
}

impl TimeSeries {
    pub fn start(&self) -> Epoch {
        self.epochs[0]
    }

    pub fn end(&self) -> Epoch {
        self.epochs[self.epochs.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

impl From<&BaselineSeries> for TimeSeries {
    fn from(series: &BaselineSeries) -> Self {
        Self {
            name: series.name.clone(),
            epochs: series.records.iter().map(|rec| rec.epoch).collect(),
            channels: vec![
                (
                    "e".to_string(),
                    series.records.iter().map(|rec| rec.enu[0]).collect(),
                ),
                (
                    "n".to_string(),
                    series.records.iter().map(|rec| rec.enu[1]).collect(),
                ),
                (
                    "u".to_string(),
                    series.records.iter().map(|rec| rec.enu[2]).collect(),
                ),
            ],
        }
    }
}

impl From<&InsSeries> for TimeSeries {
    fn from(series: &InsSeries) -> Self {
        Self {
            name: series.name.clone(),
            epochs: series.records.iter().map(|rec| rec.epoch).collect(),
            channels: vec![
                (
                    "heading".to_string(),
                    series.records.iter().map(|rec| rec.heading_deg).collect(),
                ),
                (
                    "pitch".to_string(),
                    series.records.iter().map(|rec| rec.pitch_deg).collect(),
                ),
                (
                    "roll".to_string(),
                    series.records.iter().map(|rec| rec.roll_deg).collect(),
                ),
            ],
        }
    }
}

/// All input series resampled onto one shared time index.
/// Channel keys are `"series.channel"`. Created once per processing
/// run and discarded after attitude computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFrame {
    /// Shared time index
    pub epochs: Vec<Epoch>,
    channels: Vec<(String, Vec<f64>)>,
    /// Queries clamped to a series' own time extent (Policy A)
    pub clamped_samples: usize,
    /// Primary rows dropped for lack of a match (Policy B)
    pub dropped_rows: usize,
}

impl SyncFrame {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Channel column by `"series.channel"` key.
    pub fn channel(&self, key: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
    }

    /// All channel keys, in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.channels.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Common time window `[max(starts), min(ends)]` of all series.
pub fn common_window(series: &[TimeSeries]) -> Result<(Epoch, Epoch), Error> {
    if series.is_empty() || series.iter().any(|s| s.is_empty()) {
        return Err(Error::NoOverlap);
    }

    let start = series
        .iter()
        .map(|s| s.start())
        .max()
        .ok_or(Error::NoOverlap)?;

    let end = series.iter().map(|s| s.end()).min().ok_or(Error::NoOverlap)?;

    if end <= start {
        return Err(Error::NoOverlap);
    }

    Ok((start, end))
}

/// Policy A: resamples all series onto a uniform grid of
/// `grid_points` instants across their common window, by piecewise
/// linear interpolation between the two bracketing samples.
/// Queries outside a series' own extent never extrapolate: they clamp
/// to the nearest valid sample, and clamps are counted and logged.
pub fn interpolate(series: &[TimeSeries], grid_points: usize) -> Result<SyncFrame, Error> {
    let (start, end) = common_window(series)?;

    let points = grid_points.max(2);
    let step_s = (end - start).to_seconds() / (points as f64 - 1.0);

    let grid: Vec<Epoch> = (0..points)
        .map(|i| start + (i as f64 * step_s) * Unit::Second)
        .collect();

    let mut channels = Vec::<(String, Vec<f64>)>::new();
    let mut clamped_samples = 0;

    for input in series.iter() {
        let offsets: Vec<f64> = input
            .epochs
            .iter()
            .map(|e| (*e - start).to_seconds())
            .collect();

        for (channel, values) in input.channels.iter() {
            let mut column = Vec::<f64>::with_capacity(grid.len());
            let mut clamped = 0;

            for instant in grid.iter() {
                let t = (*instant - start).to_seconds();
                column.push(interpolate_at(&offsets, values, t, &mut clamped));
            }

            if clamped > 0 {
                warn!(
                    "{}.{}: {} sample(s) clamped to series extent",
                    input.name, channel, clamped
                );
                clamped_samples += clamped;
            }

            channels.push((format!("{}.{}", input.name, channel), column));
        }
    }

    debug!(
        "interpolated {} series onto {} points over [{} - {}]",
        series.len(),
        points,
        start,
        end
    );

    Ok(SyncFrame {
        epochs: grid,
        channels,
        clamped_samples,
        dropped_rows: 0,
    })
}

/// Linear interpolation of `(offsets, values)` at `t` seconds.
/// `offsets` is sorted ascending. Out-of-extent queries clamp.
fn interpolate_at(offsets: &[f64], values: &[f64], t: f64, clamped: &mut usize) -> f64 {
    if t <= offsets[0] {
        if t < offsets[0] {
            *clamped += 1;
        }
        return values[0];
    }

    if t >= offsets[offsets.len() - 1] {
        if t > offsets[offsets.len() - 1] {
            *clamped += 1;
        }
        return values[values.len() - 1];
    }

    let right = offsets.partition_point(|o| *o < t);
    let left = right - 1;

    let span = offsets[right] - offsets[left];
    if span <= 0.0 {
        return values[left];
    }

    let alpha = (t - offsets[left]) / span;
    values[left] + alpha * (values[right] - values[left])
}

/// Policy B: merges every secondary series onto the primary series'
/// own timestamps. A primary row survives only when every secondary
/// has a sample within `tolerance` of it; surviving rows carry the
/// nearest secondary values, unmatched rows are dropped and counted.
pub fn nearest_merge(
    primary: &TimeSeries,
    secondaries: &[&TimeSeries],
    tolerance: Duration,
) -> Result<SyncFrame, Error> {
    if primary.is_empty() {
        return Err(Error::NoOverlap);
    }

    let mut epochs = Vec::<Epoch>::new();
    let mut survivors = Vec::<usize>::new();
    let mut dropped_rows = 0;

    // per-secondary nearest cursor, series are chronological
    let mut cursors = vec![0usize; secondaries.len()];
    let mut matched = vec![Vec::<usize>::new(); secondaries.len()];

    for (row, epoch) in primary.epochs.iter().enumerate() {
        let mut row_matches = Vec::<usize>::with_capacity(secondaries.len());
        let mut complete = true;

        for (s, secondary) in secondaries.iter().enumerate() {
            if secondary.is_empty() {
                complete = false;
                break;
            }

            let cursor = &mut cursors[s];
            while *cursor + 1 < secondary.epochs.len()
                && (secondary.epochs[*cursor + 1] - *epoch).abs()
                    <= (secondary.epochs[*cursor] - *epoch).abs()
            {
                *cursor += 1;
            }

            if (secondary.epochs[*cursor] - *epoch).abs() <= tolerance {
                row_matches.push(*cursor);
            } else {
                complete = false;
                break;
            }
        }

        if complete {
            epochs.push(*epoch);
            survivors.push(row);
            for (s, idx) in row_matches.into_iter().enumerate() {
                matched[s].push(idx);
            }
        } else {
            dropped_rows += 1;
        }
    }

    let mut channels = Vec::<(String, Vec<f64>)>::new();

    for (channel, values) in primary.channels.iter() {
        channels.push((
            format!("{}.{}", primary.name, channel),
            survivors.iter().map(|i| values[*i]).collect(),
        ));
    }

    for (s, secondary) in secondaries.iter().enumerate() {
        for (channel, values) in secondary.channels.iter() {
            channels.push((
                format!("{}.{}", secondary.name, channel),
                matched[s].iter().map(|i| values[*i]).collect(),
            ));
        }
    }

    debug!(
        "nearest merge: {}/{} rows kept ({} dropped, tolerance {})",
        epochs.len(),
        primary.len(),
        dropped_rows,
        tolerance
    );

    Ok(SyncFrame {
        epochs,
        channels,
        clamped_samples: 0,
        dropped_rows,
    })
}

#[cfg(test)]
mod test {
    use super::{common_window, interpolate, nearest_merge, TimeSeries};
    use crate::error::Error;
    use hifitime::{Epoch, Unit};

    fn epoch(sec: f64) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2025, 7, 16) + sec * Unit::Second
    }

    fn series(name: &str, samples: &[(f64, f64)]) -> TimeSeries {
        TimeSeries {
            name: name.to_string(),
            epochs: samples.iter().map(|(t, _)| epoch(*t)).collect(),
            channels: vec![(
                "x".to_string(),
                samples.iter().map(|(_, v)| *v).collect(),
            )],
        }
    }

    #[test]
    fn disjoint_series_do_not_overlap() {
        let a = series("a", &[(0.0, 1.0), (10.0, 2.0)]);
        let b = series("b", &[(20.0, 1.0), (30.0, 2.0)]);
        assert!(matches!(common_window(&[a, b]), Err(Error::NoOverlap)));
    }

    #[test]
    fn identical_grid_reproduces_values() {
        let a = series("a", &[(0.0, 1.0), (1.0, 2.0), (2.0, 4.0)]);
        let frame = interpolate(&[a], 3).unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.channel("a.x").unwrap(), &[1.0, 2.0, 4.0]);
        assert_eq!(frame.clamped_samples, 0);
    }

    #[test]
    fn linear_midpoints() {
        let a = series("a", &[(0.0, 0.0), (2.0, 2.0)]);
        let frame = interpolate(&[a], 5).unwrap();
        assert_eq!(frame.channel("a.x").unwrap(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn nearest_merge_tolerance() {
        let primary = series("gps", &[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        let secondary = series("ins", &[(0.05, 10.0), (2.4, 30.0)]);

        let frame = nearest_merge(&primary, &[&secondary], 0.5 * Unit::Second).unwrap();

        // t=0 matches 0.05, t=1 has nothing within 0.5 s, t=2 matches 2.4
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.dropped_rows, 1);
        assert_eq!(frame.channel("gps.x").unwrap(), &[1.0, 3.0]);
        assert_eq!(frame.channel("ins.x").unwrap(), &[10.0, 30.0]);
    }
}
