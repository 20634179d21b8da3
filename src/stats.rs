//! Angle and sampling statistics
use hifitime::Epoch;

use crate::attitude::heading_diff_deg;

/// Streaming mean/variance accumulator (Welford).
#[derive(Debug, Default, Clone)]
pub struct Averager {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Averager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new value. NaN values are ignored.
    pub fn add(&mut self, x: f64) {
        if x.is_nan() {
            return;
        }
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation.
    pub fn std(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Descriptive statistics of one angle channel [°].
#[derive(Debug, Clone, PartialEq)]
pub struct AngleStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub count: usize,
}

/// Statistics of a linear angle channel (pitch, roll, differences).
/// NaN samples (unresolved epochs) are skipped; returns None when
/// nothing remains.
pub fn angle_stats(values: &[f64]) -> Option<AngleStats> {
    let mut avg = Averager::new();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.iter().copied().filter(|v| !v.is_nan()) {
        avg.add(v);
        min = min.min(v);
        max = max.max(v);
    }

    if avg.count() == 0 {
        return None;
    }

    Some(AngleStats {
        mean: avg.mean(),
        std: avg.std(),
        min,
        max,
        range: max - min,
        count: avg.count() as usize,
    })
}

/// Circular mean of headings [°], in [0, 360).
pub fn circular_mean_deg(values: &[f64]) -> Option<f64> {
    let mut sum_sin = 0.0;
    let mut sum_cos = 0.0;
    let mut count = 0usize;

    for v in values.iter().copied().filter(|v| !v.is_nan()) {
        let rad = v.to_radians();
        sum_sin += rad.sin();
        sum_cos += rad.cos();
        count += 1;
    }

    if count == 0 {
        return None;
    }

    Some(sum_sin.atan2(sum_cos).to_degrees().rem_euclid(360.0))
}

/// Statistics of a heading channel: circular mean, dispersion from
/// wrapped residuals around it. min/max are the extreme wrapped
/// residuals re-anchored to the mean.
pub fn heading_stats(values: &[f64]) -> Option<AngleStats> {
    let mean = circular_mean_deg(values)?;

    let residuals: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .map(|v| heading_diff_deg(v, mean))
        .collect();

    let spread = angle_stats(&residuals)?;

    Some(AngleStats {
        mean,
        std: spread.std,
        min: mean + spread.min,
        max: mean + spread.max,
        range: spread.range,
        count: spread.count,
    })
}

/// Per-sample differences of a computed channel against a reference,
/// circular for headings, linear otherwise. Pairs with a NaN on
/// either side are skipped.
pub fn difference_stats(computed: &[f64], reference: &[f64], circular: bool) -> Option<AngleStats> {
    let diffs: Vec<f64> = computed
        .iter()
        .zip(reference.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| {
            if circular {
                heading_diff_deg(*a, *b)
            } else {
                a - b
            }
        })
        .collect();

    angle_stats(&diffs)
}

/// Sampling cadence of a chronological epoch axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingStats {
    /// Covered span [s]
    pub span_s: f64,
    /// Mean sampling interval [s]
    pub mean_interval_s: f64,
    /// Mean rate [Hz]
    pub rate_hz: f64,
    /// 1 - coefficient of variation of the intervals, clamped to
    /// [0, 1]: 1.0 is perfectly regular sampling.
    pub regularity: f64,
}

pub fn sampling_stats(epochs: &[Epoch]) -> Option<SamplingStats> {
    if epochs.len() < 2 {
        return None;
    }

    let mut avg = Averager::new();
    for pair in epochs.windows(2) {
        avg.add((pair[1] - pair[0]).to_seconds());
    }

    let mean_interval_s = avg.mean();
    if mean_interval_s <= 0.0 {
        return None;
    }

    Some(SamplingStats {
        span_s: (epochs[epochs.len() - 1] - epochs[0]).to_seconds(),
        mean_interval_s,
        rate_hz: 1.0 / mean_interval_s,
        regularity: (1.0 - avg.std() / mean_interval_s).clamp(0.0, 1.0),
    })
}
