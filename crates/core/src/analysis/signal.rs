//! Per-frame signal statistics and comparison against a reference signal.
//!
//! Missing samples are `NaN` throughout. Values listed as invalid (sensor
//! sentinels such as `-1`) are turned into `NaN` before any statistic.

use ndarray::{Array2, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SignalError {
    #[error("section window must be at least 1")]
    ZeroWindow,
    #[error("signal has no valid samples")]
    Empty,
    #[error("measurement and reference share no valid samples")]
    NoOverlap,
}

/// Mean of each `window`-long section after skipping `offset` samples.
///
/// The last section is padded with `NaN`; sections without any valid sample
/// average to `NaN`.
pub fn section_average(signal: &[f64], window: usize, offset: usize) -> Result<Vec<f64>, SignalError> {
    Ok(sections(signal, window, offset)?
        .rows()
        .into_iter()
        .map(|row| nan_mean(row.iter().copied()))
        .collect())
}

/// Population standard deviation of each section.
pub fn section_std_dev(signal: &[f64], window: usize, offset: usize) -> Result<Vec<f64>, SignalError> {
    Ok(sections(signal, window, offset)?
        .rows()
        .into_iter()
        .map(nan_std_dev)
        .collect())
}

/// Most frequent value of each section; the smallest one on ties.
pub fn section_mode(signal: &[f64], window: usize, offset: usize) -> Result<Vec<f64>, SignalError> {
    Ok(sections(signal, window, offset)?
        .rows()
        .into_iter()
        .map(nan_mode)
        .collect())
}

fn sections(signal: &[f64], window: usize, offset: usize) -> Result<Array2<f64>, SignalError> {
    if window == 0 {
        return Err(SignalError::ZeroWindow);
    }
    let body = signal.get(offset..).unwrap_or(&[]);
    let rows = body.len().div_ceil(window);
    Ok(Array2::from_shape_fn((rows, window), |(r, c)| {
        body.get(r * window + c).copied().unwrap_or(f64::NAN)
    }))
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn nan_std_dev(row: ArrayView1<'_, f64>) -> f64 {
    let mean = nan_mean(row.iter().copied());
    nan_mean(row.iter().map(|v| (v - mean).powi(2))).sqrt()
}

fn nan_mode(row: ArrayView1<'_, f64>) -> f64 {
    let mut values: Vec<f64> = row.iter().copied().filter(|v| !v.is_nan()).collect();
    values.sort_by(f64::total_cmp);

    let mut best = (f64::NAN, 0usize);
    let mut i = 0;
    while i < values.len() {
        let run = values[i..].iter().take_while(|&&v| v == values[i]).count();
        if run > best.1 {
            best = (values[i], run);
        }
        i += run;
    }
    best.0
}

/// Replaces every invalid value with `NaN`, keeping the length.
pub fn mark_invalid(signal: &[f64], invalid: &[f64]) -> Vec<f64> {
    signal
        .iter()
        .map(|&v| if invalid.contains(&v) { f64::NAN } else { v })
        .collect()
}

/// Fills invalid and missing samples.
///
/// Gaps between valid samples are interpolated linearly, leading gaps take
/// the first valid value and trailing gaps are cut off, so the result may be
/// shorter than the input. A signal with no valid sample yields an empty one.
pub fn interpolate_invalid(signal: &[f64], invalid: &[f64]) -> Vec<f64> {
    let marked = mark_invalid(signal, invalid);
    let valid: Vec<usize> = (0..marked.len()).filter(|&i| !marked[i].is_nan()).collect();
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        return Vec::new();
    };

    let mut out = marked[..=last].to_vec();
    for v in &mut out[..first] {
        *v = marked[first];
    }
    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let step = (marked[b] - marked[a]) / (b - a) as f64;
        for (k, v) in out[a + 1..b].iter_mut().enumerate() {
            *v = marked[a] + step * (k + 1) as f64;
        }
    }
    out
}

/// Full cross-correlation of the mean-removed, interpolated signals.
///
/// Entry `i` holds `Σ meas[n + k] * reference[n]` for lag
/// `k = i - (reference.len() - 1)`.
pub fn cross_correlation(meas: &[f64], reference: &[f64], invalid: &[f64]) -> Result<Vec<f64>, SignalError> {
    let a = demeaned(&interpolate_invalid(meas, invalid))?;
    let v = demeaned(&interpolate_invalid(reference, invalid))?;
    let (n, m) = (a.len() as isize, v.len() as isize);

    Ok((0..n + m - 1)
        .map(|i| {
            let k = i - (m - 1);
            (0..m)
                .filter(|&j| (0..n).contains(&(j + k)))
                .map(|j| a[(j + k) as usize] * v[j as usize])
                .sum::<f64>()
        })
        .collect())
}

fn demeaned(signal: &[f64]) -> Result<Vec<f64>, SignalError> {
    if signal.is_empty() {
        return Err(SignalError::Empty);
    }
    let mean = nan_mean(signal.iter().copied());
    Ok(signal.iter().map(|v| v - mean).collect())
}

/// Shift that best lines `meas` up with `reference`.
///
/// Negative when the measurement lags the reference: dropping that many
/// leading measurement samples aligns the two.
pub fn estimate_delay(meas: &[f64], reference: &[f64], invalid: &[f64]) -> Result<isize, SignalError> {
    let corr = cross_correlation(meas, reference, invalid)?;
    let peak = corr
        .iter()
        .enumerate()
        .fold(0, |best, (i, &c)| if c > corr[best] { i } else { best });
    let ref_len = interpolate_invalid(reference, invalid).len() as isize;
    Ok(ref_len - 1 - peak as isize)
}

/// Shifts `meas` by `delay` (estimated when `None`) and pads both signals
/// with `NaN` to a common length. Invalid values become `NaN`.
pub fn align(
    meas: &[f64],
    reference: &[f64],
    invalid: &[f64],
    delay: Option<isize>,
) -> Result<(Vec<f64>, Vec<f64>), SignalError> {
    let delay = match delay {
        Some(d) => d,
        None => estimate_delay(meas, reference, invalid)?,
    };

    let marked = mark_invalid(meas, invalid);
    let mut shifted = if delay >= 0 {
        let mut padded = vec![f64::NAN; delay as usize];
        padded.extend_from_slice(&marked);
        padded
    } else {
        marked.get(delay.unsigned_abs()..).unwrap_or(&[]).to_vec()
    };
    let mut reference = mark_invalid(reference, invalid);

    let len = shifted.len().max(reference.len());
    shifted.resize(len, f64::NAN);
    reference.resize(len, f64::NAN);
    Ok((shifted, reference))
}

/// Aligned sample pairs where both sides are valid.
fn paired(
    meas: &[f64],
    reference: &[f64],
    invalid: &[f64],
    delay: Option<isize>,
) -> Result<Vec<(f64, f64)>, SignalError> {
    let (m, r) = align(meas, reference, invalid, delay)?;
    let pairs: Vec<(f64, f64)> = m
        .into_iter()
        .zip(r)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .collect();
    if pairs.is_empty() {
        return Err(SignalError::NoOverlap);
    }
    Ok(pairs)
}

/// Pearson correlation of the aligned signals; `NaN` when either is constant.
pub fn correlation_coefficient(
    meas: &[f64],
    reference: &[f64],
    invalid: &[f64],
    delay: Option<isize>,
) -> Result<f64, SignalError> {
    let pairs = paired(meas, reference, invalid, delay)?;
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        cov += (a - mean_a) * (b - mean_b);
        var_a += (a - mean_a).powi(2);
        var_b += (b - mean_b).powi(2);
    }
    Ok(cov / (var_a * var_b).sqrt())
}

fn mean_of_errors(
    meas: &[f64],
    reference: &[f64],
    invalid: &[f64],
    delay: Option<isize>,
    f: impl Fn(f64) -> f64,
) -> Result<f64, SignalError> {
    let pairs = paired(meas, reference, invalid, delay)?;
    Ok(pairs.iter().map(|(a, b)| f(a - b)).sum::<f64>() / pairs.len() as f64)
}

/// Mean of `meas - reference` (bias).
pub fn mean_error(meas: &[f64], reference: &[f64], invalid: &[f64], delay: Option<isize>) -> Result<f64, SignalError> {
    mean_of_errors(meas, reference, invalid, delay, |e| e)
}

pub fn mean_abs_error(meas: &[f64], reference: &[f64], invalid: &[f64], delay: Option<isize>) -> Result<f64, SignalError> {
    mean_of_errors(meas, reference, invalid, delay, f64::abs)
}

pub fn mean_sq_error(meas: &[f64], reference: &[f64], invalid: &[f64], delay: Option<isize>) -> Result<f64, SignalError> {
    mean_of_errors(meas, reference, invalid, delay, |e| e * e)
}

pub fn root_mean_sq_error(
    meas: &[f64],
    reference: &[f64],
    invalid: &[f64],
    delay: Option<isize>,
) -> Result<f64, SignalError> {
    Ok(mean_sq_error(meas, reference, invalid, delay)?.sqrt())
}

/// Share of aligned samples whose absolute error is at most `threshold`.
pub fn accuracy(
    meas: &[f64],
    reference: &[f64],
    threshold: f64,
    invalid: &[f64],
    delay: Option<isize>,
) -> Result<f64, SignalError> {
    mean_of_errors(meas, reference, invalid, delay, |e| {
        if e.abs() <= threshold {
            1.0
        } else {
            0.0
        }
    })
}
