use serde::Serialize;

use super::signal::{self, SignalError};

/// How a measured series is lined up and scored against a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct CompareOptions {
    /// Sentinel values treated as missing samples.
    pub invalid_values: Vec<f64>,
    /// Fixed shift; estimated from the cross-correlation when `None`.
    pub delay: Option<isize>,
    /// Largest absolute error still counted as accurate.
    pub accuracy_threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            invalid_values: Vec::new(),
            delay: None,
            accuracy_threshold: 0.5,
        }
    }
}

/// Agreement between a measured series and its reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesComparison {
    pub delay: isize,
    /// Aligned sample pairs where both sides are valid.
    pub samples: usize,
    pub correlation: f64,
    pub mean_error: f64,
    pub mean_abs_error: f64,
    pub mean_sq_error: f64,
    pub root_mean_sq_error: f64,
    pub accuracy: f64,
    pub accuracy_threshold: f64,
}

pub fn compare(
    meas: &[f64],
    reference: &[f64],
    options: &CompareOptions,
) -> Result<SeriesComparison, SignalError> {
    let invalid = &options.invalid_values;
    let delay = match options.delay {
        Some(d) => d,
        None => signal::estimate_delay(meas, reference, invalid)?,
    };
    let (m, r) = signal::align(meas, reference, invalid, Some(delay))?;
    let samples = m
        .iter()
        .zip(&r)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .count();

    let d = Some(delay);
    Ok(SeriesComparison {
        delay,
        samples,
        correlation: signal::correlation_coefficient(meas, reference, invalid, d)?,
        mean_error: signal::mean_error(meas, reference, invalid, d)?,
        mean_abs_error: signal::mean_abs_error(meas, reference, invalid, d)?,
        mean_sq_error: signal::mean_sq_error(meas, reference, invalid, d)?,
        root_mean_sq_error: signal::root_mean_sq_error(meas, reference, invalid, d)?,
        accuracy: signal::accuracy(meas, reference, options.accuracy_threshold, invalid, d)?,
        accuracy_threshold: options.accuracy_threshold,
    })
}

/// Statistics of one fixed-length section of a series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionSummary {
    /// Index of the first sample in the section.
    pub start: usize,
    pub average: f64,
    pub std_dev: f64,
    pub mode: f64,
}

pub fn summarize_sections(
    series: &[f64],
    window: usize,
    offset: usize,
    invalid_values: &[f64],
) -> Result<Vec<SectionSummary>, SignalError> {
    let marked = signal::mark_invalid(series, invalid_values);
    let averages = signal::section_average(&marked, window, offset)?;
    let std_devs = signal::section_std_dev(&marked, window, offset)?;
    let modes = signal::section_mode(&marked, window, offset)?;

    Ok(averages
        .into_iter()
        .zip(std_devs)
        .zip(modes)
        .enumerate()
        .map(|(i, ((average, std_dev), mode))| SectionSummary {
            start: offset + i * window,
            average,
            std_dev,
            mode,
        })
        .collect())
}
