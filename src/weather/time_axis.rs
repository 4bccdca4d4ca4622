use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::weather::provider::Variable;

#[derive(Debug, Error, PartialEq)]
pub enum TimeAxisError {
    #[error("interval must be positive, got {interval}s")]
    NonPositiveInterval { interval: i64 },
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart { start: i64, end: i64 },
    #[error("time span of {span}s is not a whole number of {interval}s intervals")]
    UnevenSpan { span: i64, interval: i64 },
    #[error("hourly timestamps are not evenly spaced")]
    IrregularSpacing,
    #[error("timestamp {seconds} is out of range")]
    OutOfRange { seconds: i64 },
    #[error("{variable} has {values} values but the time axis has {steps} steps")]
    LengthMismatch {
        variable: Variable,
        values: usize,
        steps: usize,
    },
}

/// Number of samples between `start` (inclusive) and `end` (exclusive).
pub fn step_count(start: i64, end: i64, interval: i64) -> Result<usize, TimeAxisError> {
    if interval <= 0 {
        return Err(TimeAxisError::NonPositiveInterval { interval });
    }
    if end < start {
        return Err(TimeAxisError::EndBeforeStart { start, end });
    }
    let span = end - start;
    if span % interval != 0 {
        return Err(TimeAxisError::UnevenSpan { span, interval });
    }
    Ok((span / interval) as usize)
}

/// Reconstructs the timestamp of every sample in an hourly block.
///
/// Sample `i` is at `start + i * interval + utc_offset_seconds` seconds since
/// the epoch. The offset shifts the instants so that they read as local wall
/// clock time when rendered as UTC, which is what the browser expects.
pub fn time_axis(
    start: i64,
    end: i64,
    interval: i64,
    utc_offset_seconds: i32,
) -> Result<Vec<DateTime<Utc>>, TimeAxisError> {
    let steps = step_count(start, end, interval)?;
    (0..steps as i64)
        .map(|i| {
            let seconds = start + i * interval + i64::from(utc_offset_seconds);
            DateTime::<Utc>::from_timestamp(seconds, 0)
                .ok_or(TimeAxisError::OutOfRange { seconds })
        })
        .collect()
}

/// Values are zipped with the time axis by index, so both must be equally long.
pub fn check_series_length(
    variable: Variable,
    values: usize,
    steps: usize,
) -> Result<(), TimeAxisError> {
    if values != steps {
        return Err(TimeAxisError::LengthMismatch {
            variable,
            values,
            steps,
        });
    }
    Ok(())
}

/// Derives `(start, end, interval)` from an explicit column of unix timestamps.
///
/// With fewer than two samples the spacing cannot be observed and
/// `default_interval` is used.
pub fn span_of_column(
    times: &[i64],
    default_interval: i64,
) -> Result<(i64, i64, i64), TimeAxisError> {
    let Some(&start) = times.first() else {
        return Ok((0, 0, default_interval));
    };
    let interval = match times {
        [first, second, ..] => second - first,
        _ => default_interval,
    };
    if interval <= 0 {
        return Err(TimeAxisError::NonPositiveInterval { interval });
    }
    if times.windows(2).any(|pair| pair[1] - pair[0] != interval) {
        return Err(TimeAxisError::IrregularSpacing);
    }
    let end = start + times.len() as i64 * interval;
    Ok((start, end, interval))
}
