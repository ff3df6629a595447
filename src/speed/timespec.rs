//! Time expressions used in speed configs.
//!
//! Accepted forms are `HH:MM:SS`, `MM:SS` and `SS`. Only the last field may
//! carry a decimal part. Ranges are written as `<start> - <end>`.

use super::error::{SpeedError, SpeedResult};

const RANGE_SEPARATOR: char = '-';

/// Parse a time expression into seconds.
pub fn parse_timespec(input: &str) -> SpeedResult<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SpeedError::time_format(input, "empty time value"));
    }

    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() > 3 {
        return Err(SpeedError::time_format(
            input,
            format!("expected at most 3 fields, found {}", fields.len()),
        ));
    }

    let (leading, last) = fields.split_at(fields.len() - 1);
    let mut seconds = 0.0;
    for field in leading {
        seconds = seconds * 60.0 + parse_whole_field(input, field)?;
    }
    seconds = seconds * 60.0 + parse_seconds_field(input, last[0])?;

    if !seconds.is_finite() {
        return Err(SpeedError::time_format(input, "value is out of range"));
    }
    Ok(seconds)
}

/// Parse `"<start> - <end>"` into a pair of second offsets.
pub fn parse_timestamp_range(input: &str) -> SpeedResult<(f64, f64)> {
    let separators = input.matches(RANGE_SEPARATOR).count();
    if separators != 1 {
        return Err(SpeedError::InvalidRangeFormat {
            input: input.to_string(),
        });
    }

    let Some((start, end)) = input.split_once(RANGE_SEPARATOR) else {
        return Err(SpeedError::InvalidRangeFormat {
            input: input.to_string(),
        });
    };
    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(SpeedError::InvalidRangeFormat {
            input: input.to_string(),
        });
    }

    Ok((parse_timespec(start)?, parse_timespec(end)?))
}

/// Canonical `HH:MM:SS.mmm` rendering, rounded to the millisecond.
pub fn format_timespec(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

fn parse_whole_field(input: &str, field: &str) -> SpeedResult<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Err(SpeedError::time_format(input, "empty field"));
    }
    if !field.chars().all(|c| c.is_ascii_digit()) {
        return Err(SpeedError::time_format(
            input,
            format!("'{field}' is not a non-negative whole number"),
        ));
    }
    field
        .parse::<f64>()
        .map_err(|e| SpeedError::time_format(input, e.to_string()))
}

fn parse_seconds_field(input: &str, field: &str) -> SpeedResult<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Err(SpeedError::time_format(input, "empty field"));
    }

    let mut dots = 0;
    let mut digits = 0;
    for c in field.chars() {
        match c {
            '.' => dots += 1,
            c if c.is_ascii_digit() => digits += 1,
            _ => {
                return Err(SpeedError::time_format(
                    input,
                    format!("'{field}' is not a non-negative number"),
                ));
            }
        }
    }
    if dots > 1 || digits == 0 {
        return Err(SpeedError::time_format(
            input,
            format!("'{field}' is not a valid number of seconds"),
        ));
    }

    field
        .parse::<f64>()
        .map_err(|e| SpeedError::time_format(input, e.to_string()))
}
