//! Helper utilities and common functions
//!
//! Durations are exchanged in Go's `time.Duration` notation (`300ms`, `1.5s`,
//! `1m30s`): the query service reports metrics that way, the historical
//! reports were written that way, and the CLI accepts it.

use crate::common::error::{BenchError, BenchResult};
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Parse a Go-style duration string such as `30s`, `1.5ms` or `1h2m3s`
pub fn parse_duration(input: &str) -> BenchResult<Duration> {
    let invalid = |why: &str| BenchError::InvalidArgument(format!("invalid duration '{}': {}", input, why));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest.is_empty() {
        return Err(invalid("expected a number"));
    }
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        if number.is_empty() {
            return Err(invalid("expected a number"));
        }
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid(&format!("unknown unit '{}'", unit)))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }
        let whole_value: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };

        let mut fraction_value: u128 = 0;
        let mut denominator: u128 = 1;
        // Digits past nanosecond precision of the largest unit cannot matter.
        for c in fraction.chars().take(18) {
            let digit = c.to_digit(10).ok_or_else(|| invalid("malformed fraction"))?;
            fraction_value = fraction_value * 10 + u128::from(digit);
            denominator *= 10;
        }

        total = whole_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(fraction_value * scale / denominator))
            .and_then(|v| v.checked_add(total))
            .ok_or_else(|| invalid("overflow"))?;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid("overflow"))?;
    Ok(Duration::from_nanos(nanos))
}

fn format_fraction(value: u128, unit: u128, suffix: &str) -> String {
    let whole = value / unit;
    let remainder = value % unit;
    if remainder == 0 {
        return format!("{}{}", whole, suffix);
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{:0width$}", remainder, width = width);
    format!("{}.{}{}", whole, digits.trim_end_matches('0'), suffix)
}

/// Format a duration the way Go's `Duration.String()` does
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format_fraction(nanos, NANOS_PER_MICRO, "µs");
    }
    if nanos < NANOS_PER_SEC {
        return format_fraction(nanos, NANOS_PER_MILLI, "ms");
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let seconds = format_fraction(nanos % NANOS_PER_MIN, NANOS_PER_SEC, "s");

    if hours > 0 {
        format!("{}h{}m{}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}", minutes, seconds)
    } else {
        seconds
    }
}

/// Duration expressed as fractional milliseconds
pub fn duration_millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / NANOS_PER_MILLI as f64
}

/// Argument parser for clap flags that take a duration
pub fn parse_duration_arg(input: &str) -> Result<Duration, String> {
    parse_duration(input).map_err(|e| e.to_string())
}
