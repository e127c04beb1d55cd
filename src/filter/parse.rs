//! Parsing of human-written size and duration filter values.
//!
//! Sizes use binary multipliers (`1K` = 1024 bytes) and durations accept
//! calendar-ish units up to years, so `--older-than 30d` and `--size +100M`
//! style inputs can be validated once, before any scanning begins.

use std::time::Duration;

use super::{FilterError, SizeDirection, SizeFilter};

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 60.0 * SECS_PER_MINUTE;
const SECS_PER_DAY: f64 = 24.0 * SECS_PER_HOUR;

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, K/KB, M/MB, G/GB, T/TB (powers of 1024).
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use nuke::filter::parse::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1K").unwrap(), 1024);
/// assert_eq!(parse_size("100M").unwrap(), 100 * 1024 * 1024);
/// assert_eq!(parse_size("1.5kb").unwrap(), 1536);
/// ```
///
/// # Errors
///
/// Returns [`FilterError::InvalidSize`] if the string is empty, contains an
/// invalid number, a negative number, an unknown size suffix, or a value
/// that does not fit in 64 bits.
pub fn parse_size(s: &str) -> Result<u64, FilterError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(FilterError::invalid_size(s, "size cannot be empty"));
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| FilterError::invalid_size(s, format!("invalid number '{num_str}'")))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1 << 10,
        "M" | "MB" => 1 << 20,
        "G" | "GB" => 1 << 30,
        "T" | "TB" => 1 << 40,
        _ => {
            return Err(FilterError::invalid_size(
                s,
                format!("unknown size suffix '{suffix}'"),
            ))
        }
    };

    let bytes = num * multiplier as f64;
    // u64::MAX rounds up to 2^64 in f64, so this rejects every overflow.
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(FilterError::invalid_size(s, "size too large"));
    }
    Ok(bytes as u64)
}

/// Parse a size filter such as `+100M` (strictly larger) or `-1G`
/// (strictly smaller). Without a sign the filter means "larger than".
///
/// ```
/// use nuke::filter::parse::parse_size_filter;
/// use nuke::filter::SizeDirection;
///
/// let filter = parse_size_filter("-1K").unwrap();
/// assert_eq!(filter.threshold, 1024);
/// assert_eq!(filter.direction, SizeDirection::Less);
/// ```
///
/// # Errors
///
/// Returns [`FilterError::InvalidSize`] for an empty or malformed value.
pub fn parse_size_filter(s: &str) -> Result<SizeFilter, FilterError> {
    let s = s.trim();
    let (direction, rest) = if let Some(rest) = s.strip_prefix('+') {
        (SizeDirection::Greater, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (SizeDirection::Less, rest)
    } else {
        (SizeDirection::Greater, s)
    };

    if rest.trim().is_empty() {
        return Err(FilterError::invalid_size(s, "size filter cannot be empty"));
    }

    Ok(SizeFilter::new(parse_size(rest)?, direction))
}

/// Parse a duration such as `30d`, `24h`, `2w`, `1.5h` or `1h30m`.
///
/// Units: `ms`, `s`, `m`/`min`, `h`/`hr`, `d`/`day`, `w`/`week`,
/// `mo`/`month` (30 days), `y`/`year` (365 days), plus their long plural
/// forms. Segments are summed.
///
/// ```
/// use nuke::filter::parse::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30d").unwrap(), Duration::from_secs(30 * 86_400));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5_400));
/// ```
///
/// # Errors
///
/// Returns [`FilterError::InvalidDuration`] for empty input, a missing or
/// unknown unit, or a value too large to represent.
pub fn parse_duration(s: &str) -> Result<Duration, FilterError> {
    let input = s.trim().to_lowercase();
    if input.is_empty() {
        return Err(FilterError::invalid_duration(s, "duration cannot be empty"));
    }

    let mut rest = input.as_str();
    let mut total_secs = 0.0_f64;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let num_str = &rest[..num_end];
        let num: f64 = num_str
            .parse()
            .map_err(|_| FilterError::invalid_duration(s, format!("invalid number '{num_str}'")))?;

        let after_num = rest[num_end..].trim_start();
        let unit_end = after_num
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after_num.len());
        let unit = &after_num[..unit_end];
        let unit_secs = unit_seconds(unit).ok_or_else(|| {
            if unit.is_empty() {
                FilterError::invalid_duration(s, "missing time unit")
            } else {
                FilterError::invalid_duration(s, format!("unknown time unit '{unit}'"))
            }
        })?;

        total_secs += num * unit_secs;
        rest = after_num[unit_end..].trim_start();
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|_| FilterError::invalid_duration(s, "duration out of range"))
}

fn unit_seconds(unit: &str) -> Option<f64> {
    let secs = match unit {
        "ms" | "msec" | "millisecond" | "milliseconds" => 0.001,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => SECS_PER_MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => SECS_PER_HOUR,
        "d" | "day" | "days" => SECS_PER_DAY,
        "w" | "week" | "weeks" => 7.0 * SECS_PER_DAY,
        "mo" | "month" | "months" => 30.0 * SECS_PER_DAY,
        "y" | "year" | "years" => 365.0 * SECS_PER_DAY,
        _ => return None,
    };
    Some(secs)
}
