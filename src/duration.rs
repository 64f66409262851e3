//! Human-readable duration strings such as `1h`, `1d 12h` or `1.5 weeks`.
//!
//! A string is one or more `<number><unit>` terms, optionally separated by
//! whitespace or commas; the terms are summed. A number without a unit is
//! milliseconds and must be the only term. Months are 30 days and years 365
//! days.

use chrono::TimeDelta;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FormatError;

/// Turns a policy string into a duration.
pub trait DurationParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<TimeDelta, FormatError>;
}

/// The default [`DurationParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanDuration;

impl DurationParser for HumanDuration {
    fn parse(&self, text: &str) -> Result<TimeDelta, FormatError> {
        parse_duration(text)
    }
}

static TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?|\.\d+)\s*([A-Za-zµμ]*)").unwrap());

const NANOS_PER_MILLI: f64 = 1e6;
const NANOS_PER_SECOND: f64 = 1e9;
const NANOS_PER_DAY: f64 = 86_400.0 * NANOS_PER_SECOND;

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit.to_lowercase().as_str() {
        "ns" | "nanosecond" | "nanoseconds" => 1.0,
        "us" | "µs" | "μs" | "microsecond" | "microseconds" => 1e3,
        "" | "ms" | "millisecond" | "milliseconds" => NANOS_PER_MILLI,
        "s" | "sec" | "secs" | "second" | "seconds" => NANOS_PER_SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0 * NANOS_PER_SECOND,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0 * NANOS_PER_SECOND,
        "d" | "day" | "days" => NANOS_PER_DAY,
        "w" | "wk" | "wks" | "week" | "weeks" => 7.0 * NANOS_PER_DAY,
        "mo" | "month" | "months" => 30.0 * NANOS_PER_DAY,
        "y" | "yr" | "yrs" | "year" | "years" => 365.0 * NANOS_PER_DAY,
        _ => return None,
    };
    Some(nanos)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn format_error(input: &str, reason: impl Into<String>) -> FormatError {
    FormatError::Duration {
        input: input.to_string(),
        reason: reason.into(),
    }
}

pub fn parse_duration(text: &str) -> Result<TimeDelta, FormatError> {
    let mut total = 0.0_f64;
    let mut cursor = 0;
    let mut terms = 0;
    let mut bare = false;

    for caps in TERM.captures_iter(text) {
        let whole = caps.get(0).ok_or_else(|| format_error(text, "no match"))?;
        if !text[cursor..whole.start()].chars().all(is_separator) {
            return Err(format_error(
                text,
                format!("unexpected '{}'", text[cursor..whole.start()].trim()),
            ));
        }
        cursor = whole.end();

        let number: f64 = caps[1]
            .parse()
            .map_err(|_| format_error(text, format!("bad number '{}'", &caps[1])))?;
        let unit = &caps[2];
        let scale =
            unit_nanos(unit).ok_or_else(|| format_error(text, format!("unknown unit '{unit}'")))?;
        total += number * scale;
        terms += 1;
        bare |= unit.is_empty();
    }

    if terms == 0 {
        return Err(format_error(text, "no duration found"));
    }
    if bare && terms > 1 {
        return Err(format_error(text, "a number without a unit must stand alone"));
    }
    if !text[cursor..].chars().all(is_separator) {
        return Err(format_error(
            text,
            format!("unexpected '{}'", text[cursor..].trim()),
        ));
    }
    if !total.is_finite() || total >= i64::MAX as f64 {
        return Err(format_error(text, "duration too large"));
    }

    Ok(TimeDelta::nanoseconds(total.round() as i64))
}
