//! Duration parsing and rendering.
//!
//! Three encodings meet here:
//!
//! - **Configuration strings** accept the Go duration grammar: a sequence of
//!   decimal numbers with optional fractions and a unit suffix, such as
//!   `"300ms"`, `"1.5h"` or `"2h45m"`. Valid units are `ns`, `us` (or `µs`),
//!   `ms`, `s`, `m` and `h`.
//! - **State strings** use the canonical short form produced by [`short`]:
//!   `60s`, `1m0s` and `1m` all render as `"1m"`.
//! - **Wire strings** use the Prometheus duration format (`"1d2h"`, `"5m"`),
//!   handled by the [`prom_opt`] serde module.
//!
//! # Example
//!
//! ```
//! use oodle_provider::duration;
//! use std::time::Duration;
//!
//! let d = duration::parse("1m30s").unwrap();
//! assert_eq!(d, Duration::from_secs(90));
//! assert_eq!(duration::short(d), "1m30s");
//! assert_eq!(duration::short(duration::parse("60s").unwrap()), "1m");
//! ```

use std::fmt::Write as _;
use std::time::Duration;

use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

// Largest representable Go duration, in nanoseconds.
const MAX_NANOS: u128 = i64::MAX as u128;

/// Errors produced while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The input was empty.
    #[error("invalid duration \"\": empty string")]
    Empty,

    /// The input carried a leading minus sign.
    #[error("invalid duration {0:?}: negative durations are not allowed")]
    Negative(String),

    /// The input did not match the duration grammar.
    #[error("invalid duration {0:?}")]
    Invalid(String),

    /// A number was not followed by a unit.
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    /// A unit suffix was not recognized.
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unrecognized suffix.
        unit: String,
        /// The full input.
        input: String,
    },

    /// The value does not fit in a signed 64-bit nanosecond count.
    #[error("invalid duration {0:?}: overflow")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a duration using the Go duration grammar.
///
/// A bare `"0"` is accepted. Negative durations are rejected.
pub fn parse(input: &str) -> Result<Duration, DurationError> {
    let mut rest = input;
    if let Some(stripped) = rest.strip_prefix('-') {
        if stripped == "0" {
            return Ok(Duration::ZERO);
        }
        return Err(DurationError::Negative(input.to_string()));
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(if input.is_empty() {
            DurationError::Empty
        } else {
            DurationError::Invalid(input.to_string())
        });
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let first = rest.as_bytes()[0];
        if !(first == b'.' || first.is_ascii_digit()) {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, after_int) = rest.split_at(int_len);
        let mut whole: u128 = 0;
        for b in int_digits.bytes() {
            whole = whole * 10 + u128::from(b - b'0');
            if whole > MAX_NANOS {
                return Err(DurationError::Overflow(input.to_string()));
            }
        }
        rest = after_int;

        let mut frac_digits = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            let (digits, after_frac) = after_dot.split_at(frac_len);
            frac_digits = digits;
            rest = after_frac;
            if int_len == 0 && frac_len == 0 {
                return Err(DurationError::Invalid(input.to_string()));
            }
        }

        let unit_len = rest
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let (unit, after_unit) = rest.split_at(unit_len);
        rest = after_unit;
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let mut value = whole
            .checked_mul(scale)
            .filter(|v| *v <= MAX_NANOS)
            .ok_or_else(|| DurationError::Overflow(input.to_string()))?;

        // Fractional digits beyond nanosecond precision are truncated.
        let mut place = scale;
        for b in frac_digits.bytes() {
            if place < 10 {
                break;
            }
            place /= 10;
            value += u128::from(b - b'0') * place;
        }

        total += value;
        if total > MAX_NANOS {
            return Err(DurationError::Overflow(input.to_string()));
        }
    }

    Ok(nanos_to_duration(total))
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / NANOS_PER_SEC) as u64;
    let sub = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, sub)
}

/// Render `value / scale` with the fraction's trailing zeros trimmed.
fn fixed(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Render a duration the way Go's `Duration.String` does, e.g. `1h0m0s`.
pub fn format(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", fixed(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fixed(nanos, NANOS_PER_MILLI));
    }

    let total_secs = nanos / NANOS_PER_SEC;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if total_secs >= 60 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(
        out,
        "{}s",
        fixed(seconds * NANOS_PER_SEC + nanos % NANOS_PER_SEC, NANOS_PER_SEC)
    );
    out
}

/// Canonical short form used in state: [`format`] with redundant trailing
/// zero components dropped (`1m0s` → `1m`, `1h0m0s` → `1h`).
pub fn short(duration: Duration) -> String {
    let mut s = format(duration);
    if s.ends_with("m0s") {
        s.truncate(s.len() - 2);
    }
    if s.ends_with("h0m") {
        s.truncate(s.len() - 2);
    }
    s
}

const PROM_UNITS: [(&str, u128); 7] = [
    ("y", 365 * 24 * 3600 * 1000),
    ("w", 7 * 24 * 3600 * 1000),
    ("d", 24 * 3600 * 1000),
    ("h", 3600 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
    ("ms", 1),
];

/// Render a duration in Prometheus format (`"1w2d"`, `"90s"` → `"1m30s"`).
///
/// Precision is milliseconds; years and weeks are only used when they
/// divide the duration exactly.
pub fn format_prom(duration: Duration) -> String {
    let mut ms = duration.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    for (unit, mult) in PROM_UNITS {
        let exact_only = unit == "y" || unit == "w";
        if exact_only && ms % mult != 0 {
            continue;
        }
        let v = ms / mult;
        if v > 0 {
            let _ = write!(out, "{}{}", v, unit);
            ms -= v * mult;
        }
    }
    out
}

/// Parse a Prometheus duration string such as `"1h30m"` or `"500ms"`.
pub fn parse_prom(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() {
        return Err(DurationError::Empty);
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = input;
    let mut next_unit = 0;
    let mut total_ms: u128 = 0;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(DurationError::Invalid(input.to_string()));
        }
        let (number, after) = rest.split_at(digits);
        let letters = after.bytes().take_while(u8::is_ascii_alphabetic).count();
        if letters == 0 {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let (unit, after_unit) = after.split_at(letters);
        rest = after_unit;

        let position = PROM_UNITS
            .iter()
            .position(|(u, _)| *u == unit)
            .ok_or_else(|| DurationError::UnknownUnit {
                unit: unit.to_string(),
                input: input.to_string(),
            })?;
        // Units must appear at most once, largest first.
        if position < next_unit {
            return Err(DurationError::Invalid(input.to_string()));
        }
        next_unit = position + 1;

        let value: u128 = number
            .parse()
            .map_err(|_| DurationError::Overflow(input.to_string()))?;
        total_ms = value
            .checked_mul(PROM_UNITS[position].1)
            .and_then(|v| v.checked_add(total_ms))
            .filter(|v| {
                v.checked_mul(NANOS_PER_MILLI)
                    .is_some_and(|nanos| nanos <= MAX_NANOS)
            })
            .ok_or_else(|| DurationError::Overflow(input.to_string()))?;
    }

    Ok(nanos_to_duration(total_ms * NANOS_PER_MILLI))
}

/// Serde codec for optional durations encoded as Prometheus strings.
///
/// `None` must be paired with `skip_serializing_if = "Option::is_none"`.
/// A zero duration on the wire decodes as `None`, matching the backend's
/// omit-when-zero encoding.
pub mod prom_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `Some(d)` as a Prometheus duration string.
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&super::format_prom(*d)),
            None => s.serialize_none(),
        }
    }

    /// Deserialize a Prometheus duration string, treating zero as absent.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => {
                let parsed = super::parse_prom(s).map_err(serde::de::Error::custom)?;
                Ok(Some(parsed).filter(|d| !d.is_zero()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equivalent_forms() {
        let expected = Duration::from_secs(60);
        assert_eq!(parse("1m0s").unwrap(), expected);
        assert_eq!(parse("1m").unwrap(), expected);
        assert_eq!(parse("60s").unwrap(), expected);
        assert_eq!(parse("0.5m30s").unwrap(), expected);
    }

    #[test]
    fn test_parse_units_and_fractions() {
        assert_eq!(parse("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse("2h45m").unwrap(), Duration::from_secs(9900));
        assert_eq!(parse("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse("7ns").unwrap(), Duration::from_nanos(7));
        assert_eq!(parse(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse("+5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse(""), Err(DurationError::Empty));
        assert_eq!(parse("5"), Err(DurationError::MissingUnit("5".into())));
        assert!(matches!(parse("5d"), Err(DurationError::UnknownUnit { .. })));
        assert!(matches!(parse("-5s"), Err(DurationError::Negative(_))));
        assert!(matches!(parse("abc"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse(".s"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse("1m 30s"), Err(DurationError::UnknownUnit { .. })));
        assert!(matches!(
            parse("9999999999999h"),
            Err(DurationError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_matches_go() {
        assert_eq!(format(Duration::ZERO), "0s");
        assert_eq!(format(Duration::from_secs(60)), "1m0s");
        assert_eq!(format(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format(Duration::from_millis(500)), "500ms");
        assert_eq!(format(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format(Duration::from_nanos(1500)), "1.5µs");
        assert_eq!(format(Duration::from_nanos(42)), "42ns");
    }

    #[test]
    fn test_short_form() {
        assert_eq!(short(Duration::from_secs(60)), "1m");
        assert_eq!(short(Duration::from_secs(3600)), "1h");
        assert_eq!(short(Duration::from_secs(5400)), "1h30m");
        assert_eq!(short(Duration::from_secs(90)), "1m30s");
        assert_eq!(short(Duration::from_secs(3601)), "1h0m1s");
        assert_eq!(short(Duration::from_secs(30)), "30s");
        assert_eq!(short(parse("1m0s").unwrap()), "1m");
    }

    #[test]
    fn test_prom_format() {
        assert_eq!(format_prom(Duration::ZERO), "0s");
        assert_eq!(format_prom(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_prom(Duration::from_secs(3600)), "1h");
        assert_eq!(format_prom(Duration::from_secs(25 * 3600)), "1d1h");
        assert_eq!(format_prom(Duration::from_secs(14 * 24 * 3600)), "2w");
        assert_eq!(format_prom(Duration::from_secs(8 * 24 * 3600)), "8d");
        assert_eq!(format_prom(Duration::from_millis(1500)), "1s500ms");
    }

    #[test]
    fn test_prom_parse() {
        assert_eq!(parse_prom("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_prom("1d1h").unwrap(), Duration::from_secs(25 * 3600));
        assert_eq!(parse_prom("1s500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_prom("0").unwrap(), Duration::ZERO);
        assert!(parse_prom("").is_err());
        assert!(parse_prom("1s1m").is_err());
        assert!(parse_prom("1.5s").is_err());
        assert!(parse_prom("5x").is_err());
    }

    #[test]
    fn test_prom_opt_codec() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Holder {
            #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
            wait: Option<Duration>,
        }

        let json = serde_json::to_value(Holder {
            wait: Some(Duration::from_secs(300)),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"wait": "5m"}));

        let json = serde_json::to_value(Holder { wait: None }).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let back: Holder = serde_json::from_value(serde_json::json!({"wait": "0s"})).unwrap();
        assert_eq!(back, Holder { wait: None });

        let back: Holder = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(back, Holder { wait: None });
    }
}
