//! Typed access to relay URL query parameters.
//!
//! Every parameter is optional. A missing or empty value yields the caller's
//! default; anything else must parse or resolution fails with
//! `ServeError::InvalidConfig`.

use std::borrow::Cow;
use std::time::Duration;
use url::Url;

use crate::error::ServeError;

pub const QUIET: &str = "quiet";
pub const TIMEOUT: &str = "timeout";
pub const GC: &str = "gc";
pub const RETRY: &str = "retry";
pub const PERSIST: &str = "persist";

/// Read-only view over a URL's query string.
pub struct QueryParams<'a> {
    url: &'a Url,
}

impl<'a> QueryParams<'a> {
    pub fn new(url: &'a Url) -> Self {
        Self { url }
    }

    /// First value of `name`, or `None` when absent or empty.
    fn get(&self, name: &str) -> Option<Cow<'a, str>> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    pub fn flag(&self, name: &'static str, default: bool) -> Result<bool, ServeError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => {
                parse_bool(&raw).ok_or_else(|| ServeError::invalid_config(name, &raw, "not a boolean"))
            }
        }
    }

    pub fn duration(&self, name: &'static str, default: Duration) -> Result<Duration, ServeError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => parse_duration(&raw).map_err(|reason| ServeError::invalid_config(name, &raw, reason)),
        }
    }

    pub fn count(&self, name: &'static str, default: u32) -> Result<u32, ServeError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| ServeError::invalid_config(name, &raw, e)),
        }
    }
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

// Largest duration Go can represent.
const MAX_NANOS: u128 = i64::MAX as u128;

/// Parses Go duration syntax: a sequence of decimal numbers with optional
/// fraction and a unit suffix, e.g. `300ms`, `1.5h`, `2h45m`. A lone `0` is
/// accepted without a unit. Negative durations are rejected.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let (negative, mut rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err("expected a number".to_string());
        }

        let unit_len = after_frac
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(after_frac.len());
        let (unit, tail) = after_frac.split_at(unit_len);
        if unit.is_empty() {
            return Err("missing unit".to_string());
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| format!("unknown unit {unit:?}"))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| "overflow".to_string())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(|| "overflow".to_string())?;

        // Digits past nanosecond precision cannot change the result.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let frac: u128 = frac_digits.parse().map_err(|_| "overflow".to_string())?;
            nanos += frac * scale / 10u128.pow(frac_digits.len() as u32);
        }

        total = total.checked_add(nanos).filter(|t| *t <= MAX_NANOS).ok_or_else(|| "overflow".to_string())?;
        rest = tail;
    }

    if negative && total > 0 {
        return Err("negative duration".to_string());
    }

    let secs = (total / 1_000_000_000) as u64;
    let subsec = (total % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}
