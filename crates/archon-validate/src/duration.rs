//! Duration strings in the `300ms`, `1h30m`, `1.5s` form.

use crate::ThisError;
use std::time::Duration;

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

///
/// DurationError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("negative duration")]
    Negative,

    #[error("missing unit in duration")]
    MissingUnit,

    #[error("unknown unit {0:?} in duration")]
    UnknownUnit(String),

    #[error("invalid duration")]
    Invalid,

    #[error("duration out of range")]
    Overflow,
}

/// Parse a sequence of decimal numbers, each with a unit suffix. A bare
/// `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(DurationError::Empty);
    }
    if let Some(unsigned) = rest.strip_prefix('+') {
        rest = unsigned;
    } else if rest.starts_with('-') {
        return Err(DurationError::Negative);
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after_whole) = split_digits(rest);
        let (frac, after_frac) = match after_whole.strip_prefix('.') {
            Some(tail) => split_digits(tail),
            None => ("", after_whole),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(DurationError::Invalid);
        }

        let unit_len = after_frac
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_frac.len());
        let unit = &after_frac[..unit_len];
        if unit.is_empty() {
            return Err(DurationError::MissingUnit);
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        total = total
            .checked_add(component_nanos(whole, frac, scale)?)
            .ok_or(DurationError::Overflow)?;
        rest = &after_frac[unit_len..];
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| DurationError::Overflow)
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

// Fractional digits below one nanosecond are dropped.
fn component_nanos(whole: &str, frac: &str, scale: u128) -> Result<u128, DurationError> {
    let mut nanos: u128 = 0;
    for digit in whole.bytes() {
        nanos = nanos
            .checked_mul(10)
            .and_then(|n| n.checked_add(u128::from(digit - b'0')))
            .ok_or(DurationError::Overflow)?;
    }
    nanos = nanos.checked_mul(scale).ok_or(DurationError::Overflow)?;

    let mut place = scale;
    for digit in frac.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos += u128::from(digit - b'0') * place;
    }

    Ok(nanos)
}
