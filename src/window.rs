//! # Window parsing
//! Parses `duration` query values such as `5s`, `1m30s`, `1.5h` or `250ms`.
//!
//! Grammar: optional sign, then one or more `<decimal><unit>` terms with
//! units `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m`, `h`. A bare `0` is allowed.
//! Negative values are valid input and clamp to zero.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration \"{0}\"")]
    Invalid(String),
    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),
    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit { unit: String, input: String },
    #[error("duration \"{0}\" is out of range")]
    Overflow(String),
}

const UNITS: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000), // U+00B5
    ("μs", 1_000), // U+03BC
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse a window string into a non-negative [`Duration`].
pub fn parse_window(input: &str) -> Result<Duration, WindowParseError> {
    if input.is_empty() {
        return Err(WindowParseError::Empty);
    }
    let invalid = || WindowParseError::Invalid(input.to_string());

    let (negative, mut rest) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_ns: u128 = 0;
    while !rest.is_empty() {
        // <int>[.<frac>]
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);
        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let n = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(n)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = after_num
            .char_indices()
            .find(|&(_, c)| c == '.' || c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(after_num.len());
        let (unit, tail) = after_num.split_at(unit_len);
        if unit.is_empty() {
            return Err(WindowParseError::MissingUnit(input.to_string()));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|&(_, scale)| scale)
            .ok_or_else(|| WindowParseError::UnknownUnit {
                unit: unit.to_string(),
                input: input.to_string(),
            })?;

        let overflow = || WindowParseError::Overflow(input.to_string());
        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let term = whole
            .checked_mul(scale)
            .and_then(|ns| ns.checked_add(fraction_ns(frac_part, scale)))
            .ok_or_else(overflow)?;
        total_ns = total_ns.checked_add(term).ok_or_else(overflow)?;
        if total_ns > u64::MAX as u128 {
            return Err(overflow());
        }
        rest = tail;
    }

    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos(total_ns as u64))
}

/// `0.<frac>` of one unit, in nanoseconds (truncated).
fn fraction_ns(frac: &str, scale: u128) -> u128 {
    let mut num: u128 = 0;
    let mut den: u128 = 1;
    for b in frac.bytes() {
        // Digits past nanosecond precision cannot change the result.
        if den > 1_000_000_000_000_000_000 {
            break;
        }
        num = num * 10 + u128::from(b - b'0');
        den *= 10;
    }
    num * scale / den
}
