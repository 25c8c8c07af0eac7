use std::time::Duration;

use crate::error::{DurationError, DurationResult};

/// Parses a duration string such as `10s`, `1m30s`, `250ms` or `1d2h`.
///
/// Each component is a run of digits followed by one of `ms`, `s`, `m`, `h` or `d`.
/// A bare number is taken as seconds.
///
/// # Errors
///
/// * [`DurationError::ParseFailed`] on an empty input, a missing number, an unknown unit
///   or an overflow.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use aptdex_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(input: &str) -> DurationResult<Duration> {
    let failed = |reason: &str| {
        DurationError::ParseFailed {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(failed("empty input"));
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_ms: u64 = 0;
    let mut rest = trimmed;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(failed("missing number"));
        }
        let number: u64 = rest[..digits].parse().map_err(|_| failed("overflow"))?;
        rest = &rest[digits..];

        let (multiplier, unit_len) = if rest.starts_with("ms") {
            (1, 2)
        } else {
            match rest.chars().next() {
                Some('s') => (1_000, 1),
                Some('m') => (60_000, 1),
                Some('h') => (3_600_000, 1),
                Some('d') => (86_400_000, 1),
                Some(_) => return Err(failed("unknown unit")),
                None => return Err(failed("missing unit")),
            }
        };
        rest = &rest[unit_len..];

        total_ms = number
            .checked_mul(multiplier)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| failed("overflow"))?;
    }

    Ok(Duration::from_millis(total_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("750ms").unwrap(), Duration::from_millis(750));
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(
            parse_duration("1s500ms").unwrap(),
            Duration::from_millis(1_500)
        );
        assert_eq!(
            parse_duration("1d1h1m1s").unwrap(),
            Duration::from_secs(86_400 + 3_600 + 60 + 1)
        );
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("1m30").is_err());
        assert!(parse_duration("99999999999999999999999s").is_err());
    }
}
