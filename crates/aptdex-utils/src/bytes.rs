use crate::error::{BytesError, BytesResult};

const BINARY_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Formats a byte count using binary units (B, KiB, MiB, ...).
///
/// # Example
///
/// ```
/// use aptdex_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(3 * 1024 * 1024, 1), "3.0 MiB");
/// assert_eq!(format_bytes(512, 0), "512 B");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < BINARY_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.precision$} {}", BINARY_UNITS[unit])
}

/// Parses a human-readable size such as `"256 MiB"`, `"64KiB"` or `"10MB"`.
///
/// Bare numbers are taken as bytes. `KiB`/`MiB`/... are powers of 1024, `KB`/`MB`/...
/// are powers of 1000. Suffixes are case-insensitive.
///
/// # Errors
///
/// * [`BytesError::ParseFailed`] if the number or the suffix is not recognized.
///
/// # Example
///
/// ```
/// use aptdex_utils::bytes::parse_bytes;
///
/// assert_eq!(parse_bytes("16 MiB").unwrap(), 16 * 1024 * 1024);
/// assert_eq!(parse_bytes("2KB").unwrap(), 2000);
/// ```
pub fn parse_bytes(input: &str) -> BytesResult<u64> {
    let trimmed = input.trim();
    let failed = |reason: &str| {
        BytesError::ParseFailed {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    };

    if let Ok(value) = trimmed.parse::<u64>() {
        return Ok(value);
    }

    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| failed("Unrecognized size format"))?;
    let (number, suffix) = trimmed.split_at(split_at);
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| failed("Invalid number"))?;

    let suffix = suffix.trim().to_ascii_uppercase();
    let (prefix, base) = if let Some(prefix) = suffix.strip_suffix("IB") {
        (prefix, 1024_f64)
    } else if let Some(prefix) = suffix.strip_suffix('B') {
        (prefix, 1000_f64)
    } else {
        return Err(failed("Invalid suffix"));
    };

    let exponent = match prefix {
        "" => 0,
        "K" => 1,
        "M" => 2,
        "G" => 3,
        "T" => 4,
        "P" => 5,
        "E" => 6,
        _ => return Err(failed("Invalid suffix")),
    };

    Ok((number * base.powi(exponent)).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 0), "0 B");
        assert_eq!(format_bytes(1023, 0), "1023 B");
        assert_eq!(format_bytes(1024, 2), "1.00 KiB");
        assert_eq!(format_bytes(1536, 1), "1.5 KiB");
        assert_eq!(format_bytes(256 * 1024 * 1024, 0), "256 MiB");
    }

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_bytes("0").unwrap(), 0);
        assert_eq!(parse_bytes(" 4096 ").unwrap(), 4096);
    }

    #[test]
    fn test_parse_binary_units() {
        assert_eq!(parse_bytes("64KiB").unwrap(), 64 * 1024);
        assert_eq!(parse_bytes("256 MiB").unwrap(), 256 * 1024 * 1024);
        assert_eq!(parse_bytes("1.5 gib").unwrap(), 1_610_612_736);
    }

    #[test]
    fn test_parse_decimal_units() {
        assert_eq!(parse_bytes("2KB").unwrap(), 2_000);
        assert_eq!(parse_bytes("10 mb").unwrap(), 10_000_000);
        assert_eq!(parse_bytes("7B").unwrap(), 7);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_bytes("").is_err());
        assert!(parse_bytes("MiB").is_err());
        assert!(parse_bytes("12 parsecs").is_err());
        assert!(parse_bytes("3 XiB").is_err());
    }
}
