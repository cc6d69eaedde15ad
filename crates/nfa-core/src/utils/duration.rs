//! Parsing of compact duration strings such as `1h`, `90m` or `1h30m`.

use std::time::Duration;

use thiserror::Error;

/// Error returned by [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,
    #[error("missing unit in duration '{0}'")]
    MissingUnit(String),
    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { unit: String, input: String },
    #[error("invalid number in duration '{0}'")]
    InvalidNumber(String),
}

/// Parse a sequence of `<integer><unit>` pairs.
///
/// Supported units are `h`, `m`, `s` and `ms`. A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| DurationParseError::MissingUnit(trimmed.to_string()))?;
        if digits_end == 0 {
            return Err(DurationParseError::InvalidNumber(trimmed.to_string()));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(trimmed.to_string()))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let step = match unit {
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "s" => Duration::from_secs(value),
            "ms" => Duration::from_millis(value),
            other => {
                return Err(DurationParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: trimmed.to_string(),
                });
            }
        };
        total = total.saturating_add(step);
    }

    Ok(total)
}
