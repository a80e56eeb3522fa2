use std::time::Duration;

use crate::domain::errors::DomainError;

/// Outcome of validating a requested mirror interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorInterval {
    /// Scheduled syncing disabled; the mirror only syncs on demand
    Manual,
    Every(Duration),
}

impl MirrorInterval {
    /// Resolve a user-supplied interval string against configured bounds.
    ///
    /// An empty string selects `default`; `"0"` (or any zero duration)
    /// disables scheduling.
    pub fn resolve(raw: &str, default: Duration, minimum: Duration) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::from_duration(default));
        }

        let parsed = parse_duration(raw)?;
        if parsed.is_zero() {
            return Ok(Self::Manual);
        }
        if parsed < minimum {
            return Err(DomainError::IntervalBelowMinimum {
                interval: parsed,
                minimum,
            });
        }
        Ok(Self::Every(parsed))
    }

    pub fn from_duration(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Manual
        } else {
            Self::Every(duration)
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Self::Manual => Duration::ZERO,
            Self::Every(d) => *d,
        }
    }
}

/// Parse a duration written as a sequence of `<number><unit>` groups, e.g.
/// `8h`, `1h30m`, `1.5h`, `500ms`. A bare `0` is accepted.
pub fn parse_duration(raw: &str) -> Result<Duration, DomainError> {
    let invalid = || DomainError::InvalidInterval(raw.to_string());

    if raw == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = raw;
    if rest.is_empty() {
        return Err(invalid());
    }

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_nanos += value * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
