use std::{str::FromStr, time::Duration};

/// A duration written on the command line as a whole number followed by a
/// unit, e.g. `500ms`, `30s`, `2m`, `2h`, or `1d`. A bare `0` is accepted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(Duration);

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidDuration {
    #[error("{0:?} does not start with a number")]
    NoValue(String),

    #[error("{0:?} has no unit (expected one of 'ms', 's', 'm', 'h', or 'd')")]
    NoUnit(String),

    #[error("{0:?} has an unknown unit (expected one of 'ms', 's', 'm', 'h', or 'd')")]
    UnknownUnit(String),

    #[error("{0:?} is too large")]
    Overflow(String),
}

/// Milliseconds per unit.
const UNITS: [(&str, u64); 5] = [
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
];

// === impl HumanDuration ===

impl HumanDuration {
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn get(self) -> Duration {
        self.0
    }
}

impl From<HumanDuration> for Duration {
    fn from(HumanDuration(duration): HumanDuration) -> Self {
        duration
    }
}

impl FromStr for HumanDuration {
    type Err = InvalidDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (value, unit) = s.split_at(split);
        let value = value
            .parse::<u64>()
            .map_err(|_| InvalidDuration::NoValue(s.to_string()))?;

        let millis_per_unit = match unit {
            "" if value == 0 => return Ok(Self::default()),
            "" => return Err(InvalidDuration::NoUnit(s.to_string())),
            unit => UNITS
                .iter()
                .find_map(|&(name, millis)| (name == unit).then_some(millis))
                .ok_or_else(|| InvalidDuration::UnknownUnit(s.to_string()))?,
        };

        value
            .checked_mul(millis_per_unit)
            .map(|ms| Self(Duration::from_millis(ms)))
            .ok_or_else(|| InvalidDuration::Overflow(s.to_string()))
    }
}
