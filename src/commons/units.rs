//! Time and byte quantities as written in compose files

use crate::error::{ComposeError, Result};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Time unit suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ns" => Some(TimeUnit::Nanoseconds),
            "us" => Some(TimeUnit::Microseconds),
            "ms" => Some(TimeUnit::Milliseconds),
            "s" => Some(TimeUnit::Seconds),
            "m" => Some(TimeUnit::Minutes),
            "h" => Some(TimeUnit::Hours),
            _ => None,
        }
    }

    fn nanos(self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60_000_000_000,
            TimeUnit::Hours => 3_600_000_000_000,
        }
    }
}

/// A duration such as `30s` or `500ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    /// Amount
    pub value: u64,
    /// Unit
    pub unit: TimeUnit,
}

impl Delay {
    /// Create a new delay
    pub fn new(value: u64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }
}

fn delay_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)(ns|us|ms|h|m|s)").expect("valid delay regex"))
}

impl FromStr for Delay {
    type Err = ComposeError;

    /// Parse a duration. Compound values like `1m30s` are folded into their
    /// smallest unit (`90s`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || ComposeError::InvalidArgument(format!("invalid duration '{}'", s));

        let mut consumed = 0;
        let mut total: u64 = 0;
        let mut smallest: Option<TimeUnit> = None;
        for caps in delay_regex().captures_iter(s) {
            let whole = caps.get(0).ok_or_else(invalid)?;
            if whole.start() != consumed {
                return Err(invalid());
            }
            consumed = whole.end();

            let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
            let unit = TimeUnit::from_suffix(&caps[2]).ok_or_else(invalid)?;
            total = amount
                .checked_mul(unit.nanos())
                .and_then(|n| total.checked_add(n))
                .ok_or_else(invalid)?;
            smallest = Some(smallest.map_or(unit, |current| current.min(unit)));
        }

        match smallest {
            Some(unit) if consumed == s.len() => Ok(Delay::new(total / unit.nanos(), unit)),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Delay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Byte size unit suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl ByteUnit {
    fn suffix(self) -> &'static str {
        match self {
            ByteUnit::Bytes => "b",
            ByteUnit::Kilobytes => "kb",
            ByteUnit::Megabytes => "mb",
            ByteUnit::Gigabytes => "gb",
        }
    }
}

/// A byte size such as `64mb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteValue {
    /// Amount
    pub value: u64,
    /// Unit
    pub unit: ByteUnit,
}

impl ByteValue {
    /// Create a new byte value
    pub fn new(value: u64, unit: ByteUnit) -> Self {
        Self { value, unit }
    }
}

impl FromStr for ByteValue {
    type Err = ComposeError;

    /// Parse `1024`, `512k`, `64mb`, `2G`. Suffixes are case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(lower.len());
        let (digits, suffix) = lower.split_at(split);

        let value: u64 = digits
            .parse()
            .map_err(|_| ComposeError::InvalidArgument(format!("invalid byte value '{}'", s)))?;
        let unit = match suffix {
            "" | "b" => ByteUnit::Bytes,
            "k" | "kb" => ByteUnit::Kilobytes,
            "m" | "mb" => ByteUnit::Megabytes,
            "g" | "gb" => ByteUnit::Gigabytes,
            _ => {
                return Err(ComposeError::InvalidArgument(format!(
                    "invalid byte unit in '{}'",
                    s
                )))
            }
        };

        Ok(ByteValue::new(value, unit))
    }
}

impl std::fmt::Display for ByteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_delay() {
        let delay: Delay = "30s".parse().unwrap();
        assert_eq!(delay, Delay::new(30, TimeUnit::Seconds));
        assert_eq!(delay.to_string(), "30s");

        let delay: Delay = "500ms".parse().unwrap();
        assert_eq!(delay, Delay::new(500, TimeUnit::Milliseconds));
    }

    #[test]
    fn test_parse_compound_delay() {
        let delay: Delay = "1m30s".parse().unwrap();
        assert_eq!(delay, Delay::new(90, TimeUnit::Seconds));

        let delay: Delay = "1h5m".parse().unwrap();
        assert_eq!(delay, Delay::new(65, TimeUnit::Minutes));
    }

    #[test]
    fn test_parse_invalid_delay() {
        assert!("".parse::<Delay>().is_err());
        assert!("10".parse::<Delay>().is_err());
        assert!("1.5s".parse::<Delay>().is_err());
        assert!("10s later".parse::<Delay>().is_err());
    }

    #[test]
    fn test_parse_byte_value() {
        assert_eq!(
            "64m".parse::<ByteValue>().unwrap(),
            ByteValue::new(64, ByteUnit::Megabytes)
        );
        assert_eq!("2GB".parse::<ByteValue>().unwrap().to_string(), "2gb");
        assert_eq!("1024".parse::<ByteValue>().unwrap().to_string(), "1024b");
        assert!("1.5g".parse::<ByteValue>().is_err());
    }
}
