//! Human-friendly duration values for registration payloads.
//!
//! A [`CustomDuration`] decodes from either a string in the human duration
//! grammar (`"5m"`, `"1h 30m"`, `"-250ms"`) or a bare integer, which is read
//! as a whole number of seconds. It always encodes back to the string form.
//! The value is signed; rejecting negative spans is up to the caller.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use miette::Diagnostic;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Failure to decode a [`CustomDuration`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DurationError {
    #[error("duration must be of type int or string (example:'5m'); Invalid value: {value}")]
    #[diagnostic(
        code(hookguard::input::invalid_duration),
        help("use a whole number of seconds or a string such as \"90s\", \"5m\" or \"1h 30m\"")
    )]
    InvalidDuration { value: String },
}

impl DurationError {
    fn invalid(value: impl fmt::Display) -> Self {
        Self::InvalidDuration {
            value: value.to_string(),
        }
    }
}

/// A signed span of time. The zero value means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomDuration(Duration);

impl CustomDuration {
    pub const ZERO: CustomDuration = CustomDuration(Duration::zero());

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(Duration::seconds(secs))
    }

    pub fn from_mins(mins: i64) -> Self {
        Self(Duration::minutes(mins))
    }

    pub const fn as_chrono(&self) -> Duration {
        self.0
    }

    /// The unsigned equivalent; `None` for negative spans.
    pub fn to_std(&self) -> Option<std::time::Duration> {
        self.0.to_std().ok()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Duration::zero()
    }

    /// Reports whether this duration is strictly longer than `bound`.
    pub fn exceeds(&self, bound: Duration) -> bool {
        self.0 > bound
    }
}

impl Default for CustomDuration {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Duration> for CustomDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<CustomDuration> for Duration {
    fn from(duration: CustomDuration) -> Self {
        duration.0
    }
}

impl fmt::Display for CustomDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_signed(self.0))
    }
}

impl FromStr for CustomDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_signed(s)
            .map(Self)
            .map_err(|_| DurationError::invalid(format!("\"{s}\"")))
    }
}

impl Serialize for CustomDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CustomDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CustomDurationVisitor)
    }
}

struct CustomDurationVisitor;

impl<'de> Visitor<'de> for CustomDurationVisitor {
    type Value = CustomDuration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer number of seconds or a duration string such as '5m'")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v)
            .ok()
            .and_then(Duration::try_seconds)
            .map(CustomDuration)
            .ok_or_else(|| E::custom(DurationError::invalid(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Duration::try_seconds(v)
            .map(CustomDuration)
            .ok_or_else(|| E::custom(DurationError::invalid(v)))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(DurationError::invalid(v)))
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(DurationError::invalid(v)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(DurationError::invalid("null")))
    }
}

/// Renders a signed delta in the human grammar, with a leading `-` for
/// negative values.
pub fn format_signed(delta: Duration) -> String {
    let negative = delta < Duration::zero();
    let magnitude = if negative { -delta } else { delta };
    let text = match magnitude.to_std() {
        Ok(d) if d.is_zero() => "0s".to_string(),
        Ok(d) => humantime::format_duration(d).to_string(),
        Err(_) => magnitude.to_string(),
    };
    if negative {
        format!("-{text}")
    } else {
        text
    }
}

/// Parses a signed delta: the human grammar with an optional leading `-`.
pub fn parse_signed(s: &str) -> Result<Duration, DurationError> {
    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let magnitude = humantime::parse_duration(body).map_err(|_| DurationError::invalid(s))?;
    let delta = Duration::from_std(magnitude).map_err(|_| DurationError::invalid(s))?;
    Ok(if negative { -delta } else { delta })
}
