//! Validation options.
//!
//! An option is one independently constructable rule. It closes over whatever
//! configuration it needs (a checker, a ttl, a clock) and applies it through
//! the [`Validator`] surface, so every option works with every registration
//! version that supports the underlying check.
//!
//! Each option renders a stable description through `Display`, in the form
//! `Name(args)`. A missing checker or clock renders as `nil`; a clock renders
//! as `func`.
//!
//! Order matters for [`provide_time_now_func`]: it only affects options that
//! run after it in the same pipeline.

use std::fmt;

use chrono::Duration;

use crate::checker::SharedChecker;
use crate::clock::Clock;
use crate::duration::format_signed;
use crate::errors::{ValidationError, ValidationResult};
use crate::validator::Validator;

pub trait ValidationOption: fmt::Display + Send + Sync {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult;

    fn describe(&self) -> String {
        self.to_string()
    }
}

pub type BoxedOption = Box<dyn ValidationOption>;

// ============================================================================
// CONSTRUCTORS
// ============================================================================

/// Always returns `err`; `None` makes it a no-op.
pub fn fail(err: Option<ValidationError>) -> BoxedOption {
    Box::new(Fail { err })
}

pub fn always_valid() -> BoxedOption {
    Box::new(AlwaysValid)
}

/// Requires at least one event matcher.
pub fn at_least_one_event() -> BoxedOption {
    Box::new(AtLeastOneEvent)
}

pub fn event_regex_must_compile() -> BoxedOption {
    Box::new(EventRegexMustCompile)
}

pub fn device_id_regex_must_compile() -> BoxedOption {
    Box::new(DeviceIdRegexMustCompile)
}

/// Bounds the registration lifetime by `ttl`. A `ttl` of zero or less skips
/// the bound but still requires a lifetime to be declared.
pub fn validate_registration_duration(ttl: Duration) -> BoxedOption {
    Box::new(ValidateRegistrationDuration { ttl })
}

/// Rejects an absolute expiry after `now + max_ttl + jitter`, reading "now"
/// from `now` (or the wall clock).
pub fn validate_until(jitter: Duration, max_ttl: Duration, now: Option<Clock>) -> BoxedOption {
    Box::new(ValidateUntil {
        jitter,
        max_ttl,
        now,
    })
}

/// Installs `now` as the registration's time source for later options.
pub fn provide_time_now_func(now: Option<Clock>) -> BoxedOption {
    Box::new(ProvideTimeNowFunc { now })
}

pub fn provide_receiver_url_validator(checker: Option<SharedChecker>) -> BoxedOption {
    Box::new(UrlOption {
        target: UrlTarget::Receiver,
        checker,
    })
}

pub fn provide_failure_url_validator(checker: Option<SharedChecker>) -> BoxedOption {
    Box::new(UrlOption {
        target: UrlTarget::Failure,
        checker,
    })
}

pub fn provide_alternative_url_validator(checker: Option<SharedChecker>) -> BoxedOption {
    Box::new(UrlOption {
        target: UrlTarget::Alternative,
        checker,
    })
}

/// Forbids an absolute expiry timestamp.
pub fn no_until() -> BoxedOption {
    Box::new(NoUntil)
}

// ============================================================================
// OPTION TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct Fail {
    err: Option<ValidationError>,
}

impl ValidationOption for Fail {
    fn validate(&self, _target: &mut dyn Validator) -> ValidationResult {
        match &self.err {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            Some(err) => write!(f, "Error('{err}')"),
            None => f.write_str("Error(nil)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlwaysValid;

impl ValidationOption for AlwaysValid {
    fn validate(&self, _target: &mut dyn Validator) -> ValidationResult {
        Ok(())
    }
}

impl fmt::Display for AlwaysValid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AlwaysValid()")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AtLeastOneEvent;

impl ValidationOption for AtLeastOneEvent {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_has_events()
    }
}

impl fmt::Display for AtLeastOneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AtLeastOneEvent()")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventRegexMustCompile;

impl ValidationOption for EventRegexMustCompile {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_event_patterns()
    }
}

impl fmt::Display for EventRegexMustCompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventRegexMustCompile()")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceIdRegexMustCompile;

impl ValidationOption for DeviceIdRegexMustCompile {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_device_id_patterns()
    }
}

impl fmt::Display for DeviceIdRegexMustCompile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceIDRegexMustCompile()")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidateRegistrationDuration {
    ttl: Duration,
}

impl ValidationOption for ValidateRegistrationDuration {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_expiry(self.ttl)
    }
}

impl fmt::Display for ValidateRegistrationDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidateRegistrationDuration({})", format_signed(self.ttl))
    }
}

#[derive(Debug, Clone)]
pub struct ValidateUntil {
    jitter: Duration,
    max_ttl: Duration,
    now: Option<Clock>,
}

impl ValidationOption for ValidateUntil {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_expiry_bound(self.jitter, self.max_ttl, self.now.as_ref())
    }
}

impl fmt::Display for ValidateUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValidateUntil({}, {}, {})",
            format_signed(self.jitter),
            format_signed(self.max_ttl),
            if self.now.is_some() { "func" } else { "nil" }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProvideTimeNowFunc {
    now: Option<Clock>,
}

impl ValidationOption for ProvideTimeNowFunc {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.set_clock(self.now.clone())
    }
}

impl fmt::Display for ProvideTimeNowFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.now {
            Some(_) => f.write_str("ProvideTimeNowFunc(func)"),
            None => f.write_str("ProvideTimeNowFunc(nil)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlTarget {
    Receiver,
    Failure,
    Alternative,
}

impl UrlTarget {
    fn option_name(self) -> &'static str {
        match self {
            UrlTarget::Receiver => "ProvideReceiverURLValidator",
            UrlTarget::Failure => "ProvideFailureURLValidator",
            UrlTarget::Alternative => "ProvideAlternativeURLValidator",
        }
    }
}

/// URL policy option. Without a checker there is no policy, so it passes.
#[derive(Clone)]
pub struct UrlOption {
    target: UrlTarget,
    checker: Option<SharedChecker>,
}

impl ValidationOption for UrlOption {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        let Some(checker) = self.checker.as_deref() else {
            return Ok(());
        };
        match self.target {
            UrlTarget::Receiver => target.validate_receiver_url(checker),
            UrlTarget::Failure => target.validate_failure_url(checker),
            UrlTarget::Alternative => target.validate_alternative_urls(checker),
        }
    }
}

impl fmt::Display for UrlOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.checker {
            Some(checker) => write!(f, "{}({checker})", self.target.option_name()),
            None => write!(f, "{}(nil)", self.target.option_name()),
        }
    }
}

impl fmt::Debug for UrlOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoUntil;

impl ValidationOption for NoUntil {
    fn validate(&self, target: &mut dyn Validator) -> ValidationResult {
        target.validate_no_expiry_timestamp()
    }
}

impl fmt::Display for NoUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoUntil()")
    }
}
