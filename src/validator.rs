//! The validation capability surface.
//!
//! Options are written once against [`Validator`]; each registration version
//! supplies its own implementation. Checks that have no meaning for a version
//! either pass (documented per method) or return
//! [`ValidationError::UnsupportedVariant`] so the mismatch is visible.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::checker::UrlChecker;
use crate::clock::{now_from, Clock};
use crate::errors::{ValidationError, ValidationErrors, ValidationResult};
use crate::registration::{RegistrationV1, RegistrationV2};

pub trait Validator {
    /// Type name used in diagnostics, e.g. `RegistrationV1`.
    fn variant(&self) -> &'static str;

    /// At least one event matcher is present.
    fn validate_has_events(&self) -> ValidationResult;

    /// Every event pattern compiles; one failure per bad pattern.
    fn validate_event_patterns(&self) -> ValidationResult;

    /// Every device id pattern compiles.
    fn validate_device_id_patterns(&self) -> ValidationResult;

    /// Checks the declared lifetime against `ttl`. A `ttl` of zero or less
    /// enforces no upper bound.
    fn validate_expiry(&self, ttl: Duration) -> ValidationResult;

    /// Rejects an absolute expiry later than `now + max_ttl + jitter`.
    fn validate_expiry_bound(
        &self,
        jitter: Duration,
        max_ttl: Duration,
        clock: Option<&Clock>,
    ) -> ValidationResult;

    /// Rejects any absolute expiry timestamp.
    fn validate_no_expiry_timestamp(&self) -> ValidationResult;

    fn validate_receiver_url(&self, checker: &dyn UrlChecker) -> ValidationResult;

    fn validate_failure_url(&self, checker: &dyn UrlChecker) -> ValidationResult;

    fn validate_alternative_urls(&self, checker: &dyn UrlChecker) -> ValidationResult;

    /// Replaces the time source used by [`Validator::validate_expiry`].
    /// `None` restores the wall clock.
    fn set_clock(&mut self, clock: Option<Clock>) -> ValidationResult;
}

fn compile_all<'a, I, F>(patterns: I, wrap: F) -> ValidationResult
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(String, regex::Error) -> ValidationError,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            Regex::new(pattern)
                .err()
                .map(|source| wrap(pattern.to_string(), source))
        })
        .collect::<ValidationErrors>()
        .into_result()
}

/// Zero or negative bounds mean "unbounded".
fn normalize_ttl(ttl: Duration) -> Duration {
    if ttl <= Duration::zero() {
        Duration::zero()
    } else {
        ttl
    }
}

/// Shared absolute-expiry check: already expired, or beyond `now + ttl`.
fn check_absolute_expiry(
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
    ttl: Duration,
    errors: &mut ValidationErrors,
) {
    if now > expiry {
        errors.push(ValidationError::AlreadyExpired { expiry, now });
    }
    if ttl.is_zero() {
        return;
    }
    if let Some(limit) = now.checked_add_signed(ttl) {
        if expiry > limit {
            errors.push(ValidationError::ExpiryTooLong {
                until: expiry,
                limit,
            });
        }
    }
}

fn check_expiry_bound(
    expiry: Option<DateTime<Utc>>,
    jitter: Duration,
    max_ttl: Duration,
    clock: Option<&Clock>,
) -> ValidationResult {
    let mut errors = ValidationErrors::new();
    if max_ttl < Duration::zero() {
        errors.push(ValidationError::NegativeBound {
            name: "max ttl",
            value: max_ttl,
        });
    }
    if jitter < Duration::zero() {
        errors.push(ValidationError::NegativeBound {
            name: "jitter",
            value: jitter,
        });
    }
    if !errors.is_empty() {
        return errors.into_result();
    }

    let Some(proposed) = expiry else {
        return Ok(());
    };
    let limit = now_from(clock)
        .checked_add_signed(max_ttl)
        .and_then(|t| t.checked_add_signed(jitter));
    match limit {
        Some(limit) if proposed > limit => {
            Err(ValidationError::ExpiryAfterLimit { proposed, limit }.into())
        }
        _ => Ok(()),
    }
}

fn check_url<F>(checker: &dyn UrlChecker, url: &str, wrap: F) -> ValidationResult
where
    F: FnOnce(String, crate::checker::UrlError) -> ValidationError,
{
    checker
        .check(url)
        .map_err(|source| wrap(url.to_string(), source).into())
}

// ============================================================================
// VERSION 1
// ============================================================================

impl Validator for RegistrationV1 {
    fn variant(&self) -> &'static str {
        "RegistrationV1"
    }

    fn validate_has_events(&self) -> ValidationResult {
        if self.events.is_empty() {
            return Err(ValidationError::NoEvents.into());
        }
        Ok(())
    }

    fn validate_event_patterns(&self) -> ValidationResult {
        compile_all(self.events.iter().map(String::as_str), |pattern, source| {
            ValidationError::EventPattern { pattern, source }
        })
    }

    fn validate_device_id_patterns(&self) -> ValidationResult {
        compile_all(
            self.matcher.device_id.iter().map(String::as_str),
            |pattern, source| ValidationError::DeviceIdPattern { pattern, source },
        )
    }

    fn validate_expiry(&self, ttl: Duration) -> ValidationResult {
        let ttl = normalize_ttl(ttl);
        let mut errors = ValidationErrors::new();

        if !ttl.is_zero() && self.duration.exceeds(ttl) {
            errors.push(ValidationError::DurationTooLong {
                duration: self.duration,
                ttl,
            });
        }

        match (self.duration.is_zero(), self.until) {
            (true, None) => errors.push(ValidationError::ExpiryMissing),
            (false, Some(_)) => errors.push(ValidationError::ExpiryConflict),
            _ => {}
        }

        if let Some(until) = self.until {
            let now = now_from(self.now.as_ref());
            check_absolute_expiry(until, now, ttl, &mut errors);
        }

        errors.into_result()
    }

    fn validate_expiry_bound(
        &self,
        jitter: Duration,
        max_ttl: Duration,
        clock: Option<&Clock>,
    ) -> ValidationResult {
        check_expiry_bound(self.until, jitter, max_ttl, clock)
    }

    fn validate_no_expiry_timestamp(&self) -> ValidationResult {
        if self.until.is_some() {
            return Err(ValidationError::UntilForbidden.into());
        }
        Ok(())
    }

    fn validate_receiver_url(&self, checker: &dyn UrlChecker) -> ValidationResult {
        if self.config.receiver_url.is_empty() {
            return Ok(());
        }
        check_url(checker, &self.config.receiver_url, |url, source| {
            ValidationError::ReceiverUrl { url, source }
        })
    }

    fn validate_failure_url(&self, checker: &dyn UrlChecker) -> ValidationResult {
        if self.failure_url.is_empty() {
            return Ok(());
        }
        check_url(checker, &self.failure_url, |url, source| {
            ValidationError::FailureUrl { url, source }
        })
    }

    fn validate_alternative_urls(&self, checker: &dyn UrlChecker) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        for url in &self.config.alternative_urls {
            errors.absorb(check_url(checker, url, |url, source| {
                ValidationError::AlternativeUrl { url, source }
            }));
        }
        errors.into_result()
    }

    fn set_clock(&mut self, clock: Option<Clock>) -> ValidationResult {
        self.set_now_func(clock);
        Ok(())
    }
}

// ============================================================================
// VERSION 2
// ============================================================================

/// Version 2 folds device matching into the generic field matchers, has a
/// single `expires` timestamp, no alternative URLs and no clock seam.
impl Validator for RegistrationV2 {
    fn variant(&self) -> &'static str {
        "RegistrationV2"
    }

    fn validate_has_events(&self) -> ValidationResult {
        if self.matcher.is_empty() {
            return Err(ValidationError::NoMatchers.into());
        }
        Ok(())
    }

    fn validate_event_patterns(&self) -> ValidationResult {
        compile_all(self.matcher.iter().map(|m| m.regex.as_str()), |pattern, source| {
            ValidationError::EventPattern { pattern, source }
        })
    }

    /// Device ids are matched through `matcher`; already covered by
    /// [`Validator::validate_event_patterns`].
    fn validate_device_id_patterns(&self) -> ValidationResult {
        Ok(())
    }

    fn validate_expiry(&self, ttl: Duration) -> ValidationResult {
        let ttl = normalize_ttl(ttl);
        let Some(expires) = self.expires else {
            return Err(ValidationError::ExpiresMissing.into());
        };
        let mut errors = ValidationErrors::new();
        check_absolute_expiry(expires, Utc::now(), ttl, &mut errors);
        errors.into_result()
    }

    fn validate_expiry_bound(
        &self,
        jitter: Duration,
        max_ttl: Duration,
        clock: Option<&Clock>,
    ) -> ValidationResult {
        check_expiry_bound(self.expires, jitter, max_ttl, clock)
    }

    /// `expires` is the only lifetime mechanism of this version, so it cannot
    /// be forbidden.
    fn validate_no_expiry_timestamp(&self) -> ValidationResult {
        Err(ValidationError::unsupported("NoUntil", self.variant()).into())
    }

    fn validate_receiver_url(&self, checker: &dyn UrlChecker) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        for webhook in &self.webhooks {
            for url in webhook.receiver_urls.iter().filter(|u| !u.is_empty()) {
                errors.absorb(check_url(checker, url, |url, source| {
                    ValidationError::ReceiverUrl { url, source }
                }));
            }
        }
        errors.into_result()
    }

    fn validate_failure_url(&self, checker: &dyn UrlChecker) -> ValidationResult {
        if self.failure_url.is_empty() {
            return Ok(());
        }
        check_url(checker, &self.failure_url, |url, source| {
            ValidationError::FailureUrl { url, source }
        })
    }

    fn validate_alternative_urls(&self, _checker: &dyn UrlChecker) -> ValidationResult {
        Err(ValidationError::unsupported("ProvideAlternativeURLValidator", self.variant()).into())
    }

    fn set_clock(&mut self, _clock: Option<Clock>) -> ValidationResult {
        Err(ValidationError::unsupported("ProvideTimeNowFunc", self.variant()).into())
    }
}
