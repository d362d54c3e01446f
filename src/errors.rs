//! Validation failures and their aggregate.
//!
//! Every rule violation is a [`ValidationError`] variant. The pipeline never
//! stops at the first failure; it gathers all of them into a
//! [`ValidationErrors`] list, and callers ask that list whether any member
//! is of a given [`ErrorKind`] or matches a specific variant.

use std::fmt;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::checker::UrlError;
use crate::duration::{format_signed, CustomDuration};

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The registration breaks a business rule.
    InvalidInput,
    /// The option does not apply to this registration variant.
    UnsupportedVariant,
    /// Produced verbatim by a caller-supplied option.
    Custom,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnsupportedVariant => "unsupported_variant",
            ErrorKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ValidationError {
    #[error("invalid input: cannot have zero events")]
    #[diagnostic(code(hookguard::input::no_events))]
    NoEvents,

    #[error("invalid input: must have matcher for events")]
    #[diagnostic(code(hookguard::input::no_matchers))]
    NoMatchers,

    #[error("invalid input: unable to compile event matching '{pattern}'")]
    #[diagnostic(code(hookguard::input::event_pattern))]
    EventPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid input: unable to compile device id matching '{pattern}'")]
    #[diagnostic(code(hookguard::input::device_id_pattern))]
    DeviceIdPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid input: the registration is for too long ({duration} > {})", format_signed(*.ttl))]
    #[diagnostic(code(hookguard::input::duration_too_long))]
    DurationTooLong {
        duration: CustomDuration,
        ttl: chrono::Duration,
    },

    #[error("invalid input: the registration is for too long ({until} > {limit})")]
    #[diagnostic(code(hookguard::input::expiry_too_long))]
    ExpiryTooLong {
        until: DateTime<Utc>,
        limit: DateTime<Utc>,
    },

    #[error("invalid input: either duration or until must be set")]
    #[diagnostic(code(hookguard::input::expiry_missing))]
    ExpiryMissing,

    #[error("invalid input: expires must be set")]
    #[diagnostic(code(hookguard::input::expires_missing))]
    ExpiresMissing,

    #[error("invalid input: only one of duration or until may be set")]
    #[diagnostic(code(hookguard::input::expiry_conflict))]
    ExpiryConflict,

    #[error("invalid input: the registration has already expired ({expiry} < {now})")]
    #[diagnostic(code(hookguard::input::already_expired))]
    AlreadyExpired {
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("invalid input: {proposed} after {limit}")]
    #[diagnostic(code(hookguard::input::expiry_after_limit))]
    ExpiryAfterLimit {
        proposed: DateTime<Utc>,
        limit: DateTime<Utc>,
    },

    #[error("invalid input: {name} must not be negative (got {})", format_signed(*.value))]
    #[diagnostic(code(hookguard::input::negative_bound))]
    NegativeBound {
        name: &'static str,
        value: chrono::Duration,
    },

    #[error("invalid input: until is not allowed")]
    #[diagnostic(code(hookguard::input::until_forbidden))]
    UntilForbidden,

    #[error("invalid input: receiver url '{url}' is invalid")]
    #[diagnostic(code(hookguard::input::receiver_url))]
    ReceiverUrl {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("invalid input: failure url '{url}' is invalid")]
    #[diagnostic(code(hookguard::input::failure_url))]
    FailureUrl {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("invalid input: alternative url '{url}' is invalid")]
    #[diagnostic(code(hookguard::input::alternative_url))]
    AlternativeUrl {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("invalid type: {option} is not supported by {variant}")]
    #[diagnostic(
        code(hookguard::variant::unsupported),
        help("this usually means the option list was built for the other registration version")
    )]
    UnsupportedVariant {
        option: &'static str,
        variant: &'static str,
    },

    #[error("{0}")]
    #[diagnostic(code(hookguard::custom))]
    Custom(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedVariant { .. } => ErrorKind::UnsupportedVariant,
            Self::Custom(_) => ErrorKind::Custom,
            _ => ErrorKind::InvalidInput,
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// The URL checker's verdict, when this failure came from one.
    pub fn url_error(&self) -> Option<&UrlError> {
        match self {
            Self::ReceiverUrl { source, .. }
            | Self::FailureUrl { source, .. }
            | Self::AlternativeUrl { source, .. } => Some(source),
            _ => None,
        }
    }

    pub(crate) fn unsupported(option: &'static str, variant: &'static str) -> Self {
        Self::UnsupportedVariant { option, variant }
    }
}

/// Result of a capability method, an option, or a whole pipeline run.
pub type ValidationResult = Result<(), ValidationErrors>;

/// Ordered collection of every failure from one validation run.
///
/// An `Err(ValidationErrors)` always holds at least one member.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Folds the failures of `result` (if any) into this collection.
    pub fn absorb(&mut self, result: ValidationResult) {
        if let Err(errors) = result {
            self.errors.extend(errors.errors);
        }
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// True when any member is of `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.is(kind))
    }

    /// True when any member satisfies `pred`.
    pub fn any<F>(&self, pred: F) -> bool
    where
        F: FnMut(&ValidationError) -> bool,
    {
        self.errors.iter().any(pred)
    }

    /// Number of members of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.is(kind)).count()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl Extend<ValidationError> for ValidationErrors {
    fn extend<T: IntoIterator<Item = ValidationError>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = ValidationError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl Diagnostic for ValidationErrors {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("hookguard::validation"))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        Some(Box::new(self.errors.iter().map(|e| e as &dyn Diagnostic)))
    }
}
