//! Composable, option-based validation for webhook event-subscription
//! registrations.
//!
//! A caller decodes a [`Registration`], builds a list of options (usually
//! once, from a [`ValidatorConfig`]) and runs them through a [`Pipeline`].
//! Every failing option contributes to one [`ValidationErrors`] aggregate.

pub mod checker;
pub mod cli;
pub mod clock;
pub mod config;
pub mod duration;
pub mod errors;
pub mod options;
pub mod pipeline;
pub mod registration;
pub mod timestamp;
pub mod validator;

pub use checker::{CheckRule, Checker, SharedChecker, UrlChecker, UrlError};
pub use clock::Clock;
pub use config::{
    build_options, build_pipeline, build_url_checker, build_v2_pipeline, build_validators,
    ConfigError, ValidatorConfig,
};
pub use duration::{CustomDuration, DurationError};
pub use errors::{ErrorKind, ValidationError, ValidationErrors, ValidationResult};
pub use options::{BoxedOption, ValidationOption};
pub use pipeline::{validate, Pipeline};
pub use registration::{Registration, RegistrationV1, RegistrationV2};
pub use validator::Validator;
