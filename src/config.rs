//! Validator configuration and the builders that turn it into a URL checker
//! and an ordered option list.
//!
//! Field names and defaults are part of the persisted format; the file may be
//! YAML or JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::checker::{CheckRule, Checker, CheckerError, SharedChecker};
use crate::clock::Clock;
use crate::options::{self, BoxedOption};
use crate::pipeline::Pipeline;

/// Special-use IP ranges forbidden unless `allow_special_use_ips` is set.
pub const SPECIAL_USE_IPS: &[&str] = &[
    "0.0.0.0/8",          // local ipv4
    "fe80::/10",          // local ipv6
    "255.255.255.255/32", // broadcast to neighbors
    "2001::/32",          // ipv6 TEREDO prefix
    "2001:5::/32",        // EID space for lisp
    "2002::/16",          // ipv6 6to4
    "fc00::/7",           // ipv6 unique local
    "192.0.0.0/24",       // ipv4 IANA
    "2001:0000::/23",     // ipv6 IANA
    "224.0.0.1/32",       // ipv4 multicast
];

/// Special-use host names forbidden unless `allow_special_use_hosts` is set.
pub use crate::checker::SPECIAL_USE_HOSTS;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config '{path}'")]
    #[diagnostic(code(hookguard::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {message}")]
    #[diagnostic(code(hookguard::config::parse))]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checker(#[from] CheckerError),
}

// ============================================================================
// CONFIGURATION STRUCTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub url: UrlConfig,
    pub ttl: TtlConfig,
    pub options: OptionsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    pub https_only: bool,
    pub allow_loopback: bool,
    pub allow_ip: bool,
    pub allow_special_use_hosts: bool,
    pub allow_special_use_ips: bool,
    pub invalid_hosts: Vec<String>,
    pub invalid_subnets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Longest allowed registration lifetime; zero means unbounded.
    #[serde(with = "signed_duration")]
    pub max: chrono::Duration,
    /// Slack added to `max` when bounding absolute expiry timestamps.
    #[serde(with = "signed_duration")]
    pub jitter: chrono::Duration,
    #[serde(skip)]
    pub now: Option<Clock>,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            max: chrono::Duration::zero(),
            jitter: chrono::Duration::zero(),
            now: None,
        }
    }
}

/// Which options [`build_options`] emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub at_least_one_event: bool,
    pub event_regex_must_compile: bool,
    pub device_id_regex_must_compile: bool,
    pub validate_registration_duration: bool,
    /// Bounds absolute expiry timestamps by `ttl.max + ttl.jitter`; only
    /// emitted when `ttl.max` is positive.
    pub validate_until: bool,
    pub provide_receiver_url_validator: bool,
    pub provide_failure_url_validator: bool,
    pub provide_alternative_url_validator: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            at_least_one_event: true,
            event_regex_must_compile: true,
            device_id_regex_must_compile: true,
            validate_registration_duration: true,
            validate_until: true,
            provide_receiver_url_validator: true,
            provide_failure_url_validator: true,
            provide_alternative_url_validator: true,
        }
    }
}

impl ValidatorConfig {
    /// Loads `.yaml` / `.yml` files as YAML and anything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn with_clock(mut self, now: Clock) -> Self {
        self.ttl.now = Some(now);
        self
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Translates the URL policy into a [`Checker`].
pub fn build_url_checker(config: &ValidatorConfig) -> Result<Checker, ConfigError> {
    let url = &config.url;
    let mut rules = Vec::new();

    if url.https_only {
        rules.push(CheckRule::OnlyAllowSchemes(vec!["https".to_string()]));
    }
    if !url.allow_loopback {
        rules.push(CheckRule::ForbidLoopback);
    }
    if !url.allow_ip {
        rules.push(CheckRule::ForbidAnyIps);
    }
    if !url.allow_special_use_hosts {
        rules.push(CheckRule::ForbidSpecialUseDomains);
    }
    if !url.allow_special_use_ips {
        rules.push(CheckRule::ForbidSubnets(to_strings(SPECIAL_USE_IPS)));
    }
    if !url.invalid_hosts.is_empty() {
        rules.push(CheckRule::ForbidDomains(url.invalid_hosts.clone()));
    }
    if !url.invalid_subnets.is_empty() {
        rules.push(CheckRule::ForbidSubnets(url.invalid_subnets.clone()));
    }

    let checker = Checker::new(rules)?;
    debug!(checker = %checker, "built url checker");
    Ok(checker)
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The default option list: every rule, in a fixed order, with the expiry
/// bound included when `ttl.max` is positive.
pub fn build_validators(config: &ValidatorConfig) -> Result<Vec<BoxedOption>, ConfigError> {
    let checker: SharedChecker = Arc::new(build_url_checker(config)?);
    let mut opts = vec![
        options::at_least_one_event(),
        options::event_regex_must_compile(),
        options::device_id_regex_must_compile(),
        options::validate_registration_duration(config.ttl.max),
    ];
    if config.ttl.max > chrono::Duration::zero() {
        opts.push(options::validate_until(
            config.ttl.jitter,
            config.ttl.max,
            config.ttl.now.clone(),
        ));
    }
    opts.extend([
        options::provide_receiver_url_validator(Some(checker.clone())),
        options::provide_failure_url_validator(Some(checker.clone())),
        options::provide_alternative_url_validator(Some(checker)),
    ]);
    debug!(count = opts.len(), "built default validators");
    Ok(opts)
}

/// The option list selected by `config.options`, using `checker` for every
/// URL rule.
pub fn build_options(config: &ValidatorConfig, checker: Option<SharedChecker>) -> Vec<BoxedOption> {
    let flags = &config.options;
    let mut opts = Vec::new();

    if flags.at_least_one_event {
        opts.push(options::at_least_one_event());
    }
    if flags.event_regex_must_compile {
        opts.push(options::event_regex_must_compile());
    }
    if flags.device_id_regex_must_compile {
        opts.push(options::device_id_regex_must_compile());
    }
    if flags.validate_registration_duration {
        opts.push(options::validate_registration_duration(config.ttl.max));
    }
    if flags.validate_until && config.ttl.max > chrono::Duration::zero() {
        opts.push(options::validate_until(
            config.ttl.jitter,
            config.ttl.max,
            config.ttl.now.clone(),
        ));
    }
    if flags.provide_receiver_url_validator {
        opts.push(options::provide_receiver_url_validator(checker.clone()));
    }
    if flags.provide_failure_url_validator {
        opts.push(options::provide_failure_url_validator(checker.clone()));
    }
    if flags.provide_alternative_url_validator {
        opts.push(options::provide_alternative_url_validator(checker));
    }
    debug!(count = opts.len(), "built configured options");
    opts
}

/// Checker plus flag-selected options, ready to apply.
pub fn build_pipeline(config: &ValidatorConfig) -> Result<Pipeline, ConfigError> {
    let checker: SharedChecker = Arc::new(build_url_checker(config)?);
    Ok(build_options(config, Some(checker)).into())
}

/// [`build_pipeline`] without the alternative-URL option, which version 2
/// registrations do not support.
pub fn build_v2_pipeline(config: &ValidatorConfig) -> Result<Pipeline, ConfigError> {
    let mut config = config.clone();
    config.options.provide_alternative_url_validator = false;
    build_pipeline(&config)
}

/// Serde adapter for signed durations: the human grammar with an optional
/// leading `-`, or an integer number of seconds.
mod signed_duration {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::duration::{format_signed, parse_signed};

    pub fn serialize<S>(value: &chrono::Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_signed(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(i64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<chrono::Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => chrono::Duration::try_seconds(secs)
                .ok_or_else(|| D::Error::custom(format!("duration out of range: {secs}"))),
            Raw::Text(text) => parse_signed(&text).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::UrlChecker;

    #[test]
    fn test_yaml_shape() {
        let yaml = r#"
url:
  https_only: true
  invalid_subnets: ["192.168.0.0/16"]
ttl:
  max: 1h
  jitter: 1m
options:
  provide_alternative_url_validator: false
"#;
        let config: ValidatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.url.https_only);
        assert!(!config.url.allow_loopback);
        assert_eq!(config.url.invalid_subnets, vec!["192.168.0.0/16".to_string()]);
        assert_eq!(config.ttl.max, chrono::Duration::hours(1));
        assert_eq!(config.ttl.jitter, chrono::Duration::minutes(1));
        assert!(config.options.at_least_one_event);
        assert!(!config.options.provide_alternative_url_validator);
    }

    #[test]
    fn test_ttl_accepts_seconds() {
        let config: ValidatorConfig = serde_json::from_str(r#"{"ttl":{"max":300}}"#).unwrap();
        assert_eq!(config.ttl.max, chrono::Duration::minutes(5));
    }

    #[test]
    fn test_checker_rules_follow_flags() {
        let mut config = ValidatorConfig::default();
        let strict = build_url_checker(&config).unwrap();
        assert!(strict.check("https://127.0.0.1/").is_err());
        assert!(strict.check("https://localhost/").is_err());
        assert!(strict.check("https://hooks.acme.io/").is_ok());

        config.url.allow_loopback = true;
        config.url.allow_ip = true;
        config.url.allow_special_use_hosts = true;
        config.url.allow_special_use_ips = true;
        let lax = build_url_checker(&config).unwrap();
        assert!(lax.check("http://127.0.0.1/").is_ok());
        assert_eq!(lax.to_string(), "Checker{}");
    }

    #[test]
    fn test_bad_invalid_subnet_is_config_error() {
        let mut config = ValidatorConfig::default();
        config.url.invalid_subnets = vec!["300.0.0.0/8".into()];
        assert!(matches!(
            build_url_checker(&config),
            Err(ConfigError::Checker(CheckerError::InvalidSubnet { .. }))
        ));
    }
}
