//! Registration records, one struct per schema version.
//!
//! Registrations are plain decoded data. Nothing is checked at decode time:
//! regex fields stay raw strings and expiry fields may conflict until an
//! option pipeline is run over them (see [`crate::validator`]).

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::clock::Clock;
use crate::duration::CustomDuration;
use crate::errors::ValidationResult;
use crate::pipeline::Pipeline;
use crate::validator::Validator;

// ============================================================================
// VERSION 1
// ============================================================================

/// Delivery settings of a [`RegistrationV1`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// HTTP URL events are delivered to.
    #[serde(rename = "url")]
    pub receiver_url: String,

    pub content_type: String,

    /// HMAC secret; empty disables signing.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret: String,

    /// Fallback URLs tried round-robin when the receiver fails.
    #[serde(rename = "alt_urls", skip_serializing_if = "Vec::is_empty")]
    pub alternative_urls: Vec<String>,
}

/// Metadata patterns of a [`RegistrationV1`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataMatcherConfig {
    /// Regular expressions matched against the device id.
    pub device_id: Vec<String>,
}

/// Single-destination registration.
///
/// Exactly one of `duration` and `until` is expected to declare the lifetime.
/// The clock used by expiry checks can be replaced after construction with
/// [`RegistrationV1::set_now_func`]; it defaults to the wall clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationV1 {
    #[serde(rename = "registered_from_address")]
    pub address: String,

    pub config: DeliveryConfig,

    /// Notified when the subscriber is cut off; empty disables it.
    pub failure_url: String,

    /// Regular expressions matched against the event type.
    pub events: Vec<String>,

    pub matcher: MetadataMatcherConfig,

    pub duration: CustomDuration,

    #[serde(with = "crate::timestamp", skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub(crate) now: Option<Clock>,
}

impl RegistrationV1 {
    pub fn set_now_func(&mut self, now: Option<Clock>) {
        self.now = now;
    }

    pub fn now_func(&self) -> Option<&Clock> {
        self.now.as_ref()
    }
}

// ============================================================================
// VERSION 2
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryHint {
    /// Attempts per URL before moving to the next one.
    pub retry_each_url: i64,
    pub max_retry: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsSrvRecord {
    pub fqdns: Vec<String>,
    /// Either `weight` or `priority`.
    pub load_balancing_scheme: String,
}

/// One HTTP delivery sink of a [`RegistrationV2`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub accept: String,
    pub accept_encoding: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret: String,
    pub secret_hash: String,
    pub payload_only: bool,
    /// Tried in order; the next one is used when the previous fails.
    pub receiver_urls: Vec<String>,
    pub dns_srv_record: DnsSrvRecord,
    pub retry_hint: RetryHint,
}

/// One Kafka delivery sink of a [`RegistrationV2`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kafka {
    pub accept: String,
    pub bootstrap_servers: Vec<String>,
    pub retry_hint: RetryHint,
}

/// A regular expression bound to an event field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRegex {
    pub field: String,
    pub regex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchHint {
    pub max_linger_duration: CustomDuration,
    pub max_messages: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Multi-sink registration keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationV2 {
    pub contact_info: ContactInfo,

    /// Re-registering under the same name replaces the previous registration.
    pub canonical_name: String,

    #[serde(rename = "registered_from_address")]
    pub address: String,

    pub webhooks: Vec<Webhook>,

    pub kafkas: Vec<Kafka>,

    pub hash: FieldRegex,

    #[serde(rename = "batch_hints")]
    pub batch_hint: BatchHint,

    pub failure_url: String,

    /// Field matchers; every entry must match for an event to be delivered.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matcher: Vec<FieldRegex>,

    #[serde(with = "crate::timestamp", skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// Fields that only exist in the version 2 schema.
const V2_MARKERS: &[&str] = &["webhooks", "kafkas", "canonical_name", "expires"];

/// A registration of either schema version.
#[derive(Debug, Clone)]
pub enum Registration {
    V1(RegistrationV1),
    V2(RegistrationV2),
}

impl Registration {
    pub fn version(&self) -> u8 {
        match self {
            Registration::V1(_) => 1,
            Registration::V2(_) => 2,
        }
    }

    pub fn as_validator(&self) -> &dyn Validator {
        match self {
            Registration::V1(r) => r,
            Registration::V2(r) => r,
        }
    }

    pub fn as_validator_mut(&mut self) -> &mut dyn Validator {
        match self {
            Registration::V1(r) => r,
            Registration::V2(r) => r,
        }
    }

    /// Runs `pipeline` over this registration.
    pub fn validate(&mut self, pipeline: &Pipeline) -> ValidationResult {
        pipeline.apply(self.as_validator_mut())
    }

    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

impl From<RegistrationV1> for Registration {
    fn from(r: RegistrationV1) -> Self {
        Registration::V1(r)
    }
}

impl From<RegistrationV2> for Registration {
    fn from(r: RegistrationV2) -> Self {
        Registration::V2(r)
    }
}

impl Serialize for Registration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Registration::V1(r) => r.serialize(serializer),
            Registration::V2(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Registration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let object = value
            .as_object()
            .ok_or_else(|| D::Error::custom("registration must be a JSON object"))?;

        if V2_MARKERS.iter().any(|key| object.contains_key(*key)) {
            RegistrationV2::deserialize(value)
                .map(Registration::V2)
                .map_err(D::Error::custom)
        } else {
            RegistrationV1::deserialize(value)
                .map(Registration::V1)
                .map_err(D::Error::custom)
        }
    }
}
