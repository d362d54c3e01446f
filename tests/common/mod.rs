//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hookguard::registration::{FieldRegex, Webhook};
use hookguard::{CheckRule, Checker, Clock, CustomDuration, RegistrationV1, RegistrationV2, SharedChecker};

/// The instant every fixed clock is pinned to.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
}

pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

/// A V1 registration that passes the default rules, living for `duration`.
pub fn v1_with_duration(duration: CustomDuration) -> RegistrationV1 {
    let mut reg = RegistrationV1::default();
    reg.address = "10.1.2.3".into();
    reg.config.receiver_url = "https://hooks.acme.io/events".into();
    reg.config.content_type = "application/json".into();
    reg.events = vec!["device-status".into()];
    reg.duration = duration;
    reg
}

/// A V1 registration that declares its lifetime with `until` instead.
pub fn v1_with_until(until: DateTime<Utc>) -> RegistrationV1 {
    let mut reg = v1_with_duration(CustomDuration::ZERO);
    reg.until = Some(until);
    reg
}

pub fn v2_registration() -> RegistrationV2 {
    RegistrationV2 {
        canonical_name: "acme-status".into(),
        address: "10.1.2.3".into(),
        webhooks: vec![Webhook {
            receiver_urls: vec!["https://hooks.acme.io/events".into()],
            ..Default::default()
        }],
        matcher: vec![FieldRegex {
            field: "canonical_name".into(),
            regex: "device-status".into(),
        }],
        expires: Some(Utc::now() + chrono::Duration::minutes(5)),
        ..Default::default()
    }
}

pub fn https_only() -> SharedChecker {
    Arc::new(Checker::new(vec![CheckRule::OnlyAllowSchemes(vec!["https".into()])]).unwrap())
}
