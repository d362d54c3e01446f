//! Behaviour and descriptions of every option kind against V1 registrations.

mod common;

use chrono::{Duration, Utc};
use common::{fixed_clock, fixed_now, https_only, v1_with_duration, v1_with_until};
use hookguard::options::{self, BoxedOption, ValidationOption};
use hookguard::{CustomDuration, ErrorKind, RegistrationV1, UrlError, ValidationError};

struct Case {
    description: &'static str,
    option: BoxedOption,
    registration: RegistrationV1,
    describe: &'static str,
    expect: Option<ErrorKind>,
}

fn minutes(m: i64) -> CustomDuration {
    CustomDuration::from_mins(m)
}

fn run_cases(cases: Vec<Case>) {
    for mut case in cases {
        assert_eq!(
            case.option.describe(),
            case.describe,
            "{}: description",
            case.description
        );
        let result = case.option.validate(&mut case.registration);
        match case.expect {
            None => assert!(
                result.is_ok(),
                "{}: expected success, got {:?}",
                case.description,
                result
            ),
            Some(kind) => {
                let errors = result.expect_err(case.description);
                assert!(
                    errors.is(kind),
                    "{}: expected {kind}, got {errors}",
                    case.description
                );
            }
        }
    }
}

#[test]
fn basic_options() {
    let mut no_events = v1_with_duration(minutes(5));
    no_events.events.clear();

    let mut two_events = v1_with_duration(minutes(5));
    two_events.events = vec!["foo".into(), "bar".into()];

    run_cases(vec![
        Case {
            description: "nil error is a no-op",
            option: options::fail(None),
            registration: v1_with_duration(minutes(5)),
            describe: "Error(nil)",
            expect: None,
        },
        Case {
            description: "error is returned verbatim",
            option: options::fail(Some(ValidationError::Custom("boom".into()))),
            registration: v1_with_duration(minutes(5)),
            describe: "Error('boom')",
            expect: Some(ErrorKind::Custom),
        },
        Case {
            description: "always valid",
            option: options::always_valid(),
            registration: RegistrationV1::default(),
            describe: "AlwaysValid()",
            expect: None,
        },
        Case {
            description: "zero events",
            option: options::at_least_one_event(),
            registration: no_events,
            describe: "AtLeastOneEvent()",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "two events",
            option: options::at_least_one_event(),
            registration: two_events,
            describe: "AtLeastOneEvent()",
            expect: None,
        },
    ]);
}

#[test]
fn zero_events_message() {
    let mut reg = v1_with_duration(minutes(5));
    reg.events.clear();
    let errors = options::at_least_one_event()
        .validate(&mut reg)
        .unwrap_err();
    assert!(errors.to_string().contains("zero events"));
    assert!(errors.any(|e| matches!(e, ValidationError::NoEvents)));
}

#[test]
fn regex_options() {
    let mut bad_events = v1_with_duration(minutes(5));
    bad_events.events = vec!["(unclosed".into(), "device-.*".into()];

    let mut bad_device = v1_with_duration(minutes(5));
    bad_device.matcher.device_id = vec!["mac:[a-".into()];

    let mut good_device = v1_with_duration(minutes(5));
    good_device.matcher.device_id = vec!["mac:112233.*".into()];

    run_cases(vec![
        Case {
            description: "event pattern does not compile",
            option: options::event_regex_must_compile(),
            registration: bad_events,
            describe: "EventRegexMustCompile()",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "event patterns compile",
            option: options::event_regex_must_compile(),
            registration: v1_with_duration(minutes(5)),
            describe: "EventRegexMustCompile()",
            expect: None,
        },
        Case {
            description: "device id pattern does not compile",
            option: options::device_id_regex_must_compile(),
            registration: bad_device,
            describe: "DeviceIDRegexMustCompile()",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "device id patterns compile",
            option: options::device_id_regex_must_compile(),
            registration: good_device,
            describe: "DeviceIDRegexMustCompile()",
            expect: None,
        },
    ]);
}

#[test]
fn one_failure_per_bad_pattern() {
    let mut reg = v1_with_duration(minutes(5));
    reg.events = vec!["(".into(), "ok".into(), "[z-a]".into()];
    let errors = options::event_regex_must_compile()
        .validate(&mut reg)
        .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ValidationError::EventPattern { .. })));
}

#[test]
fn registration_duration_bounds() {
    run_cases(vec![
        Case {
            description: "4m under a 5m bound",
            option: options::validate_registration_duration(Duration::minutes(5)),
            registration: v1_with_duration(minutes(4)),
            describe: "ValidateRegistrationDuration(5m)",
            expect: None,
        },
        Case {
            description: "5m at a 5m bound",
            option: options::validate_registration_duration(Duration::minutes(5)),
            registration: v1_with_duration(minutes(5)),
            describe: "ValidateRegistrationDuration(5m)",
            expect: None,
        },
        Case {
            description: "6m over a 5m bound",
            option: options::validate_registration_duration(Duration::minutes(5)),
            registration: v1_with_duration(minutes(6)),
            describe: "ValidateRegistrationDuration(5m)",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "zero bound is unbounded",
            option: options::validate_registration_duration(Duration::zero()),
            registration: v1_with_duration(minutes(60 * 24 * 365)),
            describe: "ValidateRegistrationDuration(0s)",
            expect: None,
        },
        Case {
            description: "negative bound is unbounded",
            option: options::validate_registration_duration(Duration::seconds(-1)),
            registration: v1_with_duration(minutes(600)),
            describe: "ValidateRegistrationDuration(-1s)",
            expect: None,
        },
        Case {
            description: "negative duration is under any bound",
            option: options::validate_registration_duration(Duration::minutes(5)),
            registration: v1_with_duration(minutes(-3)),
            describe: "ValidateRegistrationDuration(5m)",
            expect: None,
        },
    ]);
}

#[test]
fn duration_too_long_is_identifiable() {
    let mut reg = v1_with_duration(minutes(6));
    let errors = options::validate_registration_duration(Duration::minutes(5))
        .validate(&mut reg)
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.any(|e| matches!(e, ValidationError::DurationTooLong { .. })));
    assert!(errors.to_string().contains("too long"));
}

#[test]
fn exactly_one_lifetime_mechanism() {
    let opt = options::validate_registration_duration(Duration::hours(1));

    let mut neither = v1_with_duration(CustomDuration::ZERO);
    let errors = opt.validate(&mut neither).unwrap_err();
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryMissing)));
    assert!(errors.is(ErrorKind::InvalidInput));

    let mut both = v1_with_until(Utc::now() + Duration::minutes(10));
    both.duration = minutes(5);
    let errors = opt.validate(&mut both).unwrap_err();
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryConflict)));

    let mut only_duration = v1_with_duration(minutes(5));
    assert!(opt.validate(&mut only_duration).is_ok());

    let mut only_until = v1_with_until(Utc::now() + Duration::minutes(10));
    assert!(opt.validate(&mut only_until).is_ok());

    // A negative duration still counts as set.
    let mut negative_and_until = v1_with_until(Utc::now() + Duration::minutes(10));
    negative_and_until.duration = minutes(-1);
    let errors = opt.validate(&mut negative_and_until).unwrap_err();
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryConflict)));
}

#[test]
fn until_failures_are_joined() {
    let opt = options::validate_registration_duration(Duration::minutes(5));

    // Both set and already expired: two separate failures.
    let mut reg = v1_with_until(fixed_now());
    reg.duration = minutes(1);
    let errors = opt.validate(&mut reg).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryConflict)));
    assert!(errors.any(|e| matches!(e, ValidationError::AlreadyExpired { .. })));

    let mut too_far = v1_with_until(Utc::now() + Duration::hours(2));
    let errors = opt.validate(&mut too_far).unwrap_err();
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryTooLong { .. })));
}

#[test]
fn until_uses_the_registration_clock() {
    let opt = options::validate_registration_duration(Duration::minutes(5));
    let mut reg = v1_with_until(fixed_now() + Duration::minutes(5));
    assert!(opt.validate(&mut reg).is_err());

    reg.set_now_func(Some(fixed_clock()));
    assert!(opt.validate(&mut reg).is_ok());

    reg.until = Some(fixed_now() + Duration::minutes(5) + Duration::seconds(1));
    let errors = opt.validate(&mut reg).unwrap_err();
    assert!(errors.any(|e| matches!(e, ValidationError::ExpiryTooLong { .. })));
}

#[test]
fn expiry_bound() {
    let limit = fixed_now() + Duration::hours(1) + Duration::minutes(1);

    run_cases(vec![
        Case {
            description: "until at now + max + jitter",
            option: options::validate_until(
                Duration::minutes(1),
                Duration::hours(1),
                Some(fixed_clock()),
            ),
            registration: v1_with_until(limit),
            describe: "ValidateUntil(1m, 1h, func)",
            expect: None,
        },
        Case {
            description: "until past now + max + jitter",
            option: options::validate_until(
                Duration::minutes(1),
                Duration::hours(1),
                Some(fixed_clock()),
            ),
            registration: v1_with_until(limit + Duration::seconds(1)),
            describe: "ValidateUntil(1m, 1h, func)",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "no until passes trivially",
            option: options::validate_until(Duration::zero(), Duration::hours(1), None),
            registration: v1_with_duration(minutes(5)),
            describe: "ValidateUntil(0s, 1h, nil)",
            expect: None,
        },
        Case {
            description: "negative jitter",
            option: options::validate_until(Duration::minutes(-1), Duration::hours(1), None),
            registration: v1_with_duration(minutes(5)),
            describe: "ValidateUntil(-1m, 1h, nil)",
            expect: Some(ErrorKind::InvalidInput),
        },
    ]);
}

#[test]
fn expiry_bound_rejects_both_negative_bounds() {
    let mut reg = v1_with_duration(minutes(5));
    let errors = options::validate_until(Duration::seconds(-1), Duration::seconds(-1), None)
        .validate(&mut reg)
        .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ValidationError::NegativeBound { .. })));
}

#[test]
fn clock_option_sets_the_registration_clock() {
    let mut reg = v1_with_duration(minutes(5));
    let opt = options::provide_time_now_func(Some(fixed_clock()));
    assert_eq!(opt.describe(), "ProvideTimeNowFunc(func)");
    assert!(opt.validate(&mut reg).is_ok());
    assert_eq!(reg.now_func().map(|c| c.now()), Some(fixed_now()));

    let reset = options::provide_time_now_func(None);
    assert_eq!(reset.describe(), "ProvideTimeNowFunc(nil)");
    assert!(reset.validate(&mut reg).is_ok());
    assert!(reg.now_func().is_none());
}

#[test]
fn url_options() {
    let mut http_receiver = v1_with_duration(minutes(5));
    http_receiver.config.receiver_url = "http://hooks.acme.io/events".into();

    let mut malformed = v1_with_duration(minutes(5));
    malformed.config.receiver_url = "::not a url::".into();
    malformed.failure_url = "also not a url".into();
    malformed.config.alternative_urls = vec!["%%%".into()];

    let mut http_failure = v1_with_duration(minutes(5));
    http_failure.failure_url = "http://hooks.acme.io/failed".into();

    run_cases(vec![
        Case {
            description: "receiver url fails policy",
            option: options::provide_receiver_url_validator(Some(https_only())),
            registration: http_receiver,
            describe: "ProvideReceiverURLValidator(Checker{ OnlyAllowSchemes('https') })",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "receiver url passes policy",
            option: options::provide_receiver_url_validator(Some(https_only())),
            registration: v1_with_duration(minutes(5)),
            describe: "ProvideReceiverURLValidator(Checker{ OnlyAllowSchemes('https') })",
            expect: None,
        },
        Case {
            description: "nil receiver checker",
            option: options::provide_receiver_url_validator(None),
            registration: malformed.clone(),
            describe: "ProvideReceiverURLValidator(nil)",
            expect: None,
        },
        Case {
            description: "nil failure checker",
            option: options::provide_failure_url_validator(None),
            registration: malformed.clone(),
            describe: "ProvideFailureURLValidator(nil)",
            expect: None,
        },
        Case {
            description: "nil alternative checker",
            option: options::provide_alternative_url_validator(None),
            registration: malformed,
            describe: "ProvideAlternativeURLValidator(nil)",
            expect: None,
        },
        Case {
            description: "empty failure url is disabled",
            option: options::provide_failure_url_validator(Some(https_only())),
            registration: v1_with_duration(minutes(5)),
            describe: "ProvideFailureURLValidator(Checker{ OnlyAllowSchemes('https') })",
            expect: None,
        },
        Case {
            description: "failure url fails policy",
            option: options::provide_failure_url_validator(Some(https_only())),
            registration: http_failure,
            describe: "ProvideFailureURLValidator(Checker{ OnlyAllowSchemes('https') })",
            expect: Some(ErrorKind::InvalidInput),
        },
    ]);
}

#[test]
fn checker_reason_is_preserved() {
    let mut reg = v1_with_duration(minutes(5));
    reg.config.receiver_url = "http://hooks.acme.io/events".into();
    let errors = options::provide_receiver_url_validator(Some(https_only()))
        .validate(&mut reg)
        .unwrap_err();
    let error = errors.first().unwrap();
    assert!(matches!(error, ValidationError::ReceiverUrl { .. }));
    assert_eq!(
        error.url_error(),
        Some(&UrlError::SchemeNotAllowed {
            scheme: "http".into()
        })
    );
}

#[test]
fn one_failure_per_bad_alternative_url() {
    let mut reg = v1_with_duration(minutes(5));
    reg.config.alternative_urls = vec![
        "https://a.acme.io/events".into(),
        "http://b.acme.io/events".into(),
        "ftp://c.acme.io/events".into(),
    ];
    let errors = options::provide_alternative_url_validator(Some(https_only()))
        .validate(&mut reg)
        .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ValidationError::AlternativeUrl { .. })));
}

#[test]
fn no_until() {
    run_cases(vec![
        Case {
            description: "until present",
            option: options::no_until(),
            registration: v1_with_until(Utc::now() + Duration::minutes(5)),
            describe: "NoUntil()",
            expect: Some(ErrorKind::InvalidInput),
        },
        Case {
            description: "duration only",
            option: options::no_until(),
            registration: v1_with_duration(minutes(5)),
            describe: "NoUntil()",
            expect: None,
        },
    ]);
}
