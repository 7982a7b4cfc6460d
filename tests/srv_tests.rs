mod common;

use common::*;
use paymail_inspector::InspectorError;
use paymail_inspector::dns::constants::DNSRcode;
use paymail_inspector::dns::enums::DNSResourceType;
use paymail_inspector::resolver::{CustomResolver, ResolverConfig};
use paymail_inspector::srv::{ExpectedServiceProfile, ServiceRecord, discover_srv, validate_srv};
use std::net::Ipv4Addr;
use std::sync::Arc;

const OWNER: &str = "_bsvalias._tcp.paymail.test";

fn resolver(fake: &Arc<FakeTransport>) -> CustomResolver {
    CustomResolver::with_transport(ResolverConfig::new(resolver_addr(), Default::default()), fake.clone())
}

fn record(port: u16, priority: u16, weight: u16) -> ServiceRecord {
    ServiceRecord {
        target: "pm.paymail.test".to_string(),
        port,
        priority,
        weight,
    }
}

fn fake_with_target() -> Arc<FakeTransport> {
    let fake = FakeTransport::new();
    fake.answer(
        resolver_addr(),
        "pm.paymail.test",
        DNSResourceType::A,
        vec![a("pm.paymail.test", Ipv4Addr::new(203, 0, 113, 10))],
    );
    fake
}

#[tokio::test]
async fn test_discover_and_validate_compliant_record() {
    let fake = fake_with_target();
    fake.answer(
        resolver_addr(),
        OWNER,
        DNSResourceType::SRV,
        vec![srv(OWNER, "pm.paymail.test.", 443, 10, 10)],
    );
    let resolver = resolver(&fake);
    let profile = ExpectedServiceProfile::default();

    let found = discover_srv(&resolver, &profile, "paymail.test").await.unwrap();
    assert_eq!(found, record(443, 10, 10));
    assert_eq!(found.target_fqdn(), "pm.paymail.test.");

    validate_srv(&resolver, Some(&found), &profile).await.unwrap();
    assert!(fake.was_asked(resolver_addr(), "pm.paymail.test", DNSResourceType::A));
}

#[tokio::test]
async fn test_wrong_port_is_reported_with_both_values() {
    let fake = fake_with_target();
    fake.answer(
        resolver_addr(),
        "_bsvalias._tcp.broken.test",
        DNSResourceType::SRV,
        vec![srv("_bsvalias._tcp.broken.test", "pm.paymail.test", 8443, 10, 10)],
    );
    let resolver = resolver(&fake);
    let profile = ExpectedServiceProfile::default();

    let found = discover_srv(&resolver, &profile, "broken.test").await.unwrap();
    let err = validate_srv(&resolver, Some(&found), &profile).await.unwrap_err();

    assert_eq!(err.to_string(), "port 8443 does not match 443");
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_each_field_off_by_one_is_rejected() {
    let fake = fake_with_target();
    let resolver = resolver(&fake);
    let profile = ExpectedServiceProfile::default();

    let cases = [
        (record(444, 10, 10), "port", 444, 443),
        (record(442, 10, 10), "port", 442, 443),
        (record(443, 11, 10), "priority", 11, 10),
        (record(443, 9, 10), "priority", 9, 10),
        (record(443, 10, 11), "weight", 11, 10),
        (record(443, 10, 9), "weight", 9, 10),
    ];

    for (candidate, field, actual, expected) in cases {
        let err = validate_srv(&resolver, Some(&candidate), &profile)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InspectorError::FieldMismatch {
                field,
                actual,
                expected
            }
        );
    }
}

#[tokio::test]
async fn test_port_is_checked_before_priority_and_weight() {
    let fake = fake_with_target();
    let err = validate_srv(&resolver(&fake), Some(&record(80, 0, 5)), &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InspectorError::FieldMismatch { field: "port", .. }));
}

#[tokio::test]
async fn test_two_records_violate_cardinality() {
    let fake = FakeTransport::new();
    fake.answer(
        resolver_addr(),
        OWNER,
        DNSResourceType::SRV,
        vec![
            srv(OWNER, "pm1.paymail.test", 443, 10, 10),
            srv(OWNER, "pm2.paymail.test", 443, 10, 10),
        ],
    );

    let err = discover_srv(&resolver(&fake), &Default::default(), "paymail.test")
        .await
        .unwrap_err();
    assert_eq!(err, InspectorError::TooManyRecords { max: 1, found: 2 });
    assert_eq!(
        err.to_string(),
        "only 1 SRV record(s) should exist, found 2 records"
    );
}

#[tokio::test]
async fn test_max_records_is_configurable() {
    let fake = FakeTransport::new();
    fake.answer(
        resolver_addr(),
        OWNER,
        DNSResourceType::SRV,
        vec![
            srv(OWNER, "pm1.paymail.test", 443, 10, 10),
            srv(OWNER, "pm2.paymail.test", 443, 10, 10),
        ],
    );
    let profile = ExpectedServiceProfile {
        max_records: 2,
        ..Default::default()
    };

    let found = discover_srv(&resolver(&fake), &profile, "paymail.test")
        .await
        .unwrap();
    assert_eq!(found.target, "pm1.paymail.test");
}

#[tokio::test]
async fn test_canonical_name_mismatch() {
    let fake = FakeTransport::new();
    fake.answer(
        resolver_addr(),
        OWNER,
        DNSResourceType::SRV,
        vec![
            cname(OWNER, "_bsvalias._tcp.provider.test"),
            srv("_bsvalias._tcp.provider.test", "pm.provider.test", 443, 10, 10),
        ],
    );

    let err = discover_srv(&resolver(&fake), &Default::default(), "paymail.test")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InspectorError::CanonicalNameMismatch {
            expected: "_bsvalias._tcp.paymail.test.".to_string(),
            actual: "_bsvalias._tcp.provider.test.".to_string(),
        }
    );
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_zero_records() {
    let fake = FakeTransport::new();
    fake.rcode(resolver_addr(), OWNER, DNSResourceType::SRV, DNSRcode::NXDOMAIN);

    let err = discover_srv(&resolver(&fake), &Default::default(), "paymail.test")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "zero SRV records found using: _bsvalias._tcp.paymail.test."
    );
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_network_failure_is_not_a_protocol_violation() {
    let fake = FakeTransport::new();
    fake.fail(
        resolver_addr(),
        OWNER,
        DNSResourceType::SRV,
        InspectorError::Io("connection refused".to_string()),
    );

    let err = discover_srv(&resolver(&fake), &Default::default(), "paymail.test")
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert!(!err.is_protocol_violation());
}

#[tokio::test]
async fn test_unresolvable_target() {
    let fake = FakeTransport::new();
    let err = validate_srv(&resolver(&fake), Some(&record(443, 10, 10)), &Default::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InspectorError::TargetUnresolvable("pm.paymail.test.".to_string())
    );
}

#[tokio::test]
async fn test_target_resolves_when_only_ipv6_lookup_fails() {
    let fake = fake_with_target();
    fake.rcode(
        resolver_addr(),
        "pm.paymail.test",
        DNSResourceType::AAAA,
        DNSRcode::SERVFAIL,
    );

    validate_srv(&resolver(&fake), Some(&record(443, 10, 10)), &Default::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_address_lookup_error_surfaces_when_nothing_resolves() {
    let fake = FakeTransport::new();
    fake.rcode(
        resolver_addr(),
        "pm.paymail.test",
        DNSResourceType::AAAA,
        DNSRcode::SERVFAIL,
    );

    let err = validate_srv(&resolver(&fake), Some(&record(443, 10, 10)), &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InspectorError::ServerFailure { rcode: 2, .. }));
    assert!(err.is_network());
}

#[tokio::test]
async fn test_caller_mistakes() {
    let fake = FakeTransport::new();
    let resolver = resolver(&fake);

    let no_service = ExpectedServiceProfile {
        service: String::new(),
        ..Default::default()
    };
    let err = discover_srv(&resolver, &no_service, "paymail.test").await.unwrap_err();
    assert!(err.is_configuration());

    let long_domain = format!("{}.test", "a".repeat(260));
    let err = discover_srv(&resolver, &Default::default(), &long_domain)
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = validate_srv(&resolver, None, &Default::default()).await.unwrap_err();
    assert!(err.is_configuration());

    let empty_target = ServiceRecord {
        target: ".".to_string(),
        ..record(443, 10, 10)
    };
    let err = validate_srv(&resolver, Some(&empty_target), &Default::default())
        .await
        .unwrap_err();
    assert_eq!(err, InspectorError::EmptyTarget);

    let zero_weight = ExpectedServiceProfile {
        weight: 0,
        ..Default::default()
    };
    let err = validate_srv(&resolver, Some(&record(443, 10, 10)), &zero_weight)
        .await
        .unwrap_err();
    assert_eq!(err, InspectorError::InvalidParameter("weight"));

    // Nothing reached the name server
    assert!(fake.queries().is_empty());
}
