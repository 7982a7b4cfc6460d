mod common;

use common::*;
use paymail_inspector::dns::enums::DNSResourceType;
use paymail_inspector::psl::PublicSuffixList;
use paymail_inspector::{InspectOptions, InspectorError};
use std::net::Ipv4Addr;
use std::sync::Arc;

const ZSK: &str = "AwEAAT3AsJsyHZvnywwh27MmhCL8jXN+zMABExbTmhM+iGirR8ifWab0eXOjkCl8SJNAFtcceLfV8zKpb31qSsfTLvA9wLCbMh2b58sMIduzJoQi/I1zfszAARMW05oTPohoq0fIn1mm9Hlzo5ApfEiTQBbXHHi31fMyqW99akrH0y7w";

/// `paymail.test` points its SRV record at `pm.host.test`; `host.test` is signed
fn hosted_paymail(port: u16) -> Arc<FakeTransport> {
    let fake = FakeTransport::new();
    let owner = "_bsvalias._tcp.paymail.test";
    fake.answer(
        resolver_addr(),
        owner,
        DNSResourceType::SRV,
        vec![srv(owner, "pm.host.test.", port, 10, 10)],
    );
    fake.answer(
        resolver_addr(),
        "pm.host.test",
        DNSResourceType::A,
        vec![a("pm.host.test", Ipv4Addr::new(203, 0, 113, 7))],
    );

    let key = rsa_key(ZSK);
    let ds = key.calculate_ds("host.test.", 2).unwrap();
    delegate(&fake, "host.test", &[ds], &[key]);
    fake
}

#[tokio::test]
async fn test_validate_checks_dnssec_on_srv_target() {
    let fake = hosted_paymail(443);

    let report = inspector(&fake)
        .inspect("paymail.test", InspectOptions::default())
        .await
        .unwrap();

    assert_eq!(report.domain, "paymail.test");
    assert_eq!(report.srv_passed(), Some(true));
    assert_eq!(report.srv.as_ref().unwrap().record.as_ref().unwrap().target, "pm.host.test");

    let dnssec = report.dnssec.as_ref().unwrap();
    assert_eq!(dnssec.domain, "host.test");
    assert!(dnssec.dnssec_valid);
    // SSL uses the full target host, not its registrable name
    assert_eq!(report.ssl.as_ref().unwrap().host, "pm.host.test");
    assert_eq!(report.ssl_passed(), Some(true));
    assert!(report.is_success());
}

#[tokio::test]
async fn test_srv_failure_keeps_dnssec_result() {
    let fake = hosted_paymail(8443);

    let report = inspector(&fake)
        .inspect("paymail.test", InspectOptions::default())
        .await
        .unwrap();

    let srv = report.srv.as_ref().unwrap();
    assert_eq!(srv.error.as_deref(), Some("port 8443 does not match 443"));
    assert!(!srv.network_error);
    // The record was found, so DNSSEC still follows its target
    assert_eq!(report.dnssec_passed(), Some(true));
    assert_eq!(report.dnssec.as_ref().unwrap().domain, "host.test");
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_paymail_address_input() {
    let fake = hosted_paymail(443);

    let report = inspector(&fake)
        .inspect(
            " Satoshi@PayMail.test ",
            InspectOptions {
                skip_dnssec: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.paymail_address.as_deref(), Some("satoshi@paymail.test"));
    assert_eq!(report.domain, "paymail.test");
    assert!(report.dnssec.is_none());
    assert!(report.is_success());
}

#[tokio::test]
async fn test_skip_srv_checks_domain_itself() {
    let fake = FakeTransport::new();
    delegate(&fake, "paymail.test", &[], &[]);

    let report = inspector(&fake)
        .inspect(
            "paymail.test",
            InspectOptions {
                skip_srv: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(report.srv.is_none());
    let dnssec = report.dnssec.as_ref().unwrap();
    assert_eq!(dnssec.domain, "paymail.test");
    assert!(!dnssec.dnssec_valid);
    assert!(!report.is_success());
    assert!(!fake.was_asked(
        resolver_addr(),
        "_bsvalias._tcp.paymail.test",
        DNSResourceType::SRV
    ));
}

#[tokio::test]
async fn test_missing_srv_falls_back_to_domain() {
    let fake = FakeTransport::new();
    delegate(&fake, "paymail.test", &[], &[]);

    let report = inspector(&fake)
        .inspect("paymail.test", InspectOptions::default())
        .await
        .unwrap();

    let srv = report.srv.as_ref().unwrap();
    assert!(srv.record.is_none());
    assert_eq!(
        srv.error.as_deref(),
        Some("zero SRV records found using: _bsvalias._tcp.paymail.test.")
    );
    assert_eq!(report.dnssec.as_ref().unwrap().domain, "paymail.test");
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_query() {
    let fake = FakeTransport::new();

    let err = inspector(&fake)
        .inspect("not a domain", InspectOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, InspectorError::InvalidDomain { .. }));
    assert!(fake.queries().is_empty());
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let fake = hosted_paymail(443);

    let report = inspector(&fake)
        .inspect("paymail.test", InspectOptions::default())
        .await
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["domain"], "paymail.test");
    assert_eq!(json["srv"]["record"]["port"], 443);
    assert_eq!(json["dnssec"]["dnssec_valid"], true);
    assert_eq!(json["dnssec"]["nsec"]["type"], "none");
    assert_eq!(json["ssl"]["valid"], true);
    assert_eq!(json["ssl"]["addresses"][0], "203.0.113.7");
    assert!(json["dnssec"]["checked_at"].is_string());
    assert_eq!(
        json["dnssec"]["ds_records"][0]["digest"],
        json["dnssec"]["dnskey_records"][0]["calculated_ds"]["digest"]
    );
}

#[tokio::test]
async fn test_custom_public_suffix_list() {
    let fake = hosted_paymail(443);
    // With `host.test` as a suffix, the target host is its own registrable name
    let key = rsa_key(ZSK);
    let published = key.calculate_ds("pm.host.test.", 2).unwrap();
    delegate(&fake, "pm.host.test", &[], &[key]);
    // The parent of pm.host.test is now host.test, served by its own name server
    fake.answer(
        at(DOMAIN_NS_IP),
        "pm.host.test",
        DNSResourceType::DS,
        vec![ds("pm.host.test", &published)],
    );
    let mut psl = PublicSuffixList::default();
    psl.load_from_string("test\nhost.test\n");
    let tls = FakeTls::new();

    let report = inspector_with_tls(&fake, &tls)
        .with_public_suffix_list(Arc::new(psl))
        .inspect("paymail.test", InspectOptions::default())
        .await
        .unwrap();

    let dnssec = report.dnssec.as_ref().unwrap();
    assert_eq!(dnssec.domain, "pm.host.test");
    assert!(dnssec.dnssec_valid);
    // The TLS seam survives the swap
    assert_eq!(tls.handshakes().len(), 1);
}
