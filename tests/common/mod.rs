//! Shared fixtures for the integration tests: a scripted name server,
//! scripted TLS endpoints and record builders.

#![allow(dead_code)] // Each test file uses a different subset

use async_trait::async_trait;
use paymail_inspector::{
    Inspector, InspectorConfig, InspectorError,
    dns::{
        DNSPacket,
        enums::DNSResourceType,
        resource::{DNSResource, DnskeyRdata, DsRdata, RData, SrvRdata},
    },
    dnssec::{DnskeyRecord, DsRecord},
    resolver::{ResolverConfig, Transport},
    ssl::TlsHandshake,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

/// Name server handed to the inspector
pub const RESOLVER: &str = "10.0.0.53:53";
/// Authoritative server of the `test` registry
pub const REGISTRY_NS_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
/// Authoritative server of the inspected domain
pub const DOMAIN_NS_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);

/// RFC 4034 section 5.4 example key for dskey.example.com.
pub const DSKEY_PUBLIC_KEY: &str = "AQOeiiR0GOMYkDshWoSKz9XzfwJr1AYtsmx3TGkJaNXVbfi/2pHm822aJ5iI9BMzNXxeYCmZDRD99WYwYqUSdjMmmAphXdvxegXd/M5+X7OrzKBaMbCVdFLUUh6DhweJBjEVv5f2wwjM9XzcnOf+EPbtG9DMBmADjFDc2w/rljwvFw==";

type Key = (SocketAddr, String, DNSResourceType);

enum Reply {
    Records(Vec<DNSResource>),
    Rcode(u8),
    Fail(InspectorError),
}

/// Scripted name servers keyed by (server, query name, query type).
///
/// Unscripted questions get an empty NOERROR answer. Responses travel
/// through the wire codec so parsing is exercised too.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<Key, Reply>>,
    log: Mutex<Vec<Key>>,
}

fn key(server: SocketAddr, name: &str, qtype: DNSResourceType) -> Key {
    (
        server,
        name.trim_end_matches('.').to_ascii_lowercase(),
        qtype,
    )
}

pub fn resolver_addr() -> SocketAddr {
    RESOLVER.parse().unwrap()
}

pub fn at(ip: Ipv4Addr) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(ip), 53)
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(
        &self,
        server: SocketAddr,
        name: &str,
        qtype: DNSResourceType,
        records: Vec<DNSResource>,
    ) {
        self.replies
            .lock()
            .unwrap()
            .insert(key(server, name, qtype), Reply::Records(records));
    }

    pub fn rcode(&self, server: SocketAddr, name: &str, qtype: DNSResourceType, rcode: u8) {
        self.replies
            .lock()
            .unwrap()
            .insert(key(server, name, qtype), Reply::Rcode(rcode));
    }

    pub fn fail(&self, server: SocketAddr, name: &str, qtype: DNSResourceType, err: InspectorError) {
        self.replies
            .lock()
            .unwrap()
            .insert(key(server, name, qtype), Reply::Fail(err));
    }

    /// Every (server, name, type) asked so far, in order
    pub fn queries(&self) -> Vec<Key> {
        self.log.lock().unwrap().clone()
    }

    pub fn was_asked(&self, server: SocketAddr, name: &str, qtype: DNSResourceType) -> bool {
        self.queries().contains(&key(server, name, qtype))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn exchange(
        &self,
        config: &ResolverConfig,
        query: &DNSPacket,
    ) -> Result<DNSPacket, InspectorError> {
        let question = &query.questions[0];
        let key = key(config.name_server, &question.name, question.qtype);
        self.log.lock().unwrap().push(key.clone());

        let mut response = DNSPacket {
            header: query.header.clone(),
            questions: query.questions.clone(),
            ..Default::default()
        };
        response.header.qr = true;
        response.header.ra = true;

        match self.replies.lock().unwrap().get(&key) {
            Some(Reply::Records(records)) => response.answers = records.clone(),
            Some(Reply::Rcode(rcode)) => response.header.rcode = *rcode,
            Some(Reply::Fail(err)) => return Err(err.clone()),
            None => {}
        }

        let wire = response
            .serialize()
            .map_err(|e| InspectorError::Malformed(e.to_string()))?;
        DNSPacket::parse(&wire).map_err(|e| InspectorError::Malformed(e.to_string()))
    }
}

/// TLS endpoints that accept every handshake unless told otherwise
#[derive(Default)]
pub struct FakeTls {
    rejected: Mutex<HashMap<IpAddr, String>>,
    silent: Mutex<Vec<IpAddr>>,
    log: Mutex<Vec<(String, SocketAddr)>>,
}

impl FakeTls {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handshakes with `ip` fail with `reason`
    pub fn reject(&self, ip: IpAddr, reason: &str) {
        self.rejected.lock().unwrap().insert(ip, reason.to_string());
    }

    /// Handshakes with `ip` never complete
    pub fn hang(&self, ip: IpAddr) {
        self.silent.lock().unwrap().push(ip);
    }

    /// Every (host, address) dialled so far, in order
    pub fn handshakes(&self) -> Vec<(String, SocketAddr)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl TlsHandshake for FakeTls {
    async fn handshake(&self, host: &str, address: SocketAddr) -> Result<(), InspectorError> {
        self.log.lock().unwrap().push((host.to_string(), address));

        let silent = self.silent.lock().unwrap().contains(&address.ip());
        if silent {
            std::future::pending::<()>().await;
        }

        let rejected = self.rejected.lock().unwrap().get(&address.ip()).cloned();
        match rejected {
            Some(reason) => Err(InspectorError::Tls {
                address: address.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

pub fn config() -> InspectorConfig {
    let mut config = InspectorConfig::default();
    config.resolver.name_server = resolver_addr();
    config
}

pub fn inspector(fake: &Arc<FakeTransport>) -> Inspector {
    inspector_with_tls(fake, &FakeTls::new())
}

pub fn inspector_with_tls(fake: &Arc<FakeTransport>, tls: &Arc<FakeTls>) -> Inspector {
    Inspector::with_transport(config(), fake.clone()).with_tls(tls.clone())
}

pub fn aaaa(host: &str, ip: std::net::Ipv6Addr) -> DNSResource {
    DNSResource::new(host, 3600, RData::AAAA(ip))
}

pub fn srv(owner: &str, target: &str, port: u16, priority: u16, weight: u16) -> DNSResource {
    DNSResource::new(
        owner,
        3600,
        RData::SRV(SrvRdata {
            priority,
            weight,
            port,
            target: target.trim_end_matches('.').to_string(),
        }),
    )
}

pub fn cname(owner: &str, target: &str) -> DNSResource {
    DNSResource::new(
        owner,
        3600,
        RData::CNAME(target.trim_end_matches('.').to_string()),
    )
}

pub fn ns(zone: &str, host: &str) -> DNSResource {
    DNSResource::new(zone, 3600, RData::NS(host.trim_end_matches('.').to_string()))
}

pub fn a(host: &str, ip: Ipv4Addr) -> DNSResource {
    DNSResource::new(host, 3600, RData::A(ip))
}

pub fn ds(owner: &str, record: &DsRecord) -> DNSResource {
    DNSResource::new(
        owner,
        3600,
        RData::DS(DsRdata {
            key_tag: record.key_tag,
            algorithm: record.algorithm,
            digest_type: record.digest_type,
            digest: hex::decode(&record.digest).unwrap(),
        }),
    )
}

pub fn dnskey(owner: &str, record: &DnskeyRecord) -> DNSResource {
    let rdata: DnskeyRdata = record.to_rdata().unwrap();
    DNSResource::new(owner, 3600, RData::DNSKEY(rdata))
}

/// Zone signing key with algorithm 8 and the given base64 public key
pub fn rsa_key(public_key: &str) -> DnskeyRecord {
    DnskeyRecord {
        algorithm: 8,
        flags: 257,
        protocol: 3,
        public_key: public_key.to_string(),
        calculated_ds: None,
    }
}

/// Delegate `domain` under the `test` registry: NS and address records on
/// the resolver, DS on the registry server, DNSKEY on the domain server.
pub fn delegate(fake: &FakeTransport, domain: &str, ds_set: &[DsRecord], keys: &[DnskeyRecord]) {
    let resolver = resolver_addr();
    fake.answer(resolver, "test", DNSResourceType::NS, vec![ns("test", "ns.registry.test")]);
    fake.answer(
        resolver,
        "ns.registry.test",
        DNSResourceType::A,
        vec![a("ns.registry.test", REGISTRY_NS_IP)],
    );

    let domain_ns = format!("ns1.{}", domain);
    fake.answer(resolver, domain, DNSResourceType::NS, vec![ns(domain, &domain_ns)]);
    fake.answer(
        resolver,
        &domain_ns,
        DNSResourceType::A,
        vec![a(&domain_ns, DOMAIN_NS_IP)],
    );

    fake.answer(
        at(REGISTRY_NS_IP),
        domain,
        DNSResourceType::DS,
        ds_set.iter().map(|record| ds(domain, record)).collect(),
    );
    fake.answer(
        at(DOMAIN_NS_IP),
        domain,
        DNSResourceType::DNSKEY,
        keys.iter().map(|key| dnskey(domain, key)).collect(),
    );
}
