//! Host discovery: the SRV record a paymail domain publishes at
//! `_bsvalias._tcp.<domain>.`, and its validation against the expected
//! service profile.

use crate::dns::resource::SrvRdata;
use crate::error::{InspectorError, Result};
use crate::resolver::CustomResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Default SRV service name
pub const DEFAULT_SERVICE: &str = "bsvalias";
/// Default SRV protocol
pub const DEFAULT_PROTOCOL: &str = "tcp";
/// Expected port of the discovery target
pub const DEFAULT_PORT: u16 = 443;
/// Expected SRV priority
pub const DEFAULT_PRIORITY: u16 = 10;
/// Expected SRV weight
pub const DEFAULT_WEIGHT: u16 = 10;
/// Host discovery allows a single SRV record per domain
pub const MAX_SRV_RECORDS: usize = 1;

/// Longest domain accepted for discovery
const MAX_DOMAIN_LEN: usize = 255;

/// A discovered SRV record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub target: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

impl From<SrvRdata> for ServiceRecord {
    fn from(srv: SrvRdata) -> Self {
        Self {
            target: srv.target,
            port: srv.port,
            priority: srv.priority,
            weight: srv.weight,
        }
    }
}

impl ServiceRecord {
    /// Target as an absolute name (trailing dot)
    pub fn target_fqdn(&self) -> String {
        format!("{}.", self.target.trim_end_matches('.'))
    }
}

impl fmt::Display for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} --priority {} --weight {}",
            self.target_fqdn(),
            self.port,
            self.priority,
            self.weight
        )
    }
}

/// What a compliant SRV record must look like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedServiceProfile {
    pub service: String,
    pub protocol: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
    /// Maximum number of SRV records a domain may publish
    pub max_records: usize,
}

impl Default for ExpectedServiceProfile {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            port: DEFAULT_PORT,
            priority: DEFAULT_PRIORITY,
            weight: DEFAULT_WEIGHT,
            max_records: MAX_SRV_RECORDS,
        }
    }
}

impl ExpectedServiceProfile {
    /// Owner name queried for `domain`: `_<service>._<protocol>.<domain>.`
    pub fn owner_name(&self, domain: &str) -> String {
        format!(
            "_{}._{}.{}.",
            self.service,
            normalize_protocol(&self.protocol),
            domain.trim_end_matches('.')
        )
    }
}

fn normalize_protocol(protocol: &str) -> String {
    protocol.trim().to_lowercase()
}

/// Fetch the single SRV record `domain` publishes for the profile's service.
pub async fn discover_srv(
    resolver: &CustomResolver,
    profile: &ExpectedServiceProfile,
    domain: &str,
) -> Result<ServiceRecord> {
    if profile.service.is_empty() {
        return Err(InspectorError::InvalidParameter("service"));
    }
    let protocol = normalize_protocol(&profile.protocol);
    if protocol.is_empty() {
        return Err(InspectorError::InvalidParameter("protocol"));
    }
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err(InspectorError::InvalidParameter("name"));
    }

    let expected_cname = profile.owner_name(domain);
    let (cname, records) = resolver
        .lookup_srv(&profile.service, &protocol, domain)
        .await?;
    debug!(
        "SRV lookup for {} returned {} record(s), canonical name {}",
        expected_cname,
        records.len(),
        cname
    );

    if records.is_empty() {
        return Err(InspectorError::NoRecordFound(expected_cname));
    }

    if records.len() > profile.max_records {
        return Err(InspectorError::TooManyRecords {
            max: profile.max_records,
            found: records.len(),
        });
    }

    if cname != expected_cname {
        return Err(InspectorError::CanonicalNameMismatch {
            expected: expected_cname,
            actual: cname,
        });
    }

    let record = ServiceRecord::from(records.into_iter().next().ok_or_else(|| {
        InspectorError::NoRecordFound(profile.owner_name(domain))
    })?);
    info!("SRV target: {}", record);
    Ok(record)
}

/// Check a record against the profile and confirm its target resolves.
///
/// Rules are applied in order and the first failure is returned.
pub async fn validate_srv(
    resolver: &CustomResolver,
    record: Option<&ServiceRecord>,
    expected: &ExpectedServiceProfile,
) -> Result<()> {
    let record = record.ok_or(InspectorError::InvalidParameter(
        "srv is missing or nil",
    ))?;
    if record.target.trim_end_matches('.').is_empty() {
        return Err(InspectorError::EmptyTarget);
    }

    if expected.port == 0 {
        return Err(InspectorError::InvalidParameter("port"));
    }
    if expected.priority == 0 {
        return Err(InspectorError::InvalidParameter("priority"));
    }
    if expected.weight == 0 {
        return Err(InspectorError::InvalidParameter("weight"));
    }

    for (field, actual, wanted) in [
        ("port", record.port, expected.port),
        ("priority", record.priority, expected.priority),
        ("weight", record.weight, expected.weight),
    ] {
        if actual != wanted {
            return Err(InspectorError::FieldMismatch {
                field,
                actual,
                expected: wanted,
            });
        }
    }

    let addresses = resolver.lookup_ip(&record.target_fqdn()).await?;
    if addresses.is_empty() {
        return Err(InspectorError::TargetUnresolvable(record.target_fqdn()));
    }

    debug!(
        "SRV target {} resolves to {} address(es)",
        record.target_fqdn(),
        addresses.len()
    );
    Ok(())
}
