use super::errors::{DnsSecError, Result};
use super::matching::{annotate_calculated_ds, match_keys};
use super::records::{DnskeyRecord, DnssecResult, DsRecord, NsecInfo};
use crate::dns::constants::DNS_PORT;
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::RData;
use crate::error::InspectorError;
use crate::psl::PublicSuffixList;
use crate::resolver::CustomResolver;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Denial-of-existence types probed, in order
const NSEC_PROBES: [DNSResourceType; 3] = [
    DNSResourceType::NSEC,
    DNSResourceType::NSEC3,
    DNSResourceType::NSEC3PARAM,
];

/// Single-hop DNSSEC check: the parent zone's DS set against the
/// digests recomputed from the child zone's DNSKEY set.
#[derive(Debug, Clone)]
pub struct DnssecChainValidator {
    resolver: CustomResolver,
    psl: Arc<PublicSuffixList>,
    known_issues: Vec<String>,
}

impl DnssecChainValidator {
    /// `resolver` is the caller-supplied name server; authoritative servers
    /// found during the walk are queried with the same network and timeout.
    pub fn new(
        resolver: CustomResolver,
        psl: Arc<PublicSuffixList>,
        known_issues: Vec<String>,
    ) -> Self {
        Self {
            resolver,
            psl,
            known_issues,
        }
    }

    /// Check `domain`. Never fails: problems are recorded on the result.
    pub async fn validate(&self, domain: &str) -> DnssecResult {
        let mut result = DnssecResult::new(domain.trim());

        let registrable = match self.registrable_name(domain) {
            Ok(name) => name,
            Err(e) => {
                warn!("DNSSEC check skipped: {}", e);
                result.fail(e);
                return result;
            }
        };
        result.domain = registrable.clone();

        if let Err(e) = self.check_known_issues(&registrable) {
            info!("{}", e);
            result.fail(e);
            return result;
        }

        if let Err(e) = self.walk(&registrable, &mut result).await {
            warn!("DNSSEC check for {} failed: {}", registrable, e);
            result.fail(e);
            return result;
        }

        result.nsec = self.probe_nsec(&registrable).await;

        info!(
            "DNSSEC for {}: {} DS, {} DNSKEY, {} matching, valid={}",
            registrable,
            result.ds_record_count(),
            result.dnskey_record_count(),
            result.matching_pairs.len(),
            result.dnssec_valid
        );
        result
    }

    /// IDNA to ASCII, then reduce to the registrable name (eTLD+1)
    pub fn registrable_name(&self, domain: &str) -> Result<String> {
        let trimmed = domain.trim().trim_end_matches('.');
        let ascii = idna::domain_to_ascii(trimmed)
            .map_err(|_| DnsSecError::InvalidDomain(domain.to_string()))?;
        self.psl
            .registrable_domain(&ascii)
            .ok_or_else(|| DnsSecError::InvalidDomain(domain.to_string()))
    }

    fn check_known_issues(&self, domain: &str) -> Result<()> {
        let issue = self
            .known_issues
            .iter()
            .find(|issue| !issue.is_empty() && domain.contains(issue.as_str()));

        match issue {
            Some(issue) => Err(DnsSecError::KnownIssue {
                domain: domain.to_string(),
                issue: issue.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn walk(&self, domain: &str, result: &mut DnssecResult) -> Result<()> {
        let suffix = self
            .psl
            .public_suffix(domain)
            .ok_or_else(|| DnsSecError::InvalidDomain(domain.to_string()))?;

        let registry = self.authoritative_resolver(&suffix).await?;
        let authority = self.authoritative_resolver(domain).await?;

        let owner = format!("{}.", domain);
        result.ds_records = registry
            .lookup_ds(&owner)
            .await?
            .iter()
            .map(DsRecord::from)
            .collect();
        result.dnskey_records = authority
            .lookup_dnskey(&owner)
            .await?
            .iter()
            .map(DnskeyRecord::from)
            .collect();

        if result.ds_records.is_empty() || result.dnskey_records.is_empty() {
            debug!(
                "{} is not DNSSEC protected ({} DS, {} DNSKEY)",
                domain,
                result.ds_record_count(),
                result.dnskey_record_count()
            );
            return Ok(());
        }

        let digest_type = result.ds_records[0].digest_type;
        annotate_calculated_ds(&owner, &mut result.dnskey_records, digest_type);
        result.matching_pairs = match_keys(&result.ds_records, &result.dnskey_records);
        result.dnssec_valid = !result.matching_pairs.is_empty();
        Ok(())
    }

    /// Resolver pinned to the first name server of `zone`
    async fn authoritative_resolver(&self, zone: &str) -> Result<CustomResolver> {
        let hosts = self.resolver.lookup_ns(&format!("{}.", zone)).await?;
        let host = hosts
            .into_iter()
            .next()
            .ok_or_else(|| InspectorError::NoNameServer(zone.to_string()))?;

        let address = self
            .resolver
            .lookup_ip(&format!("{}.", host))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InspectorError::NoAddress(host.clone()))?;

        debug!("Name server for {}: {} ({})", zone, host, address);
        Ok(self
            .resolver
            .for_name_server(SocketAddr::new(address, DNS_PORT)))
    }

    async fn probe_nsec(&self, domain: &str) -> NsecInfo {
        let owner = format!("{}.", domain);

        for qtype in NSEC_PROBES {
            let found = match self.resolver.lookup_first(&owner, qtype).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("{} probe for {} failed: {}", qtype, domain, e);
                    continue;
                }
            };

            let info = match found {
                Some(RData::NSEC(nsec)) => NsecInfo::from(&nsec),
                Some(RData::NSEC3(nsec3)) => NsecInfo::from(&nsec3),
                Some(RData::NSEC3PARAM(param)) => NsecInfo::from(&param),
                _ => continue,
            };
            debug!("{} has {}", domain, info);
            return info;
        }

        NsecInfo::Absent
    }
}
