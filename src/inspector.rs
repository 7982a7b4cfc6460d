use crate::config::InspectorConfig;
use crate::dnssec::{DnssecChainValidator, DnssecResult};
use crate::error::Result;
use crate::input::{extract_parts, validate_domain};
use crate::psl::PublicSuffixList;
use crate::report::{InspectionReport, SrvOutcome};
use crate::resolver::{CustomResolver, Transport};
use crate::srv::{discover_srv, validate_srv};
use crate::ssl::{RustlsHandshake, SslOutcome, TlsHandshake, check_ssl};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Which checks [`Inspector::inspect`] runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    pub skip_srv: bool,
    pub skip_dnssec: bool,
    pub skip_ssl: bool,
}

/// Runs SRV, DNSSEC and SSL checks for one domain at a time with a single
/// resolver configuration.
#[derive(Clone)]
pub struct Inspector {
    config: InspectorConfig,
    resolver: CustomResolver,
    dnssec: DnssecChainValidator,
    tls: Arc<dyn TlsHandshake>,
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Inspector {
    pub fn new(config: InspectorConfig) -> Self {
        let resolver = CustomResolver::new(config.resolver.clone());
        Self::build(config, resolver, Arc::new(PublicSuffixList::bundled()))
    }

    /// Inspector whose queries go through `transport`
    pub fn with_transport(config: InspectorConfig, transport: Arc<dyn Transport>) -> Self {
        let resolver = CustomResolver::with_transport(config.resolver.clone(), transport);
        Self::build(config, resolver, Arc::new(PublicSuffixList::bundled()))
    }

    /// Replace the bundled public suffix rules
    pub fn with_public_suffix_list(self, psl: Arc<PublicSuffixList>) -> Self {
        let tls = Arc::clone(&self.tls);
        Self::build(self.config, self.resolver, psl).with_tls(tls)
    }

    /// Inspector whose certificate checks go through `tls`
    pub fn with_tls(mut self, tls: Arc<dyn TlsHandshake>) -> Self {
        self.tls = tls;
        self
    }

    fn build(config: InspectorConfig, resolver: CustomResolver, psl: Arc<PublicSuffixList>) -> Self {
        let dnssec = DnssecChainValidator::new(resolver.clone(), psl, config.known_issues.clone());
        Self {
            config,
            resolver,
            dnssec,
            tls: Arc::new(RustlsHandshake),
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Discover the SRV record of `domain` and validate it against the profile
    pub async fn check_srv(&self, domain: &str) -> SrvOutcome {
        let profile = &self.config.profile;

        let record = match discover_srv(&self.resolver, profile, domain).await {
            Ok(record) => record,
            Err(e) => {
                info!("SRV discovery for {} failed: {}", domain, e);
                return SrvOutcome::failed(None, &e);
            }
        };

        match validate_srv(&self.resolver, Some(&record), profile).await {
            Ok(()) => SrvOutcome::passed(record),
            Err(e) => {
                info!("SRV record for {} is invalid: {}", domain, e);
                SrvOutcome::failed(Some(record), &e)
            }
        }
    }

    pub async fn check_dnssec(&self, domain: &str) -> DnssecResult {
        self.dnssec.validate(domain).await
    }

    /// Certificate check of `host` on port 443 of each of its addresses
    pub async fn check_ssl(&self, host: &str) -> SslOutcome {
        check_ssl(&self.resolver, self.tls.as_ref(), host, self.config.ssl_timeout).await
    }

    /// Inspect a domain or paymail address.
    ///
    /// DNSSEC and SSL are checked on the SRV target when discovery found
    /// one, otherwise on the domain itself. Only unusable input is an
    /// error; check failures are part of the report.
    pub async fn inspect(&self, input: &str, options: InspectOptions) -> Result<InspectionReport> {
        let (domain, address) = extract_parts(input);
        validate_domain(&domain)?;

        let mut report = InspectionReport::new(&domain);
        report.paymail_address = address;

        let mut check_domain = domain.clone();
        if !options.skip_srv {
            let outcome = self.check_srv(&domain).await;
            if let Some(record) = &outcome.record {
                let target = record.target.trim_end_matches('.');
                if !target.is_empty() {
                    check_domain = target.to_string();
                }
            }
            report = report.with_srv(outcome);
        } else {
            debug!("Skipping SRV check for {}", domain);
        }

        if !options.skip_dnssec {
            report = report.with_dnssec(self.check_dnssec(&check_domain).await);
        } else {
            debug!("Skipping DNSSEC check for {}", check_domain);
        }

        if !options.skip_ssl {
            report = report.with_ssl(self.check_ssl(&check_domain).await);
        } else {
            debug!("Skipping SSL check for {}", check_domain);
        }

        Ok(report)
    }
}
