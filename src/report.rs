use crate::dnssec::DnssecResult;
use crate::error::InspectorError;
use crate::srv::ServiceRecord;
use crate::ssl::SslOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SRV half of an inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvOutcome {
    /// Record found by discovery, kept even when validation rejected it
    pub record: Option<ServiceRecord>,
    pub error: Option<String>,
    /// The failure was a DNS/network problem rather than a misconfigured domain
    #[serde(default)]
    pub network_error: bool,
}

impl SrvOutcome {
    pub fn passed(record: ServiceRecord) -> Self {
        Self {
            record: Some(record),
            error: None,
            network_error: false,
        }
    }

    pub fn failed(record: Option<ServiceRecord>, error: &InspectorError) -> Self {
        Self {
            record,
            error: Some(error.to_string()),
            network_error: error.is_network(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one inspection found. Any check may be absent when it was
/// skipped; a failure in one check never hides the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymail_address: Option<String>,
    pub srv: Option<SrvOutcome>,
    pub dnssec: Option<DnssecResult>,
    pub ssl: Option<SslOutcome>,
}

impl InspectionReport {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            paymail_address: None,
            srv: None,
            dnssec: None,
            ssl: None,
        }
    }

    pub fn with_srv(mut self, outcome: SrvOutcome) -> Self {
        self.srv = Some(outcome);
        self
    }

    pub fn with_dnssec(mut self, result: DnssecResult) -> Self {
        self.dnssec = Some(result);
        self
    }

    pub fn with_ssl(mut self, outcome: SslOutcome) -> Self {
        self.ssl = Some(outcome);
        self
    }

    pub fn srv_passed(&self) -> Option<bool> {
        self.srv.as_ref().map(SrvOutcome::is_success)
    }

    pub fn dnssec_passed(&self) -> Option<bool> {
        self.dnssec.as_ref().map(|result| result.dnssec_valid)
    }

    pub fn ssl_passed(&self) -> Option<bool> {
        self.ssl.as_ref().map(|outcome| outcome.valid)
    }

    /// Every check that ran passed
    pub fn is_success(&self) -> bool {
        self.srv_passed().unwrap_or(true)
            && self.dnssec_passed().unwrap_or(true)
            && self.ssl_passed().unwrap_or(true)
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.paymail_address {
            Some(address) => writeln!(f, "Paymail {} (domain {})", address, self.domain)?,
            None => writeln!(f, "Domain {}", self.domain)?,
        }

        match &self.srv {
            None => writeln!(f, "SRV: skipped")?,
            Some(outcome) => {
                if let Some(record) = &outcome.record {
                    writeln!(f, "SRV record: {}", record)?;
                }
                match &outcome.error {
                    None => writeln!(f, "SRV: passed")?,
                    Some(error) => writeln!(f, "SRV: failed: {}", error)?,
                }
            }
        }

        match &self.dnssec {
            None => writeln!(f, "DNSSEC: skipped")?,
            Some(result) => writeln!(f, "{}", result)?,
        }

        match &self.ssl {
            None => write!(f, "SSL: skipped"),
            Some(outcome) => write!(f, "{}", outcome),
        }
    }
}
