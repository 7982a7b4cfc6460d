use crate::error::InspectorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a DNSSEC check could not reach a verdict
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsSecError {
    #[error("invalid domain {0}")]
    InvalidDomain(String),

    #[error("{domain} cannot be validated due to a known issue with {issue}")]
    KnownIssue { domain: String, issue: String },

    #[error("unsupported digest type: {0}")]
    UnsupportedDigestType(u8),

    #[error("invalid DNSKEY public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid owner name: {0}")]
    InvalidOwnerName(String),

    #[error(transparent)]
    Query(#[from] InspectorError),
}

impl DnsSecError {
    pub fn kind(&self) -> DnssecErrorKind {
        match self {
            Self::InvalidDomain(_) => DnssecErrorKind::InvalidDomain,
            Self::KnownIssue { .. } => DnssecErrorKind::KnownIssue,
            Self::UnsupportedDigestType(_)
            | Self::InvalidPublicKey(_)
            | Self::InvalidOwnerName(_)
            | Self::Query(_) => DnssecErrorKind::Query,
        }
    }
}

/// Error class recorded on a [`super::DnssecResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnssecErrorKind {
    /// The input could not be reduced to a registrable domain
    InvalidDomain,
    /// The domain sits on the known-issue list; not a protocol defect
    KnownIssue,
    /// A DNS query in the walk failed
    Query,
}

pub type Result<T> = std::result::Result<T, DnsSecError>;
