use thiserror::Error;

/// Errors raised while building or validating an [`crate::config::InspectorConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid name server: {0}")]
    InvalidNameServer(String),

    #[error("Invalid network: {0} (expected udp or tcp)")]
    InvalidNetwork(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Errors produced by host discovery and the resolver underneath it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectorError {
    // Caller mistakes
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid domain {domain}: {reason}")]
    InvalidDomain { domain: String, reason: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Protocol violations by the inspected domain
    #[error("zero SRV records found using: {0}")]
    NoRecordFound(String),

    #[error("only {max} SRV record(s) should exist, found {found} records")]
    TooManyRecords { max: usize, found: usize },

    #[error("cname was invalid or not found using: {expected} looking for: {actual}")]
    CanonicalNameMismatch { expected: String, actual: String },

    #[error("target is invalid or empty")]
    EmptyTarget,

    #[error("{field} {actual} does not match {expected}")]
    FieldMismatch {
        field: &'static str,
        actual: u16,
        expected: u16,
    },

    #[error("target {0} could not resolve a host")]
    TargetUnresolvable(String),

    #[error("TLS handshake with {address} failed: {reason}")]
    Tls { address: String, reason: String },

    // Network and query failures
    #[error("IO error: {0}")]
    Io(String),

    #[error("DNS query timed out after {0}ms")]
    Timeout(u128),

    #[error("truncated UDP response from {0}")]
    Truncated(String),

    #[error("malformed DNS response: {0}")]
    Malformed(String),

    #[error("name server returned rcode {rcode} for {name}")]
    ServerFailure { name: String, rcode: u8 },

    #[error("no name server found for {0}")]
    NoNameServer(String),

    #[error("no address found for name server {0}")]
    NoAddress(String),
}

impl InspectorError {
    /// True for failures to reach or understand DNS, as opposed to a misconfigured domain
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Timeout(_)
                | Self::Truncated(_)
                | Self::Malformed(_)
                | Self::ServerFailure { .. }
                | Self::NoNameServer(_)
                | Self::NoAddress(_)
        )
    }

    /// True when the inspected domain itself does not follow host discovery rules
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::NoRecordFound(_)
                | Self::TooManyRecords { .. }
                | Self::CanonicalNameMismatch { .. }
                | Self::EmptyTarget
                | Self::FieldMismatch { .. }
                | Self::TargetUnresolvable(_)
                | Self::Tls { .. }
        )
    }

    /// True for caller configuration mistakes
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::InvalidDomain { .. } | Self::Config(_)
        )
    }
}

impl From<std::io::Error> for InspectorError {
    fn from(err: std::io::Error) -> Self {
        InspectorError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InspectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_are_disjoint() {
        let network = InspectorError::Timeout(5000);
        assert!(network.is_network());
        assert!(!network.is_protocol_violation());

        let violation = InspectorError::TooManyRecords { max: 1, found: 2 };
        assert!(violation.is_protocol_violation());
        assert!(!violation.is_network());

        let config = InspectorError::InvalidParameter("service");
        assert!(config.is_configuration());
        assert!(!config.is_network());
    }

    #[test]
    fn test_field_mismatch_message() {
        let err = InspectorError::FieldMismatch {
            field: "port",
            actual: 8443,
            expected: 443,
        };
        assert_eq!(err.to_string(), "port 8443 does not match 443");
    }
}
