use crate::error::ConfigError;
use crate::resolver::{Network, ResolverConfig, parse_name_server};
use crate::srv::ExpectedServiceProfile;
use crate::ssl::DEFAULT_SSL_TIMEOUT;
use std::time::Duration;

/// Domains whose delegation cannot be checked (PaaS hosts that answer
/// with a wildcard CNAME and no NS set)
pub const DEFAULT_KNOWN_ISSUES: &[&str] = &["herokuapp.com"];

/// Upper bound for the per-query and per-handshake timeouts
const MAX_DNS_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorConfig {
    /// Name server, transport and per-query timeout for every lookup
    pub resolver: ResolverConfig,

    /// What a compliant SRV record must look like
    pub profile: ExpectedServiceProfile,

    /// Registrable names (or parts of them) skipped by the DNSSEC check
    pub known_issues: Vec<String>,

    /// Connect plus handshake timeout for each address in the SSL check
    pub ssl_timeout: Duration,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            profile: ExpectedServiceProfile::default(),
            known_issues: DEFAULT_KNOWN_ISSUES.iter().map(|s| s.to_string()).collect(),
            ssl_timeout: DEFAULT_SSL_TIMEOUT,
        }
    }
}

impl InspectorConfig {
    /// Create an InspectorConfig from `PAYMAIL_*` environment variables.
    /// Returns Err if any variable that is set is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with variables read through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name_server) = lookup("PAYMAIL_NAMESERVER") {
            config.resolver.name_server = parse_name_server(&name_server)?;
        }

        if let Some(network) = lookup("PAYMAIL_NETWORK") {
            config.resolver.network = network.parse::<Network>()?;
        }

        if let Some(timeout_str) = lookup("PAYMAIL_DNS_TIMEOUT") {
            config.resolver.timeout = parse_timeout(&timeout_str)?;
        }

        if let Some(timeout_str) = lookup("PAYMAIL_SSL_TIMEOUT") {
            config.ssl_timeout = parse_timeout(&timeout_str)?;
        }

        if let Some(service) = lookup("PAYMAIL_SERVICE") {
            config.profile.service = service.trim().to_string();
        }

        if let Some(protocol) = lookup("PAYMAIL_PROTOCOL") {
            config.profile.protocol = protocol.trim().to_lowercase();
        }

        if let Some(port) = lookup("PAYMAIL_PORT") {
            config.profile.port = parse_u16("port", &port)?;
        }

        if let Some(priority) = lookup("PAYMAIL_PRIORITY") {
            config.profile.priority = parse_u16("priority", &priority)?;
        }

        if let Some(weight) = lookup("PAYMAIL_WEIGHT") {
            config.profile.weight = parse_u16("weight", &weight)?;
        }

        if let Some(known_issues) = lookup("PAYMAIL_KNOWN_ISSUES") {
            config.known_issues = known_issues
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.resolver.timeout > MAX_DNS_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(
                "Timeout too large (max 300 seconds)".to_string(),
            ));
        }

        if self.ssl_timeout.is_zero() || self.ssl_timeout > MAX_DNS_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(format!(
                "SSL timeout must be between 1 and {} seconds",
                MAX_DNS_TIMEOUT.as_secs()
            )));
        }

        if self.resolver.name_server.port() == 0 {
            return Err(ConfigError::InvalidNameServer(
                self.resolver.name_server.to_string(),
            ));
        }

        let profile = &self.profile;
        if profile.service.is_empty() {
            return Err(ConfigError::InvalidParameter("service"));
        }
        if profile.protocol.trim().is_empty() {
            return Err(ConfigError::InvalidParameter("protocol"));
        }
        if profile.port == 0 {
            return Err(ConfigError::InvalidParameter("port"));
        }
        if profile.priority == 0 {
            return Err(ConfigError::InvalidParameter("priority"));
        }
        if profile.weight == 0 {
            return Err(ConfigError::InvalidParameter("weight"));
        }
        if profile.max_records == 0 {
            return Err(ConfigError::InvalidParameter("max_records"));
        }

        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        self.resolver.timeout
    }
}

/// Parse a timeout in whole seconds
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout(
            "Timeout must be greater than 0".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_u16(field: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::ParseError(format!("Invalid {}: {}", field, value)))
}
