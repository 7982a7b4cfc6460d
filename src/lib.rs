pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod input;
pub mod inspector;
pub mod psl;
pub mod report;
pub mod resolver;
pub mod srv;
pub mod ssl;

pub use config::InspectorConfig;
pub use dns::DNSPacket;
pub use dnssec::{DnssecChainValidator, DnssecResult};
pub use error::{ConfigError, InspectorError};
pub use inspector::{InspectOptions, Inspector};
pub use report::InspectionReport;
pub use resolver::{CustomResolver, ResolverConfig};
pub use srv::{ExpectedServiceProfile, ServiceRecord};
pub use ssl::SslOutcome;
