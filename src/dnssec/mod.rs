//! DNSSEC inspection of a single delegation: the DS records the parent
//! publishes, the DNSKEY records the child serves, and whether any key
//! hashes to a published digest.

pub mod algorithm;
pub mod chain;
pub mod digest;
pub mod errors;
pub mod key_tag;
pub mod matching;
pub mod records;

pub use algorithm::DnsSecAlgorithm;
pub use chain::DnssecChainValidator;
pub use digest::DigestType;
pub use errors::{DnsSecError, DnssecErrorKind};
pub use key_tag::calculate_key_tag;
pub use matching::{annotate_calculated_ds, match_keys};
pub use records::{DnskeyRecord, DnssecResult, DsRecord, NsecInfo};
