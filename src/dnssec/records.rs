//! Presentation-form DNSSEC records and the per-domain check result.

use super::algorithm::DnsSecAlgorithm;
use super::digest::DigestType;
use super::errors::{DnsSecError, DnssecErrorKind, Result};
use super::key_tag::calculate_key_tag;
use crate::dns::common::encode_name;
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::{
    DnskeyRdata, DsRdata, Nsec3ParamRdata, Nsec3Rdata, NsecRdata, decode_type_bitmap,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Secure entry point flag (RFC 4034 section 2.1.1)
const SEP_FLAG: u16 = 0x0001;

/// A delegation signer assertion published by the parent zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsRecord {
    pub algorithm: u8,
    pub digest_type: u8,
    /// Uppercase hex, as written in zone files
    pub digest: String,
    pub key_tag: u16,
}

impl From<&DsRdata> for DsRecord {
    fn from(ds: &DsRdata) -> Self {
        Self {
            algorithm: ds.algorithm,
            digest_type: ds.digest_type,
            digest: hex::encode_upper(&ds.digest),
            key_tag: ds.key_tag,
        }
    }
}

impl fmt::Display for DsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key_tag,
            DnsSecAlgorithm::mnemonic(self.algorithm),
            self.digest_type,
            self.digest
        )
    }
}

/// A public key published by the zone itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnskeyRecord {
    pub algorithm: u8,
    pub flags: u16,
    pub protocol: u8,
    /// Standard base64
    pub public_key: String,
    /// DS this key produces under the digest type being checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_ds: Option<DsRecord>,
}

impl From<&DnskeyRdata> for DnskeyRecord {
    fn from(key: &DnskeyRdata) -> Self {
        Self {
            algorithm: key.algorithm,
            flags: key.flags,
            protocol: key.protocol,
            public_key: STANDARD.encode(&key.public_key),
            calculated_ds: None,
        }
    }
}

impl DnskeyRecord {
    /// Back to wire RDATA
    pub fn to_rdata(&self) -> Result<DnskeyRdata> {
        let public_key = STANDARD
            .decode(self.public_key.as_bytes())
            .map_err(|e| DnsSecError::InvalidPublicKey(e.to_string()))?;
        Ok(DnskeyRdata {
            flags: self.flags,
            protocol: self.protocol,
            algorithm: self.algorithm,
            public_key,
        })
    }

    pub fn key_tag(&self) -> Result<u16> {
        Ok(calculate_key_tag(&self.to_rdata()?))
    }

    pub fn is_key_signing_key(&self) -> bool {
        self.flags & SEP_FLAG != 0
    }

    /// DS record this key would produce at `owner` (RFC 4034 section 5.1.4).
    ///
    /// The digest covers the canonical (lowercase) owner name followed by
    /// the DNSKEY RDATA.
    pub fn calculate_ds(&self, owner: &str, digest_type: u8) -> Result<DsRecord> {
        let hasher = DigestType::from_u8(digest_type)
            .ok_or(DnsSecError::UnsupportedDigestType(digest_type))?;
        let rdata = self.to_rdata()?;

        let mut data = encode_name(&owner.to_ascii_lowercase())
            .map_err(|_| DnsSecError::InvalidOwnerName(owner.to_string()))?;
        data.extend_from_slice(&rdata.flags.to_be_bytes());
        data.push(rdata.protocol);
        data.push(rdata.algorithm);
        data.extend_from_slice(&rdata.public_key);

        let digest = hasher
            .digest(&data)
            .ok_or(DnsSecError::UnsupportedDigestType(digest_type))?;

        Ok(DsRecord {
            algorithm: self.algorithm,
            digest_type,
            digest: hex::encode_upper(digest),
            key_tag: calculate_key_tag(&rdata),
        })
    }
}

impl fmt::Display for DnskeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.flags,
            self.protocol,
            DnsSecAlgorithm::mnemonic(self.algorithm)
        )?;
        if let Some(ds) = &self.calculated_ds {
            write!(f, " (key tag {}, calculated DS {})", ds.key_tag, ds.digest)?;
        }
        Ok(())
    }
}

/// Which denial-of-existence record the domain serves, if any.
/// Presence only: no proof is checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NsecInfo {
    #[default]
    #[serde(rename = "none")]
    Absent,
    Nsec {
        next_domain: String,
        types: Vec<String>,
    },
    Nsec3 {
        hash_algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: String,
        types: Vec<String>,
    },
    Nsec3Param {
        hash_algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: String,
    },
}

fn type_names(bitmap: &[u8]) -> Vec<String> {
    decode_type_bitmap(bitmap)
        .into_iter()
        .map(|rtype: DNSResourceType| rtype.to_string())
        .collect()
}

/// Zone file form of a salt: hex, or `-` when empty
fn salt_text(salt: &[u8]) -> String {
    if salt.is_empty() {
        "-".to_string()
    } else {
        hex::encode_upper(salt)
    }
}

impl From<&NsecRdata> for NsecInfo {
    fn from(nsec: &NsecRdata) -> Self {
        Self::Nsec {
            next_domain: format!("{}.", nsec.next_domain),
            types: type_names(&nsec.type_bitmap),
        }
    }
}

impl From<&Nsec3Rdata> for NsecInfo {
    fn from(nsec3: &Nsec3Rdata) -> Self {
        Self::Nsec3 {
            hash_algorithm: nsec3.hash_algorithm,
            flags: nsec3.flags,
            iterations: nsec3.iterations,
            salt: salt_text(&nsec3.salt),
            types: type_names(&nsec3.type_bitmap),
        }
    }
}

impl From<&Nsec3ParamRdata> for NsecInfo {
    fn from(param: &Nsec3ParamRdata) -> Self {
        Self::Nsec3Param {
            hash_algorithm: param.hash_algorithm,
            flags: param.flags,
            iterations: param.iterations,
            salt: salt_text(&param.salt),
        }
    }
}

impl NsecInfo {
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for NsecInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "none"),
            Self::Nsec { next_domain, types } => {
                write!(f, "NSEC next {} types [{}]", next_domain, types.join(" "))
            }
            Self::Nsec3 {
                hash_algorithm,
                iterations,
                salt,
                ..
            } => write!(
                f,
                "NSEC3 hash {} iterations {} salt {}",
                hash_algorithm, iterations, salt
            ),
            Self::Nsec3Param {
                hash_algorithm,
                iterations,
                salt,
                ..
            } => write!(
                f,
                "NSEC3PARAM hash {} iterations {} salt {}",
                hash_algorithm, iterations, salt
            ),
        }
    }
}

/// Outcome of one DNSSEC check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnssecResult {
    /// Registrable name that was checked, or the raw input if it could not be reduced
    pub domain: String,
    pub checked_at: DateTime<Utc>,
    /// A parent DS digest matched a recomputed child DNSKEY digest.
    /// This covers one delegation hop; it is not a proof up to the root
    /// and no signatures are verified.
    pub dnssec_valid: bool,
    pub ds_records: Vec<DsRecord>,
    pub dnskey_records: Vec<DnskeyRecord>,
    pub matching_pairs: Vec<(DsRecord, DnskeyRecord)>,
    pub nsec: NsecInfo,
    pub error_message: Option<String>,
    pub error_kind: Option<DnssecErrorKind>,
}

impl DnssecResult {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            checked_at: Utc::now(),
            dnssec_valid: false,
            ds_records: Vec::new(),
            dnskey_records: Vec::new(),
            matching_pairs: Vec::new(),
            nsec: NsecInfo::Absent,
            error_message: None,
            error_kind: None,
        }
    }

    /// Record `error` and clear the verdict
    pub fn fail(&mut self, error: DnsSecError) {
        self.dnssec_valid = false;
        self.matching_pairs.clear();
        self.error_kind = Some(error.kind());
        self.error_message = Some(error.to_string());
    }

    pub fn ds_record_count(&self) -> usize {
        self.ds_records.len()
    }

    pub fn dnskey_record_count(&self) -> usize {
        self.dnskey_records.len()
    }

    pub fn is_known_issue(&self) -> bool {
        self.error_kind == Some(DnssecErrorKind::KnownIssue)
    }
}

impl fmt::Display for DnssecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DNSSEC check for {} at {}", self.domain, self.checked_at.to_rfc3339())?;
        if let Some(message) = &self.error_message {
            writeln!(f, "  error: {}", message)?;
        }
        writeln!(f, "  DS records: {}", self.ds_record_count())?;
        for ds in &self.ds_records {
            writeln!(f, "    {}", ds)?;
        }
        writeln!(f, "  DNSKEY records: {}", self.dnskey_record_count())?;
        for key in &self.dnskey_records {
            writeln!(f, "    {}", key)?;
        }
        for (ds, key) in &self.matching_pairs {
            writeln!(f, "  match: DS key tag {} <-> DNSKEY {}", ds.key_tag, key)?;
        }
        writeln!(f, "  NSEC: {}", self.nsec)?;
        write!(
            f,
            "  DNSSEC: {}",
            if self.dnssec_valid { "valid" } else { "not valid" }
        )
    }
}
