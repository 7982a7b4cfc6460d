use super::ParseError;
use super::constants::{DO_FLAG, EDNS_UDP_PAYLOAD_SIZE};

/// EDNS0 OPT pseudo-record
/// RFC 6891: https://tools.ietf.org/html/rfc6891
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOpt {
    /// UDP payload size that can be handled by the requestor
    pub udp_payload_size: u16,
    /// Extended RCODE (high 8 bits)
    pub extended_rcode: u8,
    /// EDNS version (currently 0)
    pub version: u8,
    /// EDNS flags (16 bits)
    pub flags: u16,
    pub options: Vec<EdnsOption>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl Default for EdnsOpt {
    fn default() -> Self {
        Self::with_payload_size(EDNS_UDP_PAYLOAD_SIZE)
    }
}

impl EdnsOpt {
    /// Create an EDNS OPT record with specified UDP payload size
    pub fn with_payload_size(payload_size: u16) -> Self {
        Self {
            udp_payload_size: payload_size,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }

    /// OPT record asking for DNSSEC records (DO bit set)
    pub fn dnssec_ok(payload_size: u16) -> Self {
        let mut opt = Self::with_payload_size(payload_size);
        opt.set_do_flag(true);
        opt
    }

    /// Check if DNSSEC OK (DO) flag is set
    pub fn do_flag(&self) -> bool {
        (self.flags & DO_FLAG) != 0
    }

    /// Set the DNSSEC OK (DO) flag
    pub fn set_do_flag(&mut self, value: bool) {
        if value {
            self.flags |= DO_FLAG;
        } else {
            self.flags &= !DO_FLAG;
        }
    }

    /// Parse the OPT record fields:
    /// CLASS carries the payload size, TTL packs extended RCODE, version and flags.
    pub fn parse_from_resource(
        udp_payload_size: u16,
        ttl: u32,
        rdata: &[u8],
    ) -> Result<Self, ParseError> {
        let extended_rcode = (ttl >> 24) as u8;
        let version = (ttl >> 16) as u8;
        let flags = ttl as u16;

        let mut options = Vec::new();
        let mut pos = 0;
        while pos < rdata.len() {
            if pos + 4 > rdata.len() {
                return Err(ParseError::InvalidAdditionalSection);
            }
            let code = u16::from_be_bytes([rdata[pos], rdata[pos + 1]]);
            let len = u16::from_be_bytes([rdata[pos + 2], rdata[pos + 3]]) as usize;
            pos += 4;
            let data = rdata
                .get(pos..pos + len)
                .ok_or(ParseError::InvalidAdditionalSection)?;
            options.push(EdnsOption {
                code,
                data: data.to_vec(),
            });
            pos += len;
        }

        Ok(Self {
            udp_payload_size,
            extended_rcode,
            version,
            flags,
            options,
        })
    }

    /// Returns (class, ttl, rdata) for writing the OPT record
    pub fn to_resource_format(&self) -> (u16, u32, Vec<u8>) {
        let ttl = ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | self.flags as u32;

        let mut rdata = Vec::new();
        for option in &self.options {
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&(option.data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }

        (self.udp_payload_size, ttl, rdata)
    }
}
