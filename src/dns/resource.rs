use std::net::{Ipv4Addr, Ipv6Addr};

use bitstream_io::{BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{encode_name, read_name, read_u16, read_u32},
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DNSResource {
    /// Owner name without the trailing root dot, case preserved
    pub name: String,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: RData,
}

/// Decoded RDATA for the record types the inspector looks at
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(String),
    CNAME(String),
    SRV(SrvRdata),
    DS(DsRdata),
    DNSKEY(DnskeyRdata),
    NSEC(NsecRdata),
    NSEC3(Nsec3Rdata),
    NSEC3PARAM(Nsec3ParamRdata),
    /// Anything else, kept verbatim
    Raw(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrvRdata {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsRdata {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnskeyRdata {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NsecRdata {
    pub next_domain: String,
    pub type_bitmap: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3Rdata {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next_hashed_owner: Vec<u8>,
    pub type_bitmap: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3ParamRdata {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
}

impl DNSResource {
    pub fn new(name: &str, ttl: u32, rdata: RData) -> Self {
        Self {
            name: name.trim_end_matches('.').to_string(),
            rtype: rdata.rtype(),
            rclass: DNSResourceClass::IN,
            ttl,
            rdata,
        }
    }

    /// Decode one resource record starting at `offset` of the full packet.
    /// Returns the record and the offset of the next one.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize), ParseError> {
        let (name, pos) = read_name(data, offset)?;
        let rtype = DNSResourceType::from(read_u16(data, pos)?);
        let rclass = DNSResourceClass::from(read_u16(data, pos + 2)?);
        let ttl = read_u32(data, pos + 4)?;
        let rdlength = read_u16(data, pos + 8)? as usize;

        let start = pos + 10;
        let end = start + rdlength;
        if end > data.len() {
            return Err(ParseError::UnexpectedEnd(data.len()));
        }

        let rdata = RData::parse(rtype, data, start, end)?;
        Ok((
            Self {
                name,
                rtype,
                rclass,
                ttl,
                rdata,
            },
            end,
        ))
    }

    /// Write the record uncompressed
    pub fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let rdata = self.rdata.to_wire()?;
        writer.write_bytes(&encode_name(&self.name)?)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, rdata.len() as u16)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }
}

impl RData {
    /// Record type implied by the decoded variant
    pub fn rtype(&self) -> DNSResourceType {
        match self {
            Self::A(_) => DNSResourceType::A,
            Self::AAAA(_) => DNSResourceType::AAAA,
            Self::NS(_) => DNSResourceType::NS,
            Self::CNAME(_) => DNSResourceType::CNAME,
            Self::SRV(_) => DNSResourceType::SRV,
            Self::DS(_) => DNSResourceType::DS,
            Self::DNSKEY(_) => DNSResourceType::DNSKEY,
            Self::NSEC(_) => DNSResourceType::NSEC,
            Self::NSEC3(_) => DNSResourceType::NSEC3,
            Self::NSEC3PARAM(_) => DNSResourceType::NSEC3PARAM,
            Self::Raw(_) => DNSResourceType::Unknown(0),
        }
    }

    fn parse(
        rtype: DNSResourceType,
        data: &[u8],
        start: usize,
        end: usize,
    ) -> Result<Self, ParseError> {
        let rdata = &data[start..end];
        let invalid = || ParseError::InvalidRdata(rtype);

        let parsed = match rtype {
            DNSResourceType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| invalid())?;
                Self::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA => {
                let octets: [u8; 16] = rdata.try_into().map_err(|_| invalid())?;
                Self::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => Self::NS(read_name(data, start)?.0),
            DNSResourceType::CNAME => Self::CNAME(read_name(data, start)?.0),
            DNSResourceType::SRV => {
                if rdata.len() < 7 {
                    return Err(invalid());
                }
                Self::SRV(SrvRdata {
                    priority: read_u16(data, start)?,
                    weight: read_u16(data, start + 2)?,
                    port: read_u16(data, start + 4)?,
                    target: read_name(data, start + 6)?.0,
                })
            }
            DNSResourceType::DS => {
                if rdata.len() < 4 {
                    return Err(invalid());
                }
                Self::DS(DsRdata {
                    key_tag: read_u16(data, start)?,
                    algorithm: rdata[2],
                    digest_type: rdata[3],
                    digest: rdata[4..].to_vec(),
                })
            }
            DNSResourceType::DNSKEY => {
                if rdata.len() < 4 {
                    return Err(invalid());
                }
                Self::DNSKEY(DnskeyRdata {
                    flags: read_u16(data, start)?,
                    protocol: rdata[2],
                    algorithm: rdata[3],
                    public_key: rdata[4..].to_vec(),
                })
            }
            DNSResourceType::NSEC => {
                let (next_domain, bitmap_start) = read_name(data, start)?;
                if bitmap_start > end {
                    return Err(invalid());
                }
                Self::NSEC(NsecRdata {
                    next_domain,
                    type_bitmap: data[bitmap_start..end].to_vec(),
                })
            }
            DNSResourceType::NSEC3 => {
                let (hash_algorithm, flags, iterations, salt, pos) =
                    parse_nsec3_prefix(rdata).ok_or_else(invalid)?;
                let hash_len = *rdata.get(pos).ok_or_else(invalid)? as usize;
                let hash_end = pos + 1 + hash_len;
                let next_hashed_owner = rdata.get(pos + 1..hash_end).ok_or_else(invalid)?;
                Self::NSEC3(Nsec3Rdata {
                    hash_algorithm,
                    flags,
                    iterations,
                    salt,
                    next_hashed_owner: next_hashed_owner.to_vec(),
                    type_bitmap: rdata[hash_end..].to_vec(),
                })
            }
            DNSResourceType::NSEC3PARAM => {
                let (hash_algorithm, flags, iterations, salt, _) =
                    parse_nsec3_prefix(rdata).ok_or_else(invalid)?;
                Self::NSEC3PARAM(Nsec3ParamRdata {
                    hash_algorithm,
                    flags,
                    iterations,
                    salt,
                })
            }
            _ => Self::Raw(rdata.to_vec()),
        };

        Ok(parsed)
    }

    /// Uncompressed wire form of the RDATA
    pub fn to_wire(&self) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::new();
        match self {
            Self::A(addr) => out.extend_from_slice(&addr.octets()),
            Self::AAAA(addr) => out.extend_from_slice(&addr.octets()),
            Self::NS(name) | Self::CNAME(name) => out = encode_name(name)?,
            Self::SRV(srv) => {
                out.extend_from_slice(&srv.priority.to_be_bytes());
                out.extend_from_slice(&srv.weight.to_be_bytes());
                out.extend_from_slice(&srv.port.to_be_bytes());
                out.extend_from_slice(&encode_name(&srv.target)?);
            }
            Self::DS(ds) => {
                out.extend_from_slice(&ds.key_tag.to_be_bytes());
                out.push(ds.algorithm);
                out.push(ds.digest_type);
                out.extend_from_slice(&ds.digest);
            }
            Self::DNSKEY(key) => {
                out.extend_from_slice(&key.flags.to_be_bytes());
                out.push(key.protocol);
                out.push(key.algorithm);
                out.extend_from_slice(&key.public_key);
            }
            Self::NSEC(nsec) => {
                out.extend_from_slice(&encode_name(&nsec.next_domain)?);
                out.extend_from_slice(&nsec.type_bitmap);
            }
            Self::NSEC3(nsec3) => {
                out.push(nsec3.hash_algorithm);
                out.push(nsec3.flags);
                out.extend_from_slice(&nsec3.iterations.to_be_bytes());
                out.push(nsec3.salt.len() as u8);
                out.extend_from_slice(&nsec3.salt);
                out.push(nsec3.next_hashed_owner.len() as u8);
                out.extend_from_slice(&nsec3.next_hashed_owner);
                out.extend_from_slice(&nsec3.type_bitmap);
            }
            Self::NSEC3PARAM(param) => {
                out.push(param.hash_algorithm);
                out.push(param.flags);
                out.extend_from_slice(&param.iterations.to_be_bytes());
                out.push(param.salt.len() as u8);
                out.extend_from_slice(&param.salt);
            }
            Self::Raw(bytes) => out.extend_from_slice(bytes),
        }
        Ok(out)
    }
}

/// Shared NSEC3/NSEC3PARAM prefix: algorithm, flags, iterations, salt.
/// Returns the offset following the salt.
fn parse_nsec3_prefix(rdata: &[u8]) -> Option<(u8, u8, u16, Vec<u8>, usize)> {
    if rdata.len() < 5 {
        return None;
    }
    let iterations = u16::from_be_bytes([rdata[2], rdata[3]]);
    let salt_len = rdata[4] as usize;
    let salt = rdata.get(5..5 + salt_len)?.to_vec();
    Some((rdata[0], rdata[1], iterations, salt, 5 + salt_len))
}

/// Decode an NSEC/NSEC3 type bitmap (RFC 4034 section 4.1.2)
pub fn decode_type_bitmap(bitmap: &[u8]) -> Vec<DNSResourceType> {
    let mut types = Vec::new();
    let mut pos = 0;

    while pos + 2 <= bitmap.len() {
        let window = bitmap[pos] as u16;
        let len = bitmap[pos + 1] as usize;
        pos += 2;
        let Some(bits) = bitmap.get(pos..pos + len) else {
            break;
        };
        for (i, byte) in bits.iter().enumerate() {
            for bit in 0..8u16 {
                if byte & (0x80 >> bit) != 0 {
                    types.push(DNSResourceType::from(window * 256 + i as u16 * 8 + bit));
                }
            }
        }
        pos += len;
    }

    types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srv_with_compressed_target() {
        let mut packet = vec![0u8; 12];
        // owner: _bsvalias._tcp.moneybutton.com at offset 12
        packet.extend_from_slice(b"\x09_bsvalias\x04_tcp\x0bmoneybutton\x03com\x00");
        let owner_end = packet.len();
        packet.extend_from_slice(&[0x00, 0x21, 0x00, 0x01, 0x00, 0x00, 0x0E, 0x10]);
        // rdlength 12: prio 10, weight 10, port 443, "www" + pointer to moneybutton.com
        packet.extend_from_slice(&[0x00, 0x0C, 0x00, 0x0A, 0x00, 0x0A, 0x01, 0xBB]);
        packet.extend_from_slice(&[0x03, b'w', b'w', b'w', 0xC0, 27]);

        let (record, next) = DNSResource::parse(&packet, 12).unwrap();
        assert_eq!(next, owner_end + 10 + 12);
        assert_eq!(record.name, "_bsvalias._tcp.moneybutton.com");
        assert_eq!(record.ttl, 3600);
        assert_eq!(
            record.rdata,
            RData::SRV(SrvRdata {
                priority: 10,
                weight: 10,
                port: 443,
                target: "www.moneybutton.com".to_string(),
            })
        );
    }

    #[test]
    fn test_nsec3_rdata() {
        let rdata = Nsec3Rdata {
            hash_algorithm: 1,
            flags: 0,
            iterations: 10,
            salt: vec![0xAA, 0xBB],
            next_hashed_owner: vec![1; 20],
            type_bitmap: vec![0x00, 0x01, 0x62],
        };
        let wire = RData::NSEC3(rdata.clone()).to_wire().unwrap();
        let parsed = RData::parse(DNSResourceType::NSEC3, &wire, 0, wire.len()).unwrap();
        assert_eq!(parsed, RData::NSEC3(rdata));
    }

    #[test]
    fn test_short_ds_is_rejected() {
        let wire = [0x12, 0x34, 0x08];
        assert!(RData::parse(DNSResourceType::DS, &wire, 0, wire.len()).is_err());
    }

    #[test]
    fn test_type_bitmap() {
        // Window 0: A(1), NS(2), SOA(6), RRSIG(46), NSEC(47), DNSKEY(48)
        let bitmap = [0x00, 0x07, 0x62, 0x00, 0x00, 0x00, 0x00, 0x03, 0x80];
        assert_eq!(
            decode_type_bitmap(&bitmap),
            vec![
                DNSResourceType::A,
                DNSResourceType::NS,
                DNSResourceType::SOA,
                DNSResourceType::RRSIG,
                DNSResourceType::NSEC,
                DNSResourceType::DNSKEY,
            ]
        );
    }
}
