pub mod common;
pub mod constants;
pub mod edns;
pub mod enums;
pub mod header;
pub mod question;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use common::PacketComponent;
use edns::EdnsOpt;
use enums::{DNSResourceClass, DNSResourceType};
use header::{DNSHeader, HEADER_LEN};
use question::DNSQuestion;
use resource::{DNSResource, RData};
use tracing::trace;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record if present (extracted from additional records)
    pub edns: Option<EdnsOpt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidHeader,
    InvalidLabel,
    InvalidQuestionSection,
    InvalidAdditionalSection,
    InvalidRdata(DNSResourceType),
    UnexpectedEnd(usize),
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidHeader => write!(f, "Invalid DNS header"),
            ParseError::InvalidLabel => write!(f, "Invalid DNS label"),
            ParseError::InvalidQuestionSection => write!(f, "Invalid question section"),
            ParseError::InvalidAdditionalSection => write!(f, "Invalid additional section"),
            ParseError::InvalidRdata(rtype) => write!(f, "Invalid {} record data", rtype),
            ParseError::UnexpectedEnd(at) => write!(f, "Unexpected end of packet at {}", at),
            ParseError::InvalidBitStream(e) => write!(f, "Invalid bit stream: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl DNSPacket {
    /// Build a recursive query for `name`/`qtype`, optionally carrying EDNS0
    pub fn query(id: u16, name: &str, qtype: DNSResourceType, edns: Option<EdnsOpt>) -> Self {
        Self {
            header: DNSHeader::recursive_query(id),
            questions: vec![DNSQuestion::new(name, qtype)],
            edns,
            ..Default::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        if buf.len() < HEADER_LEN {
            return Err(ParseError::InvalidHeader);
        }

        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader)?;

        let mut offset = HEADER_LEN;
        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question
                .read(&mut reader)
                .map_err(|_| ParseError::InvalidQuestionSection)?;
            offset += question.wire_len();
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let (answer, next) = DNSResource::parse(buf, offset)?;
            packet.answers.push(answer);
            offset = next;
        }

        for _ in 0..packet.header.nscount {
            let (authority, next) = DNSResource::parse(buf, offset)?;
            packet.authorities.push(authority);
            offset = next;
        }

        for _ in 0..packet.header.arcount {
            let (resource, next) = DNSResource::parse(buf, offset)?;
            offset = next;

            if resource.rtype == DNSResourceType::OPT && resource.name.is_empty() {
                let RData::Raw(rdata) = &resource.rdata else {
                    return Err(ParseError::InvalidAdditionalSection);
                };
                let edns =
                    EdnsOpt::parse_from_resource(resource.rclass.into(), resource.ttl, rdata)?;
                packet.edns = Some(edns);
                continue;
            }

            packet.resources.push(resource);
        }

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + self.edns.is_some() as u16;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }

        for record in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.resources.iter())
        {
            record.write(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            let (udp_payload_size, ttl, rdata) = edns.to_resource_format();
            let opt = DNSResource {
                name: String::new(),
                rtype: DNSResourceType::OPT,
                rclass: DNSResourceClass::from(udp_payload_size),
                ttl,
                rdata: RData::Raw(rdata),
            };
            opt.write(&mut writer)?;
        }

        writer.byte_align()?;
        Ok(buf)
    }

    /// Answer records of the given type
    pub fn answers_of(&self, rtype: DNSResourceType) -> impl Iterator<Item = &DNSResource> {
        self.answers.iter().filter(move |rr| rr.rtype == rtype)
    }

    /// Check if DNSSEC is requested (DO flag)
    pub fn dnssec_requested(&self) -> bool {
        self.edns.as_ref().map(|edns| edns.do_flag()).unwrap_or(false)
    }
}
