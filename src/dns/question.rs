use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::PacketComponent,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSQuestion {
    /// Dotted name without the trailing root dot
    pub name: String,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub fn new(name: &str, qtype: DNSResourceType) -> Self {
        Self {
            name: name.trim_end_matches('.').to_string(),
            qtype,
            qclass: DNSResourceClass::IN,
        }
    }

    /// Number of octets this question occupies on the wire
    pub fn wire_len(&self) -> usize {
        let labels: usize = self
            .name
            .split('.')
            .filter(|l| !l.is_empty())
            .map(|l| l.len() + 1)
            .sum();
        labels + 1 + 4
    }
}

impl PacketComponent for DNSQuestion {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_name(writer, &self.name)?;
        writer.write_var::<u16>(16, self.qtype.into())?;
        writer.write_var::<u16>(16, self.qclass.into())?;
        Ok(())
    }

    /// Questions are never compressed, so they are read label by label.
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        let mut labels = Vec::new();
        loop {
            let label_len = reader.read_var::<u8>(8)?;
            if label_len == 0 {
                break;
            }
            if label_len > 63 {
                return Err(ParseError::InvalidQuestionSection);
            }
            let mut buf = vec![0; label_len as usize];
            reader.read_bytes(&mut buf)?;
            let label = String::from_utf8(buf).map_err(|_| ParseError::InvalidLabel)?;
            labels.push(label);
        }

        let (qtype, qclass) = self.read_u16_pair(reader)?;
        *self = DNSQuestion {
            name: labels.join("."),
            qtype: qtype.into(),
            qclass: qclass.into(),
        };
        Ok(())
    }
}
