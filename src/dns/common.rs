use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::ParseError;

/// Maximum number of compression pointers followed while decoding one name
const MAX_POINTER_JUMPS: usize = 16;

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError>;

    fn write_name<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        name: &str,
    ) -> Result<(), ParseError> {
        writer.write_bytes(&encode_name(name)?)?;
        Ok(())
    }

    fn read_u16_pair<E: Endianness>(
        &self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<(u16, u16), ParseError> {
        let first = reader.read_var::<u16>(16)?;
        let second = reader.read_var::<u16>(16)?;
        Ok((first, second))
    }
}

/// Encode a dotted name into uncompressed wire format.
///
/// A trailing dot is optional; the root is written as a single zero octet.
pub fn encode_name(name: &str) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(name.len() + 2);
    for label in name.split('.').filter(|l| !l.is_empty()) {
        if label.len() > 63 {
            return Err(ParseError::InvalidLabel);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);

    if out.len() > 255 {
        return Err(ParseError::InvalidLabel);
    }
    Ok(out)
}

/// Decode a possibly compressed name starting at `offset`.
///
/// Returns the dotted name without a trailing dot (empty for the root) and
/// the offset just past the name in the original position. Label case is
/// preserved.
pub fn read_name(data: &[u8], offset: usize) -> Result<(String, usize), ParseError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = offset;
    let mut resume_at = None;
    let mut jumps = 0;

    loop {
        let len = *data.get(pos).ok_or(ParseError::InvalidLabel)?;

        if (len & 0xC0) == 0xC0 {
            let low = *data.get(pos + 1).ok_or(ParseError::InvalidLabel)?;
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(ParseError::InvalidLabel);
            }
            if resume_at.is_none() {
                resume_at = Some(pos + 2);
            }
            pos = u16::from_be_bytes([len & 0x3F, low]) as usize;
            continue;
        }

        if len == 0 {
            pos += 1;
            break;
        }

        if len > 63 {
            return Err(ParseError::InvalidLabel);
        }

        let start = pos + 1;
        let end = start + len as usize;
        let bytes = data.get(start..end).ok_or(ParseError::InvalidLabel)?;
        let label = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidLabel)?;
        labels.push(label.to_string());
        pos = end;
    }

    Ok((labels.join("."), resume_at.unwrap_or(pos)))
}

/// Read a big-endian u16 at `offset`
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16, ParseError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ParseError::UnexpectedEnd(offset))
}

/// Read a big-endian u32 at `offset`
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32, ParseError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ParseError::UnexpectedEnd(offset))
}
