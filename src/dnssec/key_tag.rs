use crate::dns::resource::DnskeyRdata;

/// Key tag of a DNSKEY (RFC 4034 Appendix B)
pub fn calculate_key_tag(key: &DnskeyRdata) -> u16 {
    // RSA/MD5 keys use the low 16 bits of the modulus
    if key.algorithm == 1 {
        let len = key.public_key.len();
        if len >= 3 {
            return u16::from_be_bytes([key.public_key[len - 3], key.public_key[len - 2]]);
        }
        return 0;
    }

    let mut accumulator: u32 = 0;
    let header = key.flags.to_be_bytes();
    let rdata = header
        .into_iter()
        .chain([key.protocol, key.algorithm])
        .chain(key.public_key.iter().copied());

    for (i, byte) in rdata.enumerate() {
        if i % 2 == 0 {
            accumulator += u32::from(byte) << 8;
        } else {
            accumulator += u32::from(byte);
        }
    }

    accumulator += (accumulator >> 16) & 0xFFFF;
    (accumulator & 0xFFFF) as u16
}
