/// DNS Response Code constants from RFC 1035 and subsequent RFCs
pub struct DNSRcode;

impl DNSRcode {
    pub const NOERROR: u8 = 0; // No error
    pub const FORMERR: u8 = 1; // Format error
    pub const SERVFAIL: u8 = 2; // Server failure
    pub const NXDOMAIN: u8 = 3; // Name error
    pub const NOTIMP: u8 = 4; // Not implemented
    pub const REFUSED: u8 = 5; // Query refused
}

/// Default port for DNS over UDP and TCP
pub const DNS_PORT: u16 = 53;

/// EDNS0 payload size advertised on every query (RFC 4035 recommends 4096)
pub const EDNS_UDP_PAYLOAD_SIZE: u16 = 4096;

/// DNSSEC OK bit in the EDNS0 flags field
pub const DO_FLAG: u16 = 0x8000;
