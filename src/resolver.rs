//! Resolver bound to exactly one name server.
//!
//! Every DNS lookup the inspector performs goes through [`CustomResolver`].
//! There is no system resolver, no cache and no retry: a failed or timed
//! out exchange is returned to the caller as is.

use crate::dns::constants::{DNS_PORT, DNSRcode, EDNS_UDP_PAYLOAD_SIZE};
use crate::dns::edns::EdnsOpt;
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::{DnskeyRdata, DsRdata, RData, SrvRdata};
use crate::dns::DNSPacket;
use crate::error::{ConfigError, InspectorError, Result};
use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Per-query timeout used when none is configured
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

static QUERY_ID_COUNTER: AtomicU16 = AtomicU16::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Udp,
    Tcp,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "udp" => Ok(Network::Udp),
            "tcp" => Ok(Network::Tcp),
            _ => Err(ConfigError::InvalidNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Udp => write!(f, "udp"),
            Network::Tcp => write!(f, "tcp"),
        }
    }
}

/// Where and how a [`CustomResolver`] sends its queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub name_server: SocketAddr,
    pub network: Network,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            name_server: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), DNS_PORT),
            network: Network::Udp,
            timeout: DEFAULT_DNS_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    pub fn new(name_server: SocketAddr, network: Network) -> Self {
        Self {
            name_server,
            network,
            timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parse a name server given as `ip`, `ip:port` or `[v6]:port`.
/// A bare address gets the standard DNS port.
pub fn parse_name_server(value: &str) -> std::result::Result<SocketAddr, ConfigError> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| ConfigError::InvalidNameServer(value.to_string()))
}

/// One request/response exchange with a name server
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, config: &ResolverConfig, query: &DNSPacket) -> Result<DNSPacket>;
}

/// Real sockets: one fresh UDP socket or TCP stream per query
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkTransport;

impl NetworkTransport {
    async fn send_udp_query(&self, query_bytes: &[u8], server: SocketAddr) -> Result<DNSPacket> {
        let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; EDNS_UDP_PAYLOAD_SIZE as usize];
        let response_len = socket.recv(&mut response_buf).await?;

        trace!(
            "Raw UDP response data ({} bytes): {:02x?}",
            response_len,
            &response_buf[..response_len.min(64)]
        );

        DNSPacket::parse(&response_buf[..response_len])
            .map_err(|e| InspectorError::Malformed(format!("{} from {}", e, server)))
    }

    async fn send_tcp_query(&self, query_bytes: &[u8], server: SocketAddr) -> Result<DNSPacket> {
        let mut stream = TcpStream::connect(server).await?;

        let query_length = query_bytes.len() as u16;
        stream.write_all(&query_length.to_be_bytes()).await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0u8; response_length];
        stream.read_exact(&mut response_buf).await?;

        DNSPacket::parse(&response_buf)
            .map_err(|e| InspectorError::Malformed(format!("{} from {}", e, server)))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn exchange(&self, config: &ResolverConfig, query: &DNSPacket) -> Result<DNSPacket> {
        let query_bytes = query
            .serialize()
            .map_err(|e| InspectorError::Malformed(format!("failed to serialize query: {}", e)))?;

        match config.network {
            Network::Udp => self.send_udp_query(&query_bytes, config.name_server).await,
            Network::Tcp => self.send_tcp_query(&query_bytes, config.name_server).await,
        }
    }
}

/// DNS client pinned to a single name server
#[derive(Clone)]
pub struct CustomResolver {
    config: ResolverConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for CustomResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CustomResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_transport(config, Arc::new(NetworkTransport))
    }

    pub fn with_transport(config: ResolverConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Same transport, network and timeout, different name server
    pub fn for_name_server(&self, name_server: SocketAddr) -> Self {
        Self {
            config: ResolverConfig {
                name_server,
                ..self.config.clone()
            },
            transport: Arc::clone(&self.transport),
        }
    }

    /// Send one recursive query with EDNS0 (payload 4096, DO set).
    ///
    /// NXDOMAIN is returned as a normal, empty response; any other
    /// non-zero RCODE is a [`InspectorError::ServerFailure`].
    pub async fn query(&self, name: &str, qtype: DNSResourceType) -> Result<DNSPacket> {
        let id = QUERY_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let query = DNSPacket::query(
            id,
            name,
            qtype,
            Some(EdnsOpt::dnssec_ok(EDNS_UDP_PAYLOAD_SIZE)),
        );

        debug!(
            "Querying {} for {} {} over {}",
            self.config.name_server, name, qtype, self.config.network
        );

        let response = timeout(
            self.config.timeout,
            self.transport.exchange(&self.config, &query),
        )
        .await
        .map_err(|_| InspectorError::Timeout(self.config.timeout.as_millis()))??;

        if response.header.id != id {
            return Err(InspectorError::Malformed(format!(
                "response ID {} does not match query ID {}",
                response.header.id, id
            )));
        }

        if response.header.tc {
            return Err(InspectorError::Truncated(self.config.name_server.to_string()));
        }

        match response.header.rcode {
            DNSRcode::NOERROR | DNSRcode::NXDOMAIN => {}
            rcode => {
                return Err(InspectorError::ServerFailure {
                    name: name.to_string(),
                    rcode,
                });
            }
        }

        trace!(
            "Response for {} {}: {} answers, {} authorities",
            name,
            qtype,
            response.answers.len(),
            response.authorities.len()
        );
        Ok(response)
    }

    /// Look up `_service._protocol.name.`.
    ///
    /// Returns the canonical name (absolute, trailing dot, case as served)
    /// and every SRV record in the answer section. The canonical name is
    /// the owner of the first SRV record, or the query name when there
    /// is none.
    pub async fn lookup_srv(
        &self,
        service: &str,
        protocol: &str,
        name: &str,
    ) -> Result<(String, Vec<SrvRdata>)> {
        let owner = format!("_{}._{}.{}", service, protocol, name.trim_end_matches('.'));
        let response = self.query(&owner, DNSResourceType::SRV).await?;

        let mut canonical = owner;
        let mut records = Vec::new();
        for rr in response.answers_of(DNSResourceType::SRV) {
            if let RData::SRV(srv) = &rr.rdata {
                if records.is_empty() {
                    canonical = rr.name.clone();
                }
                records.push(srv.clone());
            }
        }

        Ok((format!("{}.", canonical), records))
    }

    /// IPv4 then IPv6 addresses for `host`.
    ///
    /// A failed A or AAAA query is only an error when the other one
    /// produced no address either.
    pub async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>> {
        let mut addresses = Vec::new();
        let mut last_error = None;
        for qtype in [DNSResourceType::A, DNSResourceType::AAAA] {
            match self.query(host, qtype).await {
                Ok(response) => {
                    addresses.extend(response.answers.iter().filter_map(|rr| match rr.rdata {
                        RData::A(v4) => Some(IpAddr::V4(v4)),
                        RData::AAAA(v6) => Some(IpAddr::V6(v6)),
                        _ => None,
                    }));
                }
                Err(e) => {
                    debug!("{} lookup for {} failed: {}", qtype, host, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if addresses.is_empty() => Err(e),
            _ => Ok(addresses),
        }
    }

    /// Name server host names for `zone`
    pub async fn lookup_ns(&self, zone: &str) -> Result<Vec<String>> {
        let response = self.query(zone, DNSResourceType::NS).await?;
        Ok(collect(&response, |rdata| match rdata {
            RData::NS(host) => Some(host.clone()),
            _ => None,
        }))
    }

    pub async fn lookup_ds(&self, name: &str) -> Result<Vec<DsRdata>> {
        let response = self.query(name, DNSResourceType::DS).await?;
        Ok(collect(&response, |rdata| match rdata {
            RData::DS(ds) => Some(ds.clone()),
            _ => None,
        }))
    }

    pub async fn lookup_dnskey(&self, name: &str) -> Result<Vec<DnskeyRdata>> {
        let response = self.query(name, DNSResourceType::DNSKEY).await?;
        Ok(collect(&response, |rdata| match rdata {
            RData::DNSKEY(key) => Some(key.clone()),
            _ => None,
        }))
    }

    /// First answer record of `qtype` at `name`, if any
    pub async fn lookup_first(&self, name: &str, qtype: DNSResourceType) -> Result<Option<RData>> {
        let response = self.query(name, qtype).await?;
        Ok(response.answers_of(qtype).next().map(|rr| rr.rdata.clone()))
    }
}

fn collect<T>(packet: &DNSPacket, pick: impl Fn(&RData) -> Option<T>) -> Vec<T> {
    packet.answers.iter().filter_map(|rr| pick(&rr.rdata)).collect()
}
