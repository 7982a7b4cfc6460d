//! Certificate check of the host that serves the paymail API.
//!
//! Every address of the host is dialled on port 443. The host passes
//! when at least one address completes a TLS handshake with a
//! certificate that chains to a web PKI root, names the host and stays
//! valid for at least another day.

use crate::error::{InspectorError, Result};
use crate::resolver::CustomResolver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, info};

pub const HTTPS_PORT: u16 = 443;

/// Per-address connect and handshake timeout used when none is configured
pub const DEFAULT_SSL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a certificate must remain valid past the handshake
pub const MIN_REMAINING_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// One TLS handshake with one address, verifying the certificate for `host`
#[async_trait]
pub trait TlsHandshake: Send + Sync {
    async fn handshake(&self, host: &str, address: SocketAddr) -> Result<()>;
}

/// Handshakes with rustls against the bundled web PKI roots
#[derive(Debug, Default, Clone, Copy)]
pub struct RustlsHandshake;

static CLIENT_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

fn client_config() -> Result<Arc<ClientConfig>> {
    if let Some(config) = CLIENT_CONFIG.get() {
        return Ok(Arc::clone(config));
    }

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let webpki = WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| InspectorError::Tls {
            address: "-".to_string(),
            reason: format!("cannot build certificate verifier: {}", e),
        })?;

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(ExpiryMarginVerifier {
            inner: webpki,
            margin: MIN_REMAINING_VALIDITY,
        }))
        .with_no_client_auth();

    Ok(Arc::clone(CLIENT_CONFIG.get_or_init(|| Arc::new(config))))
}

/// Web PKI verification evaluated `margin` in the future, so a
/// certificate about to expire is rejected like an expired one.
#[derive(Debug)]
struct ExpiryMarginVerifier {
    inner: Arc<WebPkiServerVerifier>,
    margin: Duration,
}

impl ServerCertVerifier for ExpiryMarginVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let later = UnixTime::since_unix_epoch(Duration::from_secs(now.as_secs()) + self.margin);
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, later)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[async_trait]
impl TlsHandshake for RustlsHandshake {
    async fn handshake(&self, host: &str, address: SocketAddr) -> Result<()> {
        let tls_error = |reason: String| InspectorError::Tls {
            address: address.to_string(),
            reason,
        };

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| tls_error(format!("invalid server name {}: {}", host, e)))?;
        let connector = TlsConnector::from(client_config()?);

        let stream = TcpStream::connect(address).await?;
        let mut tls = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| tls_error(e.to_string()))?;

        let _ = tls.shutdown().await;
        Ok(())
    }
}

/// Certificate check of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslOutcome {
    pub host: String,
    /// At least one address presented an acceptable certificate
    pub valid: bool,
    /// Addresses dialled, in lookup order
    pub addresses: Vec<IpAddr>,
    /// `address: reason` for each address that failed
    pub failures: Vec<String>,
    /// Set when the host could not be resolved and nothing was dialled
    pub error: Option<String>,
}

impl SslOutcome {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            valid: false,
            addresses: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }
}

impl fmt::Display for SslOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "SSL: failed for {}: {}", self.host, error);
        }
        if self.valid {
            write!(
                f,
                "SSL: valid for {} ({} address(es) checked)",
                self.host,
                self.addresses.len()
            )
        } else {
            write!(f, "SSL: no valid certificate for {}", self.host)?;
            for failure in &self.failures {
                write!(f, "\n  {}", failure)?;
            }
            Ok(())
        }
    }
}

/// Resolve `host` with `resolver` and try a handshake with each address
pub async fn check_ssl(
    resolver: &CustomResolver,
    tls: &dyn TlsHandshake,
    host: &str,
    handshake_timeout: Duration,
) -> SslOutcome {
    let host = host.trim_end_matches('.');
    let mut outcome = SslOutcome::new(host);

    let addresses = match resolver.lookup_ip(host).await {
        Ok(addresses) if addresses.is_empty() => {
            outcome.error = Some(InspectorError::TargetUnresolvable(host.to_string()).to_string());
            return outcome;
        }
        Ok(addresses) => addresses,
        Err(e) => {
            info!("Address lookup for {} failed: {}", host, e);
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    for ip in addresses {
        let address = SocketAddr::new(ip, HTTPS_PORT);
        debug!("TLS handshake with {} for {}", address, host);

        let result = match timeout(handshake_timeout, tls.handshake(host, address)).await {
            Ok(result) => result,
            Err(_) => Err(InspectorError::Tls {
                address: address.to_string(),
                reason: format!("timed out after {}ms", handshake_timeout.as_millis()),
            }),
        };

        outcome.addresses.push(ip);
        match result {
            Ok(()) => outcome.valid = true,
            Err(e) => {
                debug!("Certificate check of {} at {} failed: {}", host, address, e);
                outcome.failures.push(format!("{}: {}", ip, e));
            }
        }
    }

    outcome
}
