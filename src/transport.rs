//! Transport factory seam and the TCP/TLS connector.
//!
//! The connection engine never opens sockets itself; it asks a
//! [`TransportFactory`] for a duplex byte stream and reads lines off it.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::config::ConnectorConfig;

/// Any duplex byte stream the engine can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens transports for the connection manager.
#[async_trait]
pub trait TransportFactory: Send + Sync + 'static {
    /// Open a fresh transport.
    async fn open(&self) -> io::Result<BoxedStream>;

    /// Registration completed over the last opened transport.
    fn logical_success(&self) {}

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}

/// Connects to a list of `host:port` servers over TCP, optionally with TLS.
///
/// A server that refuses us, or lets us connect but never lets us register,
/// is rotated out in favour of the next one on the list. Once registration
/// succeeds the current server sticks.
pub struct TcpConnector {
    servers: Vec<String>,
    tls: Option<TlsConnector>,
    cursor: AtomicUsize,
    unconfirmed: AtomicBool,
}

impl TcpConnector {
    /// Plain TCP connector.
    pub fn new(servers: Vec<String>) -> Self {
        Self {
            servers,
            tls: None,
            cursor: AtomicUsize::new(0),
            unconfirmed: AtomicBool::new(false),
        }
    }

    /// Wrap every connection in TLS, verified against the system roots.
    pub fn with_tls(mut self) -> Self {
        self.tls = Some(native_tls_connector());
        self
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        let connector = Self::new(config.servers.clone());
        if config.tls {
            connector.with_tls()
        } else {
            connector
        }
    }

    /// Server the next `open` will try.
    pub fn current(&self) -> Option<&str> {
        if self.servers.is_empty() {
            return None;
        }
        let idx = self.cursor.load(Ordering::Relaxed) % self.servers.len();
        Some(&self.servers[idx])
    }

    fn rotate(&self) {
        let previous = self.cursor.fetch_add(1, Ordering::Relaxed);
        if self.servers.len() > 1 {
            debug!(
                from = %self.servers[previous % self.servers.len()],
                to = %self.servers[(previous + 1) % self.servers.len()],
                "rotating server"
            );
        }
    }

    fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }

    async fn connect(&self, server: &str) -> io::Result<BoxedStream> {
        let stream = TcpStream::connect(server).await?;
        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        let Some(tls) = &self.tls else {
            return Ok(Box::new(stream));
        };

        let server_name = ServerName::try_from(hostname(server).to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let stream = tls.connect(server_name, stream).await?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl TransportFactory for TcpConnector {
    async fn open(&self) -> io::Result<BoxedStream> {
        // Connected last time but never registered.
        if self.unconfirmed.swap(false, Ordering::Relaxed) {
            self.rotate();
        }

        let server = self
            .current()
            .map(str::to_owned)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no servers configured"))?;

        match self.connect(&server).await {
            Ok(stream) => {
                self.unconfirmed.store(true, Ordering::Relaxed);
                Ok(stream)
            }
            Err(e) => {
                self.rotate();
                Err(e)
            }
        }
    }

    fn logical_success(&self) {
        if self.unconfirmed.swap(false, Ordering::Relaxed) {
            if let Some(server) = self.current() {
                info!(server = %server, "server confirmed");
            }
        }
    }

    fn describe(&self) -> String {
        let target = self.current().unwrap_or("<none>");
        if self.tls.is_some() {
            format!("{target} (tls)")
        } else {
            target.to_string()
        }
    }
}

/// Host part of `host:port`, with IPv6 brackets removed.
fn hostname(server: &str) -> &str {
    let host = match server.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => server,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}

fn native_tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
