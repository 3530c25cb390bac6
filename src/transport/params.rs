//! Connection parameters
//!
//! This module provides the parameter record handed to a transport binding and
//! a builder for it.

use super::{Error, Result, DEFAULT_HANDSHAKE_TIMEOUT_MS};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TLS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Parse TLS version from string (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TLSV1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(Error::InvalidConfig(format!("unsupported TLS version: {}", s))),
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

/// Parameters for one TLS connection (immutable once built)
///
/// The first seven fields are what every binding understands. The remaining
/// ones are optional refinements; their defaults leave behavior to the
/// binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConnectParams {
    /// Root CA file (PEM) used to validate the server chain
    pub root_ca: Option<PathBuf>,
    /// Device certificate file (PEM), presented for mutual TLS
    pub device_cert: Option<PathBuf>,
    /// Device private key file (PEM)
    pub device_key: Option<PathBuf>,
    /// Endpoint host name or IP address
    pub host: String,
    /// Endpoint port
    pub port: u16,
    /// Budget for TCP connect plus TLS handshake, in milliseconds
    pub handshake_timeout_ms: u32,
    /// Validate the server certificate chain and host name.
    /// Disabling this is NOT recommended outside of testing.
    pub verify_server: bool,
    /// ALPN protocols offered to the server, in preference order
    pub alpn: Vec<String>,
    /// Lowest protocol version accepted
    pub min_version: Option<TlsVersion>,
    /// How long a read waits for data before reporting zero bytes.
    /// `None` blocks until data or an error arrives.
    pub read_timeout: Option<Duration>,
    /// How long a write waits for the socket to become writable before
    /// reporting zero bytes. `None` blocks.
    pub write_timeout: Option<Duration>,
}

impl TlsConnectParams {
    /// Create parameters from the seven core fields
    ///
    /// The result is not validated; `validate()` runs when the parameters are
    /// bound to a `NetworkContext`.
    pub fn new(
        root_ca: Option<impl AsRef<Path>>,
        device_cert: Option<impl AsRef<Path>>,
        device_key: Option<impl AsRef<Path>>,
        host: impl Into<String>,
        port: u16,
        handshake_timeout_ms: u32,
        verify_server: bool,
    ) -> Self {
        TlsConnectParams {
            root_ca: root_ca.map(|p| p.as_ref().to_path_buf()),
            device_cert: device_cert.map(|p| p.as_ref().to_path_buf()),
            device_key: device_key.map(|p| p.as_ref().to_path_buf()),
            host: host.into(),
            port,
            handshake_timeout_ms,
            verify_server,
            alpn: Vec::new(),
            min_version: None,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Create a parameters builder for `host:port`
    pub fn builder(host: impl Into<String>, port: u16) -> TlsConnectParamsBuilder {
        TlsConnectParamsBuilder::new(host.into(), port)
    }

    /// Handshake timeout as a `Duration`
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.handshake_timeout_ms))
    }

    /// Host without IPv6 brackets
    pub fn bare_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// Host parsed as an IP address, if it is one
    pub fn host_ip(&self) -> Option<IpAddr> {
        self.bare_host().parse().ok()
    }

    /// Check that the parameters describe a connection a binding can attempt
    pub fn validate(&self) -> Result<()> {
        if self.bare_host().trim().is_empty() {
            return Err(Error::InvalidConfig("destination host is empty".to_string()));
        }

        if self.port == 0 {
            return Err(Error::InvalidConfig("destination port is 0".to_string()));
        }

        if self.handshake_timeout_ms == 0 {
            return Err(Error::InvalidConfig("handshake timeout is 0".to_string()));
        }

        match (&self.device_cert, &self.device_key) {
            (Some(_), None) => {
                return Err(Error::InvalidConfig(
                    "device certificate given without a private key".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::InvalidConfig(
                    "device private key given without a certificate".to_string(),
                ));
            }
            _ => {}
        }

        for proto in &self.alpn {
            if proto.is_empty() || proto.len() > 255 {
                return Err(Error::InvalidConfig(format!(
                    "invalid ALPN protocol length: {:?}",
                    proto
                )));
            }
        }

        Ok(())
    }
}

/// Builder for `TlsConnectParams`
#[derive(Debug, Clone)]
pub struct TlsConnectParamsBuilder {
    params: TlsConnectParams,
}

impl TlsConnectParamsBuilder {
    fn new(host: String, port: u16) -> Self {
        TlsConnectParamsBuilder {
            params: TlsConnectParams {
                root_ca: None,
                device_cert: None,
                device_key: None,
                host,
                port,
                handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
                verify_server: true,
                alpn: Vec::new(),
                min_version: None,
                read_timeout: None,
                write_timeout: None,
            },
        }
    }

    /// Set root CA file
    pub fn root_ca(mut self, path: impl AsRef<Path>) -> Self {
        self.params.root_ca = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set device certificate and private key files
    pub fn device_identity(mut self, cert: impl AsRef<Path>, key: impl AsRef<Path>) -> Self {
        self.params.device_cert = Some(cert.as_ref().to_path_buf());
        self.params.device_key = Some(key.as_ref().to_path_buf());
        self
    }

    /// Set handshake timeout in milliseconds
    pub fn handshake_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.params.handshake_timeout_ms = timeout_ms;
        self
    }

    /// Enable/disable server verification
    pub fn verify_server(mut self, verify: bool) -> Self {
        self.params.verify_server = verify;
        self
    }

    /// Set ALPN protocols
    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        self.params.alpn = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Set minimum TLS version
    pub fn min_version(mut self, version: TlsVersion) -> Self {
        self.params.min_version = Some(version);
        self
    }

    /// Set read poll timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.params.read_timeout = Some(timeout);
        self
    }

    /// Set write poll timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.params.write_timeout = Some(timeout);
        self
    }

    /// Validate and build the parameters
    pub fn build(self) -> Result<TlsConnectParams> {
        self.params.validate()?;
        Ok(self.params)
    }
}
