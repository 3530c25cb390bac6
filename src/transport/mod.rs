//! Transport abstraction for MQTT/HTTP clients
//!
//! This module defines the seam between a protocol engine and whatever
//! secure-transport technology a platform provides.
//!
//! # Architecture
//!
//! - `NetworkOps` is the capability set (connect, read, write, disconnect,
//!   destroy) a platform binding implements
//! - `TlsConnectParams` carries the identity material, endpoint and policy for
//!   one connection
//! - `NetworkContext` is the transport handle: it owns the binding and a copy of
//!   the parameters, and enforces the connection state machine
//!
//! All protocol I/O goes through `NetworkContext`, so the protocol code never
//! sees the binding's private session.
//!
//! # Examples
//!
//! ```no_run
//! use tlsnet::NetworkContext;
//!
//! let mut network = NetworkContext::new();
//! network
//!     .init(
//!         Some("ca.pem"),
//!         Some("cert.pem"),
//!         Some("key.pem"),
//!         "broker.example.com",
//!         8883,
//!         5000,
//!         true,
//!     )
//!     .unwrap();
//!
//! network.connect().unwrap();
//! let n = network.write(b"PING").unwrap();
//! assert!(n <= 4);
//!
//! let mut buf = [0u8; 64];
//! let _ = network.read(&mut buf).unwrap();
//!
//! network.disconnect().unwrap();
//! network.destroy().unwrap();
//! ```

pub mod context;
pub mod info;
pub mod ops;
pub mod params;
pub mod status;

pub use context::{NetworkContext, State};
pub use info::{CertInfo, SessionInfo};
pub use ops::NetworkOps;
pub use params::{TlsConnectParams, TlsConnectParamsBuilder, TlsVersion};

use std::io;
use std::time::Duration;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Default handshake timeout in milliseconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u32 = 10_000;

/// Default port for MQTT over TLS
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] crate::net::Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Server verification failed: {0}")]
    VerificationFailed(String),

    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport not initialized")]
    NotInitialized,

    #[error("Transport not connected")]
    NotConnected,

    #[error("Transport already connected")]
    AlreadyConnected,

    #[error("Transport destroyed")]
    Destroyed,

    #[error("Operation not allowed in state {0:?}")]
    InvalidState(State),

    #[error("Connection parameters differ from those bound at initialization")]
    ParamsMismatch,
}

impl Error {
    /// Integer status code for this error (always negative)
    pub fn code(&self) -> i32 {
        status::code_of(self)
    }

    /// Whether this error reports a contract violation rather than a
    /// transport failure
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Error::NotInitialized
                | Error::NotConnected
                | Error::AlreadyConnected
                | Error::Destroyed
                | Error::InvalidState(_)
        )
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Io(e) => e.kind(),
            Error::ConnectionClosed => io::ErrorKind::ConnectionAborted,
            Error::HandshakeTimeout(_) | Error::Network(crate::net::Error::Timeout(_)) => {
                io::ErrorKind::TimedOut
            }
            Error::NotInitialized | Error::NotConnected | Error::Destroyed => {
                io::ErrorKind::NotConnected
            }
            Error::InvalidConfig(_) | Error::ParamsMismatch => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
