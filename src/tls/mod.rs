//! OpenSSL transport binding
//!
//! This module implements `NetworkOps` over a blocking TCP socket secured
//! with OpenSSL. It is the binding `NetworkContext::init` attaches by default.
//!
//! # Architecture
//!
//! 1. `config` turns `TlsConnectParams` into an `SslContext` (trust anchors,
//!    device identity, ALPN, protocol floor) and a per-connection `Ssl`
//!    (SNI, host name checks)
//! 2. `handshake` drives the client handshake against a deadline
//! 3. `OpensslTransport` owns the resulting `SslStream` and serves
//!    read/write/disconnect/destroy
//!
//! Certificate and key files are read on every `connect`, so rotated files are
//! picked up by the next connection.
//!
//! # Examples
//!
//! ```no_run
//! use tlsnet::tls::OpensslTransport;
//! use tlsnet::{NetworkContext, TlsConnectParams};
//!
//! let params = TlsConnectParams::builder("broker.example.com", 8883)
//!     .root_ca("ca.pem")
//!     .device_identity("cert.pem", "key.pem")
//!     .alpn(&["x-amzn-mqtt-ca"])
//!     .build()
//!     .unwrap();
//!
//! let mut network = NetworkContext::new();
//! network.init_with(OpensslTransport::new(), params).unwrap();
//! network.connect().unwrap();
//! ```

pub mod cert;
pub mod config;
pub mod handshake;
pub mod session;


pub use session::OpensslTransport;
