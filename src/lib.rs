//! tlsnet - TLS network transport seam for MQTT/HTTP clients
//!
//! This crate provides the transport abstraction a protocol engine talks to
//! (connect/read/write/disconnect/destroy behind a capability trait) together
//! with a blocking OpenSSL platform binding that implements it.

pub mod net;
pub mod tls;
pub mod transport;

pub use transport::{Error, NetworkContext, NetworkOps, Result, State, TlsConnectParams};
