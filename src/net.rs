//! Socket helpers
//!
//! Host resolution and deadline-bounded TCP connect used by socket-backed
//! transport bindings.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Instant;

/// Result type for socket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Socket errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("No addresses found for {0}")]
    NoAddress(String),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Connect to {0} timed out")]
    Timeout(String),
}

/// Resolve `host:port` into socket addresses
///
/// Bracketed IPv6 literals (`[::1]`) are accepted as well as bare ones.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');

    let addrs: Vec<SocketAddr> = (bare, port)
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(Error::NoAddress(host.to_string()));
    }

    Ok(addrs)
}

/// Connect to the first reachable address before `deadline`
///
/// Addresses are tried in order. Each attempt gets whatever is left of the
/// budget; the last connect error is reported if every address fails.
pub fn connect_timeout(addrs: &[SocketAddr], deadline: Instant) -> Result<TcpStream> {
    let mut last_err = None;

    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match connect_one(addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                log::debug!("connect to {} timed out", addr);
                last_err = Some(Error::Timeout(addr.to_string()));
            }
            Err(source) => {
                log::debug!("connect to {} failed: {}", addr, source);
                last_err = Some(Error::Connect { addr: *addr, source });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        let target = addrs
            .first()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        Error::Timeout(target)
    }))
}

fn connect_one(addr: &SocketAddr, timeout: std::time::Duration) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect_timeout(&SockAddr::from(*addr), timeout)?;
    socket.set_nodelay(true)?;
    Ok(socket.into())
}
