//! TLS session operations
//!
//! This module implements the `NetworkOps` trait on top of an OpenSSL
//! `SslStream` over a blocking TCP socket.

use super::{cert, config, handshake};
use crate::net;
use crate::transport::{Error, NetworkOps, Result, SessionInfo, TlsConnectParams};
use openssl::ssl::{SslRef, SslStream};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// Poll events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollEvents {
    Read,
    Write,
}

/// State of one established connection
struct TlsSession {
    stream: SslStream<TcpStream>,
    info: SessionInfo,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    failed: bool,
}

/// OpenSSL transport binding
///
/// Holds at most one live session. The session is created by `connect`,
/// dropped by `disconnect` or `destroy`, and never exposed to callers.
#[derive(Default)]
pub struct OpensslTransport {
    session: Option<TlsSession>,
}

impl OpensslTransport {
    /// Create a binding with no session
    pub fn new() -> Self {
        OpensslTransport { session: None }
    }

    /// Check if a session is open
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session_mut(&mut self) -> Result<&mut TlsSession> {
        self.session.as_mut().ok_or(Error::NotConnected)
    }
}

impl NetworkOps for OpensslTransport {
    fn connect(&mut self, params: &TlsConnectParams) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::AlreadyConnected);
        }

        params.validate()?;

        let ctx = config::build_context(params)?;
        let ssl = config::configure_ssl(&ctx, params)?;

        // The budget covers TCP connect plus handshake, not name resolution
        let addrs = net::resolve(&params.host, params.port)?;
        let timeout = params.handshake_timeout();
        let deadline = Instant::now() + timeout;

        let tcp_stream = net::connect_timeout(&addrs, deadline)?;
        log::debug!(
            "tcp connected to {}:{}, starting handshake",
            params.host,
            params.port
        );

        let stream = handshake::connect(ssl, tcp_stream, deadline, timeout, params.verify_server)?;

        // Handshake budget no longer applies; I/O waits are bounded by the
        // read/write timeouts instead.
        stream.get_ref().set_read_timeout(params.read_timeout.map(socket_timeout))?;
        stream.get_ref().set_write_timeout(params.write_timeout.map(socket_timeout))?;

        let info = describe(stream.ssl(), params.verify_server);
        log::debug!(
            "handshake complete: {} {} alpn={:?}",
            info.version,
            info.cipher,
            info.alpn
        );

        self.session = Some(TlsSession {
            stream,
            info,
            read_timeout: params.read_timeout,
            write_timeout: params.write_timeout,
            failed: false,
        });

        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let session = self.session_mut()?;
        if buf.is_empty() {
            return Ok(0);
        }

        // Decrypted bytes may already be buffered inside OpenSSL
        if session.stream.ssl().pending() == 0 {
            if let Some(timeout) = session.read_timeout {
                if !poll(&session.stream, PollEvents::Read, timeout)? {
                    return Ok(0);
                }
            }
        }

        match session.stream.read(buf) {
            Ok(0) => {
                session.failed = true;
                Err(Error::ConnectionClosed)
            }
            Ok(n) => Ok(n),
            Err(e) if is_retryable(&e) => Ok(0),
            Err(e) => {
                session.failed = true;
                Err(Error::Io(e))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let session = self.session_mut()?;
        if buf.is_empty() {
            return Ok(0);
        }

        if let Some(timeout) = session.write_timeout {
            if !poll(&session.stream, PollEvents::Write, timeout)? {
                return Ok(0);
            }
        }

        match session.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if is_retryable(&e) => Ok(0),
            Err(e) => {
                session.failed = true;
                Err(Error::Io(e))
            }
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(Error::NotConnected)?;

        // Send close_notify if the session is still healthy
        if !session.failed {
            if let Err(e) = session.stream.shutdown() {
                log::debug!("close_notify failed: {}", e);
            }
        }

        match session.stream.get_mut().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn destroy(&mut self) -> Result<()> {
        self.session = None;
        Ok(())
    }

    fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| s.info.clone())
    }

    fn name(&self) -> &'static str {
        "openssl"
    }
}

/// Build session details from an SSL connection
fn describe(ssl: &SslRef, verified: bool) -> SessionInfo {
    SessionInfo {
        version: ssl.version_str().to_string(),
        cipher: ssl
            .current_cipher()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "<undef>".to_string()),
        servername: ssl
            .servername(openssl::ssl::NameType::HOST_NAME)
            .map(|s| s.to_string()),
        alpn: ssl
            .selected_alpn_protocol()
            .map(|p| String::from_utf8_lossy(p).to_string()),
        verified,
        cert_chain: cert::peer_chain(ssl),
    }
}

/// Socket timeouts cannot be zero; a zero poll timeout still bounds the
/// record read that follows a successful poll.
fn socket_timeout(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Wait until the socket is ready for `events` or `timeout` elapses
fn poll(stream: &SslStream<TcpStream>, events: PollEvents, timeout: Duration) -> Result<bool> {
    use libc::{poll, pollfd, POLLIN, POLLOUT};

    let mut pfd = pollfd {
        fd: stream.get_ref().as_raw_fd(),
        events: match events {
            PollEvents::Read => POLLIN,
            PollEvents::Write => POLLOUT,
        },
        revents: 0,
    };

    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(Error::Io(err));
    }

    Ok(result > 0)
}
