//! TLS handshake logic
//!
//! The client handshake runs on a blocking socket whose read/write timeouts
//! are set to what is left of the connect budget. Whenever OpenSSL reports
//! that it would block, the budget is checked and the handshake resumed.

use crate::transport::{Error, Result};
use openssl::ssl::{HandshakeError, MidHandshakeSslStream, Ssl, SslStream};
use openssl::x509::X509VerifyResult;
use std::io;
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Complete a client handshake on `stream` before `deadline`
///
/// `timeout` is only used to report the configured budget in
/// `Error::HandshakeTimeout`. With `verify` set, a rejected peer chain or host
/// name is reported as `Error::VerificationFailed`.
pub fn connect(
    ssl: Ssl,
    stream: TcpStream,
    deadline: Instant,
    timeout: Duration,
    verify: bool,
) -> Result<SslStream<TcpStream>> {
    let budget = time_left(deadline).ok_or(Error::HandshakeTimeout(timeout))?;
    set_socket_timeouts(&stream, budget)?;

    let mut attempt = ssl.connect(stream);

    loop {
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(HandshakeError::SetupFailure(e)) => return Err(Error::OpenSsl(e)),
            Err(HandshakeError::Failure(mid)) => {
                return Err(classify_failure(&mid, deadline, timeout, verify));
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                let budget = match time_left(deadline) {
                    Some(budget) => budget,
                    None => return Err(Error::HandshakeTimeout(timeout)),
                };
                set_socket_timeouts(mid.get_ref(), budget)?;
                attempt = mid.handshake();
            }
        }
    }
}

fn time_left(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        None
    } else {
        Some(left)
    }
}

fn set_socket_timeouts(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))
}

fn classify_failure(
    mid: &MidHandshakeSslStream<TcpStream>,
    deadline: Instant,
    timeout: Duration,
    verify: bool,
) -> Error {
    if verify {
        let result = mid.ssl().verify_result();
        if result != X509VerifyResult::OK {
            return Error::VerificationFailed(result.error_string().to_string());
        }
    }

    let timed_out = mid
        .error()
        .io_error()
        .map(|e| matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut))
        .unwrap_or(false);

    if timed_out || time_left(deadline).is_none() {
        return Error::HandshakeTimeout(timeout);
    }

    Error::HandshakeFailed(mid.error().to_string())
}
