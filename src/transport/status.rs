//! Integer status codes
//!
//! Protocol engines built around a C-style seam expect a single integer status
//! space: zero for success, a non-negative byte count for I/O, and negative
//! values for failures. This module maps `Error` variants onto that space.

use super::Error;

/// Success
pub const SUCCESS: i32 = 0;
/// Unspecified failure
pub const FAILURE: i32 = -1;
/// Invalid parameter or configuration
pub const INVALID_PARAM: i32 = -2;
/// Operation not valid in the handle's current state
pub const INVALID_STATE: i32 = -3;
/// Handle not initialized
pub const NOT_INITIALIZED: i32 = -4;
/// Handle not connected
pub const NOT_CONNECTED: i32 = -5;
/// Handle already connected
pub const ALREADY_CONNECTED: i32 = -6;
/// Handle destroyed
pub const DESTROYED: i32 = -7;
/// Host resolution failed
pub const DNS_FAILED: i32 = -20;
/// TCP connect failed
pub const SOCKET_FAILED: i32 = -21;
/// Socket read/write failed
pub const IO_FAILED: i32 = -22;
/// Peer closed the connection
pub const CONNECTION_CLOSED: i32 = -23;
/// TLS context setup failed
pub const TLS_INIT_FAILED: i32 = -40;
/// Certificate or key could not be loaded
pub const CERT_LOAD_FAILED: i32 = -41;
/// TLS handshake failed
pub const HANDSHAKE_FAILED: i32 = -42;
/// Peer certificate chain or identity rejected
pub const VERIFICATION_FAILED: i32 = -43;
/// Connect or handshake exceeded its timeout
pub const TIMEOUT: i32 = -44;

pub(crate) fn code_of(err: &Error) -> i32 {
    use crate::net::Error as NetError;

    match err {
        Error::Io(_) => IO_FAILED,
        Error::Network(NetError::Resolve { .. } | NetError::NoAddress(_)) => DNS_FAILED,
        Error::Network(NetError::Connect { .. }) => SOCKET_FAILED,
        Error::Network(NetError::Timeout(_)) => TIMEOUT,
        Error::OpenSsl(_) => TLS_INIT_FAILED,
        Error::InvalidConfig(_) | Error::ParamsMismatch => INVALID_PARAM,
        Error::Certificate(_) => CERT_LOAD_FAILED,
        Error::HandshakeFailed(_) => HANDSHAKE_FAILED,
        Error::VerificationFailed(_) => VERIFICATION_FAILED,
        Error::HandshakeTimeout(_) => TIMEOUT,
        Error::ConnectionClosed => CONNECTION_CLOSED,
        Error::NotInitialized => NOT_INITIALIZED,
        Error::NotConnected => NOT_CONNECTED,
        Error::AlreadyConnected => ALREADY_CONNECTED,
        Error::Destroyed => DESTROYED,
        Error::InvalidState(_) => INVALID_STATE,
    }
}

/// Flatten a byte-count result into the integer status space
///
/// Counts that do not fit in an `i32` saturate at `i32::MAX`.
pub fn to_status(result: &super::Result<usize>) -> i32 {
    match result {
        Ok(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        Err(e) => e.code(),
    }
}

/// Flatten a unit result into the integer status space
pub fn to_code(result: &super::Result<()>) -> i32 {
    match result {
        Ok(()) => SUCCESS,
        Err(e) => e.code(),
    }
}
