//! Transport operations trait
//!
//! `NetworkOps` is the capability set a platform binding provides. A
//! `NetworkContext` holds exactly one implementation and routes every protocol
//! operation through it.

use super::{Result, SessionInfo, TlsConnectParams};

/// Capability set implemented by a platform binding
///
/// Implementations own their private session state. They may assume the
/// caller (`NetworkContext`) issues operations in state-machine order:
/// `connect`, any number of `read`/`write`, `disconnect`, and finally
/// `destroy`. They must still fail rather than panic when that order is not
/// kept.
pub trait NetworkOps: Send {
    /// Open the socket and complete the TLS handshake
    ///
    /// Must not block beyond `params.handshake_timeout()`. On error no partial
    /// session may remain usable.
    fn connect(&mut self, params: &TlsConnectParams) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Returns the number of bytes copied, which may be less than requested.
    /// Zero means no data was available within the binding's read timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes
    ///
    /// Returns the number of bytes accepted, which may be less than
    /// requested; the caller resubmits the remainder.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Tear down the secured channel and the socket
    fn disconnect(&mut self) -> Result<()>;

    /// Release every resource held by the binding
    fn destroy(&mut self) -> Result<()>;

    /// Details of the established session, if connected
    fn session_info(&self) -> Option<SessionInfo> {
        None
    }

    /// Short name used in log messages
    fn name(&self) -> &'static str {
        "network"
    }
}

impl<T: NetworkOps + ?Sized> NetworkOps for Box<T> {
    fn connect(&mut self, params: &TlsConnectParams) -> Result<()> {
        (**self).connect(params)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn destroy(&mut self) -> Result<()> {
        (**self).destroy()
    }

    fn session_info(&self) -> Option<SessionInfo> {
        (**self).session_info()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
