//! Transport handle
//!
//! `NetworkContext` is the object a protocol engine holds for one secured
//! connection. It binds a `NetworkOps` implementation, keeps the parameters it
//! was initialized with, and rejects operations issued out of order.

use super::{Error, NetworkOps, Result, SessionInfo, TlsConnectParams};
use crate::tls::OpensslTransport;
use std::io;
use std::path::Path;

/// Lifecycle state of a `NetworkContext`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No binding attached yet
    Uninitialized,
    /// Binding and parameters attached, no channel open
    Initialized,
    /// Secured channel ready for application data
    Connected,
    /// Channel torn down; may connect again
    Disconnected,
    /// Resources released (terminal until re-initialized)
    Destroyed,
}

/// Transport handle for one secured connection
///
/// State machine:
///
/// ```text
/// Uninitialized -> Initialized -> Connected <-> (read/write)
///                       ^             |
///                       |             v
///                  (re-init)     Disconnected -> Connected ...
///                       |
///                  Destroyed <- any state
/// ```
///
/// A failed connect leaves the handle in the state it was in before the
/// attempt, so it can be retried or destroyed.
pub struct NetworkContext {
    ops: Option<Box<dyn NetworkOps>>,
    params: Option<TlsConnectParams>,
    state: State,
}

impl NetworkContext {
    /// Create an uninitialized handle
    pub fn new() -> Self {
        NetworkContext {
            ops: None,
            params: None,
            state: State::Uninitialized,
        }
    }

    /// Initialize the handle with the default OpenSSL binding
    ///
    /// Stores the parameters and binds the platform operations. No socket is
    /// opened and no file is read until `connect`.
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        root_ca: Option<impl AsRef<Path>>,
        device_cert: Option<impl AsRef<Path>>,
        device_key: Option<impl AsRef<Path>>,
        host: &str,
        port: u16,
        handshake_timeout_ms: u32,
        verify_server: bool,
    ) -> Result<()> {
        let params = TlsConnectParams::new(
            root_ca,
            device_cert,
            device_key,
            host,
            port,
            handshake_timeout_ms,
            verify_server,
        );
        self.init_with(OpensslTransport::new(), params)
    }

    /// Initialize the handle with any binding
    pub fn init_with<O>(&mut self, ops: O, params: TlsConnectParams) -> Result<()>
    where
        O: NetworkOps + 'static,
    {
        match self.state {
            State::Uninitialized | State::Destroyed => {}
            state => return Err(Error::InvalidState(state)),
        }

        params.validate()?;

        log::debug!(
            "initialized {} transport for {}:{} (verify_server={})",
            ops.name(),
            params.host,
            params.port,
            params.verify_server
        );

        self.ops = Some(Box::new(ops));
        self.params = Some(params);
        self.state = State::Initialized;
        Ok(())
    }

    /// Connect using the parameters bound at initialization
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            State::Initialized | State::Disconnected => {}
            State::Uninitialized => return Err(Error::NotInitialized),
            State::Connected => return Err(Error::AlreadyConnected),
            State::Destroyed => return Err(Error::Destroyed),
        }

        let (ops, params) = match (self.ops.as_mut(), self.params.as_ref()) {
            (Some(ops), Some(params)) => (ops, params),
            _ => return Err(Error::NotInitialized),
        };

        if !params.verify_server {
            log::warn!(
                "connecting to {}:{} without server verification",
                params.host,
                params.port
            );
        }

        match ops.connect(params) {
            Ok(()) => {
                log::info!("{} transport connected to {}:{}", ops.name(), params.host, params.port);
                self.state = State::Connected;
                Ok(())
            }
            Err(e) => {
                log::warn!("connect to {}:{} failed: {}", params.host, params.port, e);
                Err(e)
            }
        }
    }

    /// Connect, re-supplying the connection parameters
    ///
    /// The parameters must equal the ones bound at initialization; a handle
    /// never changes endpoint or identity. Use `destroy` and `init_with` to
    /// connect somewhere else.
    pub fn connect_with(&mut self, params: &TlsConnectParams) -> Result<()> {
        if let Some(bound) = &self.params {
            if bound != params {
                return Err(Error::ParamsMismatch);
            }
        }
        self.connect()
    }

    /// Read up to `buf.len()` bytes from the secured channel
    ///
    /// Fewer bytes than requested is normal. `Ok(0)` means no data arrived
    /// within the read timeout.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.connected_ops()?.read(buf)
    }

    /// Write up to `buf.len()` bytes to the secured channel
    ///
    /// Returns how many bytes were accepted; the caller resubmits the rest.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.connected_ops()?.write(buf)
    }

    /// Tear down the secured channel
    ///
    /// The handle is `Disconnected` afterwards even if the binding reported an
    /// error while closing.
    pub fn disconnect(&mut self) -> Result<()> {
        let ops = self.connected_ops()?;
        let result = ops.disconnect();
        self.state = State::Disconnected;

        match &result {
            Ok(()) => log::debug!("{} transport disconnected", self.binding_name()),
            Err(e) => log::warn!("disconnect failed: {}", e),
        }

        result
    }

    /// Release the binding and everything it owns
    ///
    /// Valid once from any state; a live channel is torn down first.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == State::Destroyed {
            return Err(Error::Destroyed);
        }

        let was_connected = self.state == State::Connected;
        self.state = State::Destroyed;
        self.params = None;

        let mut ops = match self.ops.take() {
            Some(ops) => ops,
            None => return Ok(()),
        };

        if was_connected {
            if let Err(e) = ops.disconnect() {
                log::debug!("disconnect during destroy failed: {}", e);
            }
        }

        let result = ops.destroy();
        log::debug!("{} transport destroyed", ops.name());
        result
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the secured channel is ready for application data
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Parameters bound at initialization
    pub fn params(&self) -> Option<&TlsConnectParams> {
        self.params.as_ref()
    }

    /// Negotiated session details, while connected
    pub fn session_info(&self) -> Option<SessionInfo> {
        if self.state != State::Connected {
            return None;
        }
        self.ops.as_ref().and_then(|ops| ops.session_info())
    }

    fn binding_name(&self) -> &'static str {
        self.ops.as_ref().map(|ops| ops.name()).unwrap_or("network")
    }

    fn connected_ops(&mut self) -> Result<&mut Box<dyn NetworkOps>> {
        match self.state {
            State::Connected => self.ops.as_mut().ok_or(Error::NotInitialized),
            State::Uninitialized => Err(Error::NotInitialized),
            State::Initialized | State::Disconnected => Err(Error::NotConnected),
            State::Destroyed => Err(Error::Destroyed),
        }
    }
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NetworkContext {
    fn drop(&mut self) {
        if !matches!(self.state, State::Uninitialized | State::Destroyed) {
            if let Err(e) = self.destroy() {
                log::debug!("destroy on drop failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkContext")
            .field("binding", &self.binding_name())
            .field("params", &self.params)
            .field("state", &self.state)
            .finish()
    }
}

/// Blocking byte-stream view of a connected handle
///
/// An orderly peer close reads as end of stream; a read timeout with no data
/// surfaces as `WouldBlock`, so `read_exact` never mistakes it for EOF.
impl io::Read for NetworkContext {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match NetworkContext::read(self, buf) {
            Ok(0) if !buf.is_empty() => Err(io::ErrorKind::WouldBlock.into()),
            Ok(n) => Ok(n),
            Err(Error::ConnectionClosed) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl io::Write for NetworkContext {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match NetworkContext::write(self, buf) {
            Ok(0) if !buf.is_empty() => Err(io::ErrorKind::TimedOut.into()),
            Ok(n) => Ok(n),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
