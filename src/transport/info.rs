//! Negotiated session details
//!
//! A binding can describe the secured channel it established. The protocol
//! layer only sees these plain values, never the binding's session object.

/// Certificate information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Certificate subject (Common Name)
    pub subject: String,
    /// Certificate issuer (Common Name)
    pub issuer: String,
    /// Subject Alternative Names (`DNS:` and `IP:` prefixed)
    pub subject_alt_names: Vec<String>,
}

/// Details of an established TLS session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Negotiated protocol version (e.g., "TLSv1.3")
    pub version: String,
    /// Negotiated cipher suite
    pub cipher: String,
    /// Server name sent in SNI
    pub servername: Option<String>,
    /// Negotiated ALPN protocol
    pub alpn: Option<String>,
    /// Whether the peer chain and host name were verified
    pub verified: bool,
    /// Peer certificate chain (index 0 is the peer certificate)
    pub cert_chain: Vec<CertInfo>,
}

impl SessionInfo {
    /// Peer certificate, if the server presented one
    pub fn peer_cert(&self) -> Option<&CertInfo> {
        self.cert_chain.first()
    }
}
