//! Shared fixtures for integration tests
//!
//! - a throwaway PKI (CA, server and device certificates) written to a temp dir
//! - a one-shot loopback TLS server running a handler on its own thread
//! - `ScriptedOps`, an in-memory `NetworkOps` binding with configurable
//!   partial I/O

#![allow(dead_code)]

use bytes::{Buf, BytesMut};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{
    select_next_proto, AlpnError, SslAcceptor, SslMethod, SslStream, SslVerifyMode,
};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tlsnet::transport::{Error, NetworkOps, Result, TlsConnectParams};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Certificate plus private key
#[derive(Clone)]
pub struct Identity {
    pub cert: X509,
    pub key: PKey<Private>,
}

fn new_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn x509_name(cn: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.build()
}

fn cert_builder(cn: &str, key: &PKey<Private>) -> X509Builder {
    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&x509_name(cn)).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
    builder
}

/// Self-signed certificate authority
pub fn certificate_authority(cn: &str) -> Identity {
    let key = new_key();
    let mut builder = cert_builder(cn, &key);
    builder.set_issuer_name(&x509_name(cn)).unwrap();

    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(ski).unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();

    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

/// Self-signed end-entity certificate for `cn` and 127.0.0.1
pub fn self_signed(cn: &str) -> Identity {
    let key = new_key();
    let mut builder = cert_builder(cn, &key);
    builder.set_issuer_name(&x509_name(cn)).unwrap();

    let san = SubjectAlternativeName::new()
        .dns(cn)
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();

    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

/// Leaf certificate for `cn`, signed by `ca`, valid for `dns_names` and
/// 127.0.0.1
pub fn leaf(ca: &Identity, cn: &str, dns_names: &[&str]) -> Identity {
    let key = new_key();
    let mut builder = cert_builder(cn, &key);
    builder.set_issuer_name(ca.cert.subject_name()).unwrap();

    let mut san = SubjectAlternativeName::new();
    for name in dns_names {
        san.dns(name);
    }
    san.ip("127.0.0.1");

    let san = san
        .build(&builder.x509v3_context(Some(&ca.cert), None))
        .unwrap();
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(&ca.cert), None))
        .unwrap();

    builder.append_extension(san).unwrap();
    builder.append_extension(aki).unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .key_agreement()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder
        .append_extension(
            ExtendedKeyUsage::new()
                .server_auth()
                .client_auth()
                .build()
                .unwrap(),
        )
        .unwrap();

    builder.sign(&ca.key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

/// Test PKI written to a temp directory
pub struct Pki {
    _dir: tempfile::TempDir,
    pub ca: Identity,
    pub ca_path: PathBuf,
    /// Server identity for `localhost` / 127.0.0.1, signed by `ca`
    pub server: Identity,
    /// Device identity signed by `ca`
    pub device_cert_path: PathBuf,
    pub device_key_path: PathBuf,
    /// Self-signed server identity nobody trusts
    pub untrusted: Identity,
    /// Server identity signed by `ca` for a different host
    pub wrong_host: Identity,
}

impl Pki {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let ca = certificate_authority("tlsnet test CA");
        let server = leaf(&ca, "localhost", &["localhost"]);
        let device = leaf(&ca, "device-0001", &["device-0001"]);
        let untrusted = self_signed("localhost");
        let wrong_host = leaf(&ca, "other.example.com", &["other.example.com"]);

        let ca_path = dir.path().join("ca.pem");
        fs::write(&ca_path, ca.cert.to_pem().unwrap()).unwrap();

        let device_cert_path = dir.path().join("cert.pem");
        fs::write(&device_cert_path, device.cert.to_pem().unwrap()).unwrap();

        let device_key_path = dir.path().join("key.pem");
        fs::write(&device_key_path, device.key.private_key_to_pem_pkcs8().unwrap()).unwrap();

        Pki {
            _dir: dir,
            ca,
            ca_path,
            server,
            device_cert_path,
            device_key_path,
            untrusted,
            wrong_host,
        }
    }

    /// Parameters for a verified, mutually authenticated connection
    pub fn params(&self, host: &str, port: u16) -> TlsConnectParams {
        TlsConnectParams::builder(host, port)
            .root_ca(&self.ca_path)
            .device_identity(&self.device_cert_path, &self.device_key_path)
            .handshake_timeout_ms(5000)
            .build()
            .unwrap()
    }
}

/// Server-side options
#[derive(Clone, Default)]
pub struct ServerOptions {
    /// Require a client certificate chaining to this CA
    pub client_ca: Option<X509>,
    /// ALPN protocols the server accepts
    pub alpn: Vec<&'static str>,
}

/// One-shot TLS server on 127.0.0.1
pub struct TestServer {
    pub port: u16,
    handle: JoinHandle<bool>,
}

impl TestServer {
    /// Accept one connection and run `handler` on it
    ///
    /// If the TLS accept fails (e.g., the client rejects the certificate) the
    /// handler is skipped.
    pub fn spawn<F>(identity: &Identity, options: ServerOptions, handler: F) -> Self
    where
        F: FnOnce(SslStream<TcpStream>) + Send + 'static,
    {
        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
        acceptor.set_private_key(&identity.key).unwrap();
        acceptor.set_certificate(&identity.cert).unwrap();
        acceptor.check_private_key().unwrap();

        if let Some(ca) = options.client_ca {
            acceptor.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
            acceptor.cert_store_mut().add_cert(ca).unwrap();
        }

        if !options.alpn.is_empty() {
            let mut wire = Vec::new();
            for proto in &options.alpn {
                wire.push(proto.len() as u8);
                wire.extend_from_slice(proto.as_bytes());
            }
            // The callback's return borrows the server list, so it must outlive the closure
            let wire: &'static [u8] = Box::leak(wire.into_boxed_slice());
            acceptor.set_alpn_select_callback(move |_ssl, client| {
                select_next_proto(wire, client).ok_or(AlpnError::NOACK)
            });
        }

        let acceptor = acceptor.build();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (tcp_stream, _) = listener.accept().unwrap();
            match acceptor.accept(tcp_stream) {
                Ok(stream) => {
                    handler(stream);
                    true
                }
                Err(_) => false,
            }
        });

        TestServer { port, handle }
    }

    /// Wait for the server thread; true if a TLS session was accepted
    pub fn join(self) -> bool {
        self.handle.join().unwrap()
    }
}

/// Read from the server side until the client closes
pub fn drain(stream: &mut SslStream<TcpStream>) -> Vec<u8> {
    use std::io::Read;

    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
    received
}

/// Observable side of a `ScriptedOps`
#[derive(Default)]
pub struct Script {
    /// Bytes the peer will deliver to reads
    pub inbound: BytesMut,
    /// Bytes accepted by writes
    pub outbound: Vec<u8>,
    pub connects: usize,
    pub disconnects: usize,
    pub destroys: usize,
}

/// In-memory binding: reads drain `inbound`, writes append to `outbound`
pub struct ScriptedOps {
    pub script: Arc<Mutex<Script>>,
    /// Largest number of bytes a single read returns
    pub max_read: usize,
    /// Largest number of bytes a single write accepts
    pub max_write: usize,
    /// Errors returned by the next connect attempts, in order
    pub connect_failures: Vec<Error>,
    connected: bool,
}

impl ScriptedOps {
    pub fn new(script: Arc<Mutex<Script>>) -> Self {
        ScriptedOps {
            script,
            max_read: usize::MAX,
            max_write: usize::MAX,
            connect_failures: Vec::new(),
            connected: false,
        }
    }
}

impl NetworkOps for ScriptedOps {
    fn connect(&mut self, _params: &TlsConnectParams) -> Result<()> {
        self.script.lock().unwrap().connects += 1;
        if !self.connect_failures.is_empty() {
            return Err(self.connect_failures.remove(0));
        }
        self.connected = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let mut script = self.script.lock().unwrap();
        let n = buf.len().min(self.max_read).min(script.inbound.remaining());
        script.inbound.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let n = buf.len().min(self.max_write);
        self.script.lock().unwrap().outbound.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.script.lock().unwrap().disconnects += 1;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.connected = false;
        self.script.lock().unwrap().destroys += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
