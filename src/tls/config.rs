//! TLS configuration
//!
//! This module builds OpenSSL client contexts from connection parameters.

use crate::transport::{Error, Result, TlsConnectParams, TlsVersion};
use openssl::pkey::PKey;
use openssl::ssl::{Ssl, SslContext, SslContextBuilder, SslMethod, SslVerifyMode, SslVersion};
use openssl::x509::verify::X509CheckFlags;
use openssl::x509::X509;
use std::fs;
use std::path::Path;

/// Lowest protocol version negotiated when none is configured
pub const DEFAULT_MIN_VERSION: TlsVersion = TlsVersion::Tls12;

/// Get OpenSSL protocol version constant
pub fn to_openssl_version(version: TlsVersion) -> SslVersion {
    match version {
        TlsVersion::Tls12 => SslVersion::TLS1_2,
        TlsVersion::Tls13 => SslVersion::TLS1_3,
    }
}

/// Encode ALPN protocols (length-prefixed wire format)
pub fn encode_alpn(protocols: &[String]) -> Vec<u8> {
    let mut alpn_bytes = Vec::new();
    for proto in protocols {
        alpn_bytes.push(proto.len() as u8);
        alpn_bytes.extend_from_slice(proto.as_bytes());
    }
    alpn_bytes
}

/// Build the client context for one connection attempt
///
/// Reads the root CA, device certificate and private key files named in
/// `params`.
pub fn build_context(params: &TlsConnectParams) -> Result<SslContext> {
    let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

    let min_version = params.min_version.unwrap_or(DEFAULT_MIN_VERSION);
    ctx_builder.set_min_proto_version(Some(to_openssl_version(min_version)))?;

    if params.verify_server {
        ctx_builder.set_verify(SslVerifyMode::PEER);
        match &params.root_ca {
            Some(path) => load_root_ca(&mut ctx_builder, path)?,
            None => ctx_builder.set_default_verify_paths()?,
        }
    } else {
        ctx_builder.set_verify(SslVerifyMode::NONE);
    }

    if let (Some(cert), Some(key)) = (&params.device_cert, &params.device_key) {
        load_device_identity(&mut ctx_builder, cert, key)?;
    }

    if !params.alpn.is_empty() {
        ctx_builder.set_alpn_protos(&encode_alpn(&params.alpn))?;
    }

    Ok(ctx_builder.build())
}

/// Create the per-connection SSL object
///
/// Sends SNI for host names (not IP literals) and, when verification is on,
/// pins the expected host name or IP address.
pub fn configure_ssl(ctx: &SslContext, params: &TlsConnectParams) -> Result<Ssl> {
    let mut ssl = Ssl::new(ctx)?;
    let host_ip = params.host_ip();

    if host_ip.is_none() {
        ssl.set_hostname(params.bare_host())?;
    }

    if params.verify_server {
        let param = ssl.param_mut();
        param.set_hostflags(X509CheckFlags::NO_PARTIAL_WILDCARDS);
        match host_ip {
            Some(ip) => param.set_ip(ip)?,
            None => param.set_host(params.bare_host())?,
        }
    }

    Ok(ssl)
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        Error::Certificate(format!("Failed to read {} {}: {}", what, path.display(), e))
    })
}

fn load_root_ca(ctx_builder: &mut SslContextBuilder, path: &Path) -> Result<()> {
    let ca_pem = read_pem(path, "root CA")?;

    let certs = X509::stack_from_pem(&ca_pem)
        .map_err(|e| Error::Certificate(format!("Failed to load root CA: {}", e)))?;
    if certs.is_empty() {
        return Err(Error::Certificate(format!(
            "No certificates in root CA file {}",
            path.display()
        )));
    }

    let store = ctx_builder.cert_store_mut();
    for cert in certs {
        store.add_cert(cert)?;
    }

    Ok(())
}

fn load_device_identity(
    ctx_builder: &mut SslContextBuilder,
    cert_path: &Path,
    key_path: &Path,
) -> Result<()> {
    let cert_pem = read_pem(cert_path, "device certificate")?;

    let mut chain = X509::stack_from_pem(&cert_pem)
        .map_err(|e| Error::Certificate(format!("Failed to load device certificate: {}", e)))?
        .into_iter();

    let leaf = chain.next().ok_or_else(|| {
        Error::Certificate(format!("No certificate in {}", cert_path.display()))
    })?;
    ctx_builder.set_certificate(&leaf)?;

    // Intermediates follow the leaf in the same file
    for intermediate in chain {
        ctx_builder.add_extra_chain_cert(intermediate)?;
    }

    let key_pem = read_pem(key_path, "device private key")?;
    let key = PKey::private_key_from_pem(&key_pem)
        .map_err(|e| Error::Certificate(format!("Failed to load private key: {}", e)))?;
    // OpenSSL checks the key against the certificate here
    ctx_builder
        .set_private_key(&key)
        .and_then(|()| ctx_builder.check_private_key())
        .map_err(|e| {
            Error::Certificate(format!(
                "Device certificate and private key do not match: {}",
                e
            ))
        })?;

    Ok(())
}
