//! Certificate handling and parsing
//!
//! This module extracts displayable information from X.509 certificates
//! presented by the peer.

use crate::transport::CertInfo;
use openssl::nid::Nid;
use openssl::ssl::SslRef;
use openssl::x509::{X509NameRef, X509Ref};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Extract certificate information from an X.509 certificate
pub fn cert_info(cert: &X509Ref) -> CertInfo {
    CertInfo {
        subject: common_name(cert.subject_name()),
        issuer: common_name(cert.issuer_name()),
        subject_alt_names: subject_alt_names(cert),
    }
}

/// Extract the peer certificate chain from an SSL connection
///
/// On the client side OpenSSL's chain already starts with the peer
/// certificate; the bare peer certificate is used when no chain is available.
pub fn peer_chain(ssl: &SslRef) -> Vec<CertInfo> {
    if let Some(chain) = ssl.peer_cert_chain() {
        return chain.iter().map(cert_info).collect();
    }

    ssl.peer_certificate()
        .map(|cert| vec![cert_info(&cert)])
        .unwrap_or_default()
}

fn common_name(name: &X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
        .unwrap_or_else(|| "<undef>".to_string())
}

fn subject_alt_names(cert: &X509Ref) -> Vec<String> {
    let mut names = Vec::new();

    if let Some(san_ext) = cert.subject_alt_names() {
        for name in san_ext {
            if let Some(dns) = name.dnsname() {
                names.push(format!("DNS:{}", dns));
            } else if let Some(ip) = name.ipaddress() {
                if let Ok(v4) = <[u8; 4]>::try_from(ip) {
                    names.push(format!("IP:{}", Ipv4Addr::from(v4)));
                } else if let Ok(v6) = <[u8; 16]>::try_from(ip) {
                    names.push(format!("IP:{}", Ipv6Addr::from(v6)));
                }
            }
        }
    }

    names
}
