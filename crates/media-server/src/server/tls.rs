//! TLS listener configuration using rustls with the process certificate.
//!
//! The server presents the single self-signed certificate generated by
//! [`crate::certificate`]. TLS 1.2 is the protocol floor.

use std::io::BufReader;
use std::sync::Arc;

use rustls::{ServerConfig, SupportedProtocolVersion};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

use crate::certificate::CertificateMaterial;

/// Protocol versions offered to clients, newest first.
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Errors produced while building the rustls configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The certificate PEM could not be read.
    #[error("failed to parse TLS certificate chain: {0}")]
    CertificateChain(#[source] std::io::Error),

    /// The certificate PEM contained no certificate.
    #[error("no certificate found in PEM data")]
    MissingCertificate,

    /// The key PEM could not be read.
    #[error("failed to read TLS private key: {0}")]
    PrivateKey(#[source] std::io::Error),

    /// The key PEM contained no private key.
    #[error("no private key found in PEM data")]
    MissingPrivateKey,

    /// rustls rejected the certificate, key or protocol selection.
    #[error("failed to build rustls ServerConfig: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsError::CertificateChain)?;
    if certs.is_empty() {
        return Err(TlsError::MissingCertificate);
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(key_pem))
        .map_err(TlsError::PrivateKey)?
        .ok_or(TlsError::MissingPrivateKey)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// TLS acceptor presenting `material`.
///
/// # Errors
///
/// See [`build_server_config`].
pub fn acceptor(material: &CertificateMaterial) -> Result<TlsAcceptor, TlsError> {
    let config = build_server_config(material.cert_pem().as_bytes(), material.key_pem().as_bytes())?;
    Ok(TlsAcceptor::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"");
        assert!(matches!(result, Err(TlsError::MissingCertificate)));
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_key() {
        let material = CertificateMaterial::generate().unwrap();
        let result = build_server_config(material.cert_pem().as_bytes(), b"");
        assert!(matches!(result, Err(TlsError::MissingPrivateKey)));
    }

    #[test]
    fn accepts_generated_material() {
        let material = CertificateMaterial::generate().unwrap();
        let config =
            build_server_config(material.cert_pem().as_bytes(), material.key_pem().as_bytes())
                .unwrap();
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
    }
}
