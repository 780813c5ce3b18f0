//! [`CertificateMaterial`]: the generated key pair and certificate.

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_ECDSA_P256_SHA256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Subject common name and only subject alternative name.
pub const SUBJECT: &str = "localhost";

/// Certificate lifetime counted from the moment of generation.
pub const VALIDITY_DAYS: i64 = 365;

/// Errors produced while generating certificate material.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Key generation, parameter validation or signing failed.
    #[error("failed to generate TLS certificate: {0}")]
    Generation(#[from] rcgen::Error),
}

/// Self-signed certificate and its private key, both PEM-encoded.
#[derive(Clone)]
pub struct CertificateMaterial {
    cert_pem: String,
    key_pem: String,
    cert_der: Vec<u8>,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
}

impl CertificateMaterial {
    /// Generate fresh material valid from now for [`VALIDITY_DAYS`].
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Generation`] if rcgen fails.
    pub fn generate() -> Result<Self, CertificateError> {
        Self::generate_at(OffsetDateTime::now_utc())
    }

    fn generate_at(not_before: OffsetDateTime) -> Result<Self, CertificateError> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

        let mut params = CertificateParams::new(vec![SUBJECT.to_owned()])?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, SUBJECT);
        params.distinguished_name = dn;

        let not_after = not_before + Duration::days(VALIDITY_DAYS);
        params.not_before = not_before;
        params.not_after = not_after;

        let cert = params.self_signed(&key_pair)?;

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
            cert_der: cert.der().to_vec(),
            not_before,
            not_after,
        })
    }

    /// PEM-encoded certificate.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// PEM-encoded PKCS#8 private key.
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// DER-encoded certificate.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }
}

impl std::fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the private key.
        f.debug_struct("CertificateMaterial")
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("key_pem", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
