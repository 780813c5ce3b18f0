//! Process-lifetime self-signed TLS certificate.
//!
//! # Lifecycle
//!
//! 1. The first call to [`CertificateProvider::ensure_certificate`] generates a
//!    P-256 key pair and a certificate for `localhost`, valid for 365 days.
//! 2. Every later call returns the same [`CertificateMaterial`]; concurrent
//!    first calls still generate exactly once.
//! 3. The material lives only in memory and is dropped at process exit. There
//!    is no rotation.
//!
//! [`public_pem`] exports the certificate (never the key) so the embedding
//! application can install it as a trusted root for the local origin.

pub mod material;

pub use material::{CertificateError, CertificateMaterial};

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

static PROCESS_PROVIDER: CertificateProvider = CertificateProvider::new();

/// Write-once holder for [`CertificateMaterial`].
#[derive(Debug)]
pub struct CertificateProvider {
    cell: OnceCell<Arc<CertificateMaterial>>,
}

impl CertificateProvider {
    /// Create a provider that has not generated anything yet.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The provider shared by the whole process.
    pub fn global() -> &'static Self {
        &PROCESS_PROVIDER
    }

    /// Return the certificate material, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] if key generation or encoding fails. A failed
    /// attempt leaves the provider empty, so a later call may try again.
    pub fn ensure_certificate(&self) -> Result<Arc<CertificateMaterial>, CertificateError> {
        self.cell
            .get_or_try_init(|| {
                let material = CertificateMaterial::generate()?;
                info!(
                    not_before = %material.not_before(),
                    not_after = %material.not_after(),
                    "generated self-signed TLS certificate"
                );
                Ok(Arc::new(material))
            })
            .cloned()
    }

    /// PEM-encoded certificate for trust installation by the local client.
    ///
    /// # Errors
    ///
    /// Propagates any generation failure from [`Self::ensure_certificate`].
    pub fn public_pem(&self) -> Result<String, CertificateError> {
        Ok(self.ensure_certificate()?.cert_pem().to_owned())
    }

    /// Returns `true` once material has been generated.
    pub fn is_generated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for CertificateProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// [`CertificateProvider::ensure_certificate`] on the process-wide provider.
pub fn ensure_certificate() -> Result<Arc<CertificateMaterial>, CertificateError> {
    CertificateProvider::global().ensure_certificate()
}

/// [`CertificateProvider::public_pem`] on the process-wide provider.
pub fn public_pem() -> Result<String, CertificateError> {
    CertificateProvider::global().public_pem()
}
