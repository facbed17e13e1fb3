//! TLS listener configuration.
//!
//! The handshake itself belongs to rustls; this module only loads the
//! configured PEM material and produces the acceptor the accept loop wraps
//! sockets with.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_rustls::rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::service::ServiceError;

/// TLS settings for the listener: PEM-encoded certificate chain and
/// private key.
#[derive(Debug, Clone)]
pub struct SslConfig {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl SslConfig {
    /// Configures TLS from a certificate chain file and a key file.
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Path of the PEM certificate chain.
    #[must_use]
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Path of the PEM private key.
    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

/// Loads the PEM material and builds the acceptor.
pub(crate) fn build_acceptor(config: &SslConfig) -> Result<TlsAcceptor, ServiceError> {
    let mut cert_reader = open(config.cert_path())?;
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| tls_error(config.cert_path(), &e))?;
    if certs.is_empty() {
        return Err(ServiceError::Tls(format!(
            "No certificates found in {}",
            config.cert_path().display()
        )));
    }

    let mut key_reader = open(config.key_path())?;
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| tls_error(config.key_path(), &e))?
        .ok_or_else(|| {
            ServiceError::Tls(format!(
                "No private key found in {}",
                config.key_path().display()
            ))
        })?;

    let tls_config = RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServiceError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

fn open(path: &Path) -> Result<BufReader<File>, ServiceError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| tls_error(path, &e))
}

fn tls_error(path: &Path, cause: &io::Error) -> ServiceError {
    ServiceError::Tls(format!("{}: {cause}", path.display()))
}
