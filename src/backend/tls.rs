//! TLS client identity loading.

use std::fs;
use std::path::Path;

use reqwest::Identity;

use crate::backend::error::BackendError;

/// Load a client identity from PEM certificate and private key files.
pub fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity, BackendError> {
    // Basic validation
    if !cert_path.exists() {
        return Err(BackendError::Tls(format!(
            "Certificate file not found: {:?}",
            cert_path
        )));
    }
    if !key_path.exists() {
        return Err(BackendError::Tls(format!(
            "Private key file not found: {:?}",
            key_path
        )));
    }

    let mut pem = fs::read(cert_path)
        .map_err(|e| BackendError::Tls(format!("{}: {}", cert_path.display(), e)))?;
    let key = fs::read(key_path)
        .map_err(|e| BackendError::Tls(format!("{}: {}", key_path.display(), e)))?;
    pem.push(b'\n');
    pem.extend_from_slice(&key);

    Identity::from_pem(&pem).map_err(|e| BackendError::Tls(e.to_string()))
}
