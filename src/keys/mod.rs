//! Key material loading.
//!
//! This module provides:
//! - strict single-block PEM decoding (`pem`)
//! - X.509 recipient certificates (`certificate`)
//! - PKCS#1 RSA private keys (`private_key`)

pub mod certificate;
pub mod pem;
pub mod private_key;

use std::path::Path;

pub use certificate::{parse_certificates, Certificate};
pub use private_key::{parse_private_key, PrivateKey};

use crate::errors::{EyamlError, Result};

/// Read a PEM file and parse the certificates in it.
pub fn load_certificates_file(path: &Path) -> Result<Vec<Certificate>> {
    parse_certificates(&read_key_file(path)?)
}

/// Read a PEM file and parse the RSA private key in it.
pub fn load_private_key_file(path: &Path) -> Result<PrivateKey> {
    let text = zeroize::Zeroizing::new(read_key_file(path)?);
    parse_private_key(&text)
}

/// Read a key file, mapping "not found" to a config error that names the path.
pub fn read_key_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(EyamlError::KeyFileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}
