//! RSA private keys for decryption.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::errors::{EyamlError, Result};
use crate::keys::pem;

/// The only private-key PEM label we accept (PKCS#1).
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// An RSA private key parsed from PKCS#1 DER.
///
/// The underlying key zeroizes itself on drop.  `Debug` never prints key
/// material.
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    pub(crate) fn rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// The public half of this key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.inner.to_public_key()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Parse a PEM `RSA PRIVATE KEY` block.
pub fn parse_private_key(pem_text: &str) -> Result<PrivateKey> {
    let block = pem::decode_single(pem_text)?;

    if block.label() != RSA_PRIVATE_KEY_LABEL {
        return Err(EyamlError::UnsupportedKeyType(block.label().to_string()));
    }

    let inner = RsaPrivateKey::from_pkcs1_der(block.der()).map_err(|e| EyamlError::KeyParse {
        what: "RSA private key",
        reason: e.to_string(),
    })?;

    tracing::debug!("parsed RSA private key");
    Ok(PrivateKey { inner })
}
