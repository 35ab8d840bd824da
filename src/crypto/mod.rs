//! PKCS7 enveloped-data cryptography.
//!
//! This module provides:
//! - a minimal BER reader / DER writer (`asn1`)
//! - content-encryption ciphers, AES-CBC/GCM and DES (`content`)
//! - the `EnvelopedData` structure (`enveloped`)
//! - encrypt / decrypt / inspect over DER (`pkcs7`)
//! - string helpers over PEM text and envelopes (`value`)

pub(crate) mod asn1;
pub mod content;
pub mod enveloped;
pub mod pkcs7;
pub mod value;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, ContentCipher, ...};
pub use content::ContentCipher;
pub use enveloped::{EnvelopeInfo, RecipientSummary};
pub use pkcs7::{addressed_to, decrypt, encrypt, encrypt_with, inspect};
pub use value::{
    decrypt_envelope, decrypt_value, encrypt_to_envelope, encrypt_value, encrypt_value_with,
};
