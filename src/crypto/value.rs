//! String-in, string-out helpers over PEM text and base64 payloads.
//!
//! These are what front ends call: they take the key files' contents as
//! read from disk and hand back printable values.

use crate::crypto::content::ContentCipher;
use crate::crypto::pkcs7;
use crate::envelope;
use crate::errors::{EyamlError, Result};
use crate::keys::{parse_certificates, parse_private_key};

/// Encrypt `value` for every certificate in `public_key_pem`; returns the
/// base64 payload (without envelope markers).
pub fn encrypt_value(value: &str, public_key_pem: &str) -> Result<String> {
    encrypt_value_with(value, public_key_pem, ContentCipher::default())
}

pub fn encrypt_value_with(
    value: &str,
    public_key_pem: &str,
    cipher: ContentCipher,
) -> Result<String> {
    let certs = parse_certificates(public_key_pem)?;
    let der = pkcs7::encrypt_with(value.as_bytes(), &certs, cipher)?;
    Ok(envelope::encode_payload(&der))
}

/// Decrypt a base64 payload.
///
/// The first certificate in `public_key_pem` identifies the recipient.
pub fn decrypt_value(payload: &str, private_key_pem: &str, public_key_pem: &str) -> Result<String> {
    let key = parse_private_key(private_key_pem)?;
    let certs = parse_certificates(public_key_pem)?;
    let cert = certs.first().ok_or_else(|| EyamlError::KeyParse {
        what: "certificate",
        reason: "PEM block holds no certificate".into(),
    })?;
    let der = envelope::decode_payload(payload)?;

    let plaintext = pkcs7::decrypt(&der, &key, cert)?;
    let text = std::str::from_utf8(&plaintext).map_err(|_| EyamlError::InvalidPlaintext)?;
    Ok(text.to_owned())
}

/// [`encrypt_value`], wrapped as `ENC[PKCS7,...]`.
pub fn encrypt_to_envelope(
    value: &str,
    public_key_pem: &str,
    cipher: ContentCipher,
) -> Result<String> {
    Ok(envelope::wrap(&encrypt_value_with(value, public_key_pem, cipher)?))
}

/// Decrypt an `ENC[PKCS7,...]` string.  Surrounding whitespace and the block
/// rendering are accepted.
pub fn decrypt_envelope(
    envelope_text: &str,
    private_key_pem: &str,
    public_key_pem: &str,
) -> Result<String> {
    let payload = envelope::unwrap(envelope::normalize(envelope_text))?;
    decrypt_value(payload, private_key_pem, public_key_pem)
}
