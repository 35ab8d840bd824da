//! PKCS7 envelope encryption and decryption.
//!
//! Encryption generates a random content-encryption key, encrypts the
//! plaintext with it, and wraps the key for every recipient certificate with
//! RSA PKCS#1 v1.5.  Decryption reverses this for a single recipient.

use rsa::rand_core::OsRng;
use rsa::Pkcs1v15Encrypt;
use zeroize::Zeroizing;

use crate::crypto::content::{self, ContentCipher};
use crate::crypto::enveloped::{
    EnvelopeInfo, EnvelopedData, RecipientInfo, OID_DATA, OID_RSA_ENCRYPTION,
};
use crate::errors::{EyamlError, Result};
use crate::keys::{Certificate, PrivateKey};

/// Encrypt `plaintext` for `recipients` with the default content cipher.
///
/// Returns the DER `ContentInfo`.
pub fn encrypt(plaintext: &[u8], recipients: &[Certificate]) -> Result<Vec<u8>> {
    encrypt_with(plaintext, recipients, ContentCipher::default())
}

/// Encrypt `plaintext` for `recipients` with an explicit content cipher.
pub fn encrypt_with(
    plaintext: &[u8],
    recipients: &[Certificate],
    cipher: ContentCipher,
) -> Result<Vec<u8>> {
    if recipients.is_empty() {
        return Err(EyamlError::EncryptionFailed("no recipient certificates".into()));
    }

    let key = content::random_bytes(cipher.key_len());
    let sealed = content::seal(cipher, &key, plaintext)?;

    let mut infos = Vec::with_capacity(recipients.len());
    for cert in recipients {
        let public_key = cert.rsa_public_key()?;
        let encrypted_key = public_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &key)
            .map_err(|e| EyamlError::EncryptionFailed(format!("RSA key transport: {e}")))?;
        infos.push(RecipientInfo::for_certificate(cert, encrypted_key)?);
    }

    let enveloped = EnvelopedData {
        recipients: infos,
        content_type: OID_DATA,
        algorithm: sealed.algorithm,
        encrypted_content: sealed.ciphertext,
    };

    tracing::debug!(
        cipher = %cipher,
        recipients = recipients.len(),
        plaintext_len = plaintext.len(),
        "built PKCS7 envelope"
    );
    Ok(enveloped.to_der())
}

/// Decrypt a DER PKCS7 envelope with `private_key`.
///
/// `certificate` selects the recipient entry (by issuer and serial) and must
/// carry the public half of `private_key`.
pub fn decrypt(
    der: &[u8],
    private_key: &PrivateKey,
    certificate: &Certificate,
) -> Result<Zeroizing<Vec<u8>>> {
    let enveloped = EnvelopedData::parse(der)?;

    if private_key.public_key() != certificate.rsa_public_key()? {
        return Err(EyamlError::RecipientMismatch(
            "private key does not belong to the certificate".into(),
        ));
    }

    let recipient = enveloped.recipient_for(certificate)?.ok_or_else(|| {
        EyamlError::RecipientMismatch(format!(
            "no recipient entry for certificate serial {}",
            certificate.serial()
        ))
    })?;

    if recipient.key_encryption != OID_RSA_ENCRYPTION {
        return Err(EyamlError::UnsupportedAlgorithm(format!(
            "key transport algorithm {}",
            recipient.key_encryption
        )));
    }

    let key = Zeroizing::new(
        private_key
            .rsa()
            .decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, &recipient.encrypted_key)
            .map_err(|_| {
                EyamlError::RecipientMismatch("content key could not be unwrapped".into())
            })?,
    );

    let cipher = enveloped.algorithm.cipher;
    if key.len() != cipher.key_len() {
        return Err(EyamlError::RecipientMismatch(format!(
            "unwrapped key has {} bytes, {cipher} needs {}",
            key.len(),
            cipher.key_len()
        )));
    }

    let plaintext = content::open(&enveloped.algorithm, &key, &enveloped.encrypted_content)?;
    tracing::debug!(
        cipher = %cipher,
        recipients = enveloped.recipients.len(),
        "opened PKCS7 envelope"
    );
    Ok(plaintext)
}

/// Describe an envelope (cipher, recipients) without decrypting it.
pub fn inspect(der: &[u8]) -> Result<EnvelopeInfo> {
    Ok(EnvelopedData::parse(der)?.summary())
}

/// Whether the envelope carries a recipient entry for `certificate`.
pub fn addressed_to(der: &[u8], certificate: &Certificate) -> Result<bool> {
    Ok(EnvelopedData::parse(der)?
        .recipient_for(certificate)?
        .is_some())
}
