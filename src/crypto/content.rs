//! Content-encryption algorithms for PKCS7 enveloped data.
//!
//! CBC modes use PKCS#7 padding and carry the IV as an OCTET STRING
//! parameter.  GCM modes carry `GCMParameters { nonce, icvLen }` and append
//! the 16-byte tag to the ciphertext.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, Nonce};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x509_cert::der::asn1::ObjectIdentifier;
use zeroize::Zeroizing;

use crate::crypto::asn1::{self, Element};
use crate::errors::{EyamlError, Result};

const OID_DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
const OID_DES_EDE3_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");
const OID_AES_128_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
const OID_AES_192_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
const OID_AES_256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");
const OID_AES_128_GCM: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.6");
const OID_AES_256_GCM: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.46");

/// Length of the GCM nonce we emit and accept (96 bits).
const GCM_NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag (128 bits).
const GCM_TAG_LEN: u8 = 16;

/// Symmetric cipher protecting the content of an envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentCipher {
    #[serde(rename = "aes-128-cbc")]
    Aes128Cbc,
    #[serde(rename = "aes-192-cbc")]
    Aes192Cbc,
    #[default]
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
    #[serde(rename = "des-ede3-cbc")]
    DesEde3Cbc,
    /// Single DES; only for compatibility with values written by older tools.
    #[serde(rename = "des-cbc")]
    DesCbc,
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl ContentCipher {
    pub const ALL: [ContentCipher; 7] = [
        ContentCipher::Aes128Cbc,
        ContentCipher::Aes192Cbc,
        ContentCipher::Aes256Cbc,
        ContentCipher::DesEde3Cbc,
        ContentCipher::DesCbc,
        ContentCipher::Aes128Gcm,
        ContentCipher::Aes256Gcm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ContentCipher::Aes128Cbc => "aes-128-cbc",
            ContentCipher::Aes192Cbc => "aes-192-cbc",
            ContentCipher::Aes256Cbc => "aes-256-cbc",
            ContentCipher::DesEde3Cbc => "des-ede3-cbc",
            ContentCipher::DesCbc => "des-cbc",
            ContentCipher::Aes128Gcm => "aes-128-gcm",
            ContentCipher::Aes256Gcm => "aes-256-gcm",
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            ContentCipher::Aes128Cbc => OID_AES_128_CBC,
            ContentCipher::Aes192Cbc => OID_AES_192_CBC,
            ContentCipher::Aes256Cbc => OID_AES_256_CBC,
            ContentCipher::DesEde3Cbc => OID_DES_EDE3_CBC,
            ContentCipher::DesCbc => OID_DES_CBC,
            ContentCipher::Aes128Gcm => OID_AES_128_GCM,
            ContentCipher::Aes256Gcm => OID_AES_256_GCM,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.oid() == *oid)
    }

    /// Content-encryption key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            ContentCipher::Aes128Cbc | ContentCipher::Aes128Gcm => 16,
            ContentCipher::Aes192Cbc | ContentCipher::DesEde3Cbc => 24,
            ContentCipher::Aes256Cbc | ContentCipher::Aes256Gcm => 32,
            ContentCipher::DesCbc => 8,
        }
    }

    /// IV length for CBC modes, nonce length for GCM.
    pub fn iv_len(&self) -> usize {
        match self {
            ContentCipher::DesCbc | ContentCipher::DesEde3Cbc => 8,
            ContentCipher::Aes128Cbc | ContentCipher::Aes192Cbc | ContentCipher::Aes256Cbc => 16,
            ContentCipher::Aes128Gcm | ContentCipher::Aes256Gcm => GCM_NONCE_LEN,
        }
    }

    pub fn is_aead(&self) -> bool {
        matches!(self, ContentCipher::Aes128Gcm | ContentCipher::Aes256Gcm)
    }
}

impl fmt::Display for ContentCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentCipher {
    type Err = EyamlError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|c| c.name()).collect();
                EyamlError::UnsupportedAlgorithm(format!(
                    "unknown content cipher '{s}' — supported: {}",
                    names.join(", ")
                ))
            })
    }
}

/// A content-encryption `AlgorithmIdentifier`: cipher plus IV/nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentAlgorithm {
    pub cipher: ContentCipher,
    pub iv: Vec<u8>,
}

impl ContentAlgorithm {
    /// Parse an `AlgorithmIdentifier` SEQUENCE.
    pub fn parse(element: &Element<'_>) -> Result<Self> {
        let mut fields = element.children();
        let oid = fields.expect(asn1::OID, "content-encryption algorithm")?.oid()?;
        let cipher = ContentCipher::from_oid(&oid).ok_or_else(|| {
            EyamlError::UnsupportedAlgorithm(format!("content-encryption algorithm {oid}"))
        })?;

        let iv = if cipher.is_aead() {
            let params = fields.expect(asn1::SEQUENCE, "GCM parameters")?;
            let mut gcm = params.children();
            let nonce = gcm.expect(asn1::OCTET_STRING, "GCM nonce")?.octets()?.into_owned();
            // icvLen defaults to 12 when absent; we only handle 16-byte tags.
            let tag_len = match gcm.optional(&[asn1::INTEGER])? {
                Some(int) => int.small_uint()?,
                None => 12,
            };
            if tag_len != u64::from(GCM_TAG_LEN) {
                return Err(EyamlError::UnsupportedAlgorithm(format!(
                    "GCM tag length {tag_len}"
                )));
            }
            nonce
        } else {
            fields
                .expect(asn1::OCTET_STRING, "initialization vector")?
                .octets()?
                .into_owned()
        };

        if iv.len() != cipher.iv_len() {
            return Err(EyamlError::MalformedPkcs7(format!(
                "{cipher} expects a {}-byte IV, found {}",
                cipher.iv_len(),
                iv.len()
            )));
        }

        Ok(Self { cipher, iv })
    }

    /// DER `AlgorithmIdentifier`.
    pub fn to_der(&self) -> Vec<u8> {
        let params = if self.cipher.is_aead() {
            asn1::sequence(&[&asn1::octet_string(&self.iv), &asn1::small_uint(GCM_TAG_LEN)])
        } else {
            asn1::octet_string(&self.iv)
        };
        asn1::sequence(&[&asn1::oid(&self.cipher.oid()), &params])
    }
}

/// Output of [`seal`]: the algorithm (with its fresh IV) and the ciphertext.
pub(crate) struct SealedContent {
    pub algorithm: ContentAlgorithm,
    pub ciphertext: Vec<u8>,
}

/// Fill a buffer from the thread-local CSPRNG.
pub(crate) fn random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    rand::rng().fill_bytes(&mut buf);
    buf
}

/// Encrypt `plaintext` under `key` with a freshly generated IV.
pub(crate) fn seal(cipher: ContentCipher, key: &[u8], plaintext: &[u8]) -> Result<SealedContent> {
    let iv = random_bytes(cipher.iv_len()).to_vec();
    let ciphertext = match cipher {
        ContentCipher::Aes128Cbc => cbc_encrypt::<aes::Aes128>(key, &iv, plaintext)?,
        ContentCipher::Aes192Cbc => cbc_encrypt::<aes::Aes192>(key, &iv, plaintext)?,
        ContentCipher::Aes256Cbc => cbc_encrypt::<aes::Aes256>(key, &iv, plaintext)?,
        ContentCipher::DesEde3Cbc => cbc_encrypt::<des::TdesEde3>(key, &iv, plaintext)?,
        ContentCipher::DesCbc => cbc_encrypt::<des::Des>(key, &iv, plaintext)?,
        ContentCipher::Aes128Gcm => gcm_encrypt::<Aes128Gcm>(key, &iv, plaintext)?,
        ContentCipher::Aes256Gcm => gcm_encrypt::<Aes256Gcm>(key, &iv, plaintext)?,
    };
    Ok(SealedContent {
        algorithm: ContentAlgorithm { cipher, iv },
        ciphertext,
    })
}

/// Decrypt `ciphertext` with the recovered content-encryption key.
pub(crate) fn open(
    algorithm: &ContentAlgorithm,
    key: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let iv = &algorithm.iv;
    let plaintext = match algorithm.cipher {
        ContentCipher::Aes128Cbc => cbc_decrypt::<aes::Aes128>(key, iv, ciphertext)?,
        ContentCipher::Aes192Cbc => cbc_decrypt::<aes::Aes192>(key, iv, ciphertext)?,
        ContentCipher::Aes256Cbc => cbc_decrypt::<aes::Aes256>(key, iv, ciphertext)?,
        ContentCipher::DesEde3Cbc => cbc_decrypt::<des::TdesEde3>(key, iv, ciphertext)?,
        ContentCipher::DesCbc => cbc_decrypt::<des::Des>(key, iv, ciphertext)?,
        ContentCipher::Aes128Gcm => gcm_decrypt::<Aes128Gcm>(key, iv, ciphertext)?,
        ContentCipher::Aes256Gcm => gcm_decrypt::<Aes256Gcm>(key, iv, ciphertext)?,
    };
    Ok(Zeroizing::new(plaintext))
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| EyamlError::EncryptionFailed(format!("invalid key or IV length: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let block = iv.len();
    if ciphertext.is_empty() || ciphertext.len() % block != 0 {
        return Err(EyamlError::MalformedPkcs7(format!(
            "encrypted content length {} is not a multiple of the {block}-byte block size",
            ciphertext.len()
        )));
    }
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| EyamlError::RecipientMismatch(format!("invalid content key: {e}")))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EyamlError::PaddingError)
}

fn gcm_encrypt<A>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    let cipher = A::new_from_slice(key)
        .map_err(|e| EyamlError::EncryptionFailed(format!("invalid key length: {e}")))?;
    cipher
        .encrypt(Nonce::<A>::from_slice(nonce), plaintext)
        .map_err(|e| EyamlError::EncryptionFailed(format!("encryption error: {e}")))
}

fn gcm_decrypt<A>(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    let cipher = A::new_from_slice(key)
        .map_err(|e| EyamlError::RecipientMismatch(format!("invalid content key: {e}")))?;
    cipher
        .decrypt(Nonce::<A>::from_slice(nonce), ciphertext)
        .map_err(|_| EyamlError::PaddingError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::asn1::Reader;

    #[test]
    fn every_cipher_seals_and_opens() {
        let plaintext = b"DATABASE_URL=postgres://localhost/mydb";
        for cipher in ContentCipher::ALL {
            let key = random_bytes(cipher.key_len());
            let sealed = seal(cipher, &key, plaintext).unwrap();
            assert_eq!(sealed.algorithm.iv.len(), cipher.iv_len());
            let opened = open(&sealed.algorithm, &key, &sealed.ciphertext).unwrap();
            assert_eq!(&opened[..], plaintext, "{cipher}");
        }
    }

    #[test]
    fn algorithm_identifier_round_trips() {
        for cipher in ContentCipher::ALL {
            let alg = ContentAlgorithm {
                cipher,
                iv: vec![7; cipher.iv_len()],
            };
            let der = alg.to_der();
            let element = Reader::new(&der).read().unwrap();
            assert_eq!(ContentAlgorithm::parse(&element).unwrap(), alg);
        }
    }

    #[test]
    fn wrong_key_fails_padding_or_tag_check() {
        let key = [0x11u8; 32];
        let wrong = [0x22u8; 32];
        for cipher in [ContentCipher::Aes256Cbc, ContentCipher::Aes256Gcm] {
            let sealed = seal(cipher, &key, b"TOP_SECRET=42").unwrap();
            match open(&sealed.algorithm, &wrong, &sealed.ciphertext) {
                // CBC with a wrong key decrypts to garbage; padding almost always fails.
                Err(EyamlError::PaddingError) => {}
                Ok(garbage) => assert_ne!(&garbage[..], b"TOP_SECRET=42"),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn truncated_cbc_content_is_malformed() {
        let alg = ContentAlgorithm {
            cipher: ContentCipher::Aes128Cbc,
            iv: vec![0; 16],
        };
        let err = open(&alg, &[0u8; 16], &[0u8; 15]).unwrap_err();
        assert!(matches!(err, EyamlError::MalformedPkcs7(_)));
    }

    #[test]
    fn unknown_oid_is_unsupported() {
        let der = asn1::sequence(&[
            &asn1::oid(&ObjectIdentifier::new_unwrap("1.2.840.113549.3.2")),
            &asn1::octet_string(&[0; 8]),
        ]);
        let element = Reader::new(&der).read().unwrap();
        let err = ContentAlgorithm::parse(&element).unwrap_err();
        assert!(matches!(err, EyamlError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn cipher_names_parse() {
        assert_eq!(
            "AES-256-CBC".parse::<ContentCipher>().unwrap(),
            ContentCipher::Aes256Cbc
        );
        assert_eq!("des-cbc".parse::<ContentCipher>().unwrap(), ContentCipher::DesCbc);
        assert!("rc2-cbc".parse::<ContentCipher>().is_err());
        assert_eq!(ContentCipher::default(), ContentCipher::Aes256Cbc);
    }
}
