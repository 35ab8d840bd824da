//! PKCS7 / CMS `EnvelopedData` structures.
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType  OID (envelopedData),
//!     content      [0] EXPLICIT EnvelopedData }
//!
//! EnvelopedData ::= SEQUENCE {
//!     version               INTEGER,
//!     originatorInfo        [0] IMPLICIT OPTIONAL,
//!     recipientInfos        SET OF RecipientInfo,
//!     encryptedContentInfo  SEQUENCE { contentType, algorithm, [0] IMPLICIT OCTET STRING },
//!     unprotectedAttrs      [1] IMPLICIT OPTIONAL }
//! ```
//!
//! Parsing accepts BER (indefinite lengths, segmented content) as written by
//! streaming encoders.  Encoding always produces DER.

use serde::Serialize;
use x509_cert::der::asn1::ObjectIdentifier;

use crate::crypto::asn1::{self, Element, Reader};
use crate::crypto::content::{ContentAlgorithm, ContentCipher};
use crate::errors::{EyamlError, Result};
use crate::keys::Certificate;

pub(crate) const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
pub(crate) const OID_ENVELOPED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
pub(crate) const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const TAG_SUBJECT_KEY_ID: u8 = 0x80;
const TAG_UNPROTECTED_ATTRS: u8 = 0xA1;

/// How a recipient is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecipientId {
    /// Raw DER of the issuer `Name` and of the serial `INTEGER`.
    IssuerAndSerial { issuer: Vec<u8>, serial: Vec<u8> },
    SubjectKeyId(Vec<u8>),
}

/// A `KeyTransRecipientInfo`.
#[derive(Debug, Clone)]
pub(crate) struct RecipientInfo {
    pub id: RecipientId,
    pub key_encryption: ObjectIdentifier,
    pub encrypted_key: Vec<u8>,
}

impl RecipientInfo {
    /// Build the recipient entry for `cert` around an RSA-encrypted key.
    pub fn for_certificate(cert: &Certificate, encrypted_key: Vec<u8>) -> Result<Self> {
        Ok(Self {
            id: RecipientId::IssuerAndSerial {
                issuer: cert.issuer_der()?,
                serial: cert.serial_der()?,
            },
            key_encryption: OID_RSA_ENCRYPTION,
            encrypted_key,
        })
    }

    fn parse(element: &Element<'_>) -> Result<Self> {
        let mut fields = element.children();
        let version = fields.expect(asn1::INTEGER, "recipient version")?.small_uint()?;

        let id = match fields.peek_tag() {
            Some(asn1::SEQUENCE) => {
                let ias = fields.read()?;
                let mut parts = ias.children();
                let issuer = parts.expect(asn1::SEQUENCE, "issuer name")?;
                let serial = parts.expect(asn1::INTEGER, "serial number")?;
                RecipientId::IssuerAndSerial {
                    issuer: issuer.raw.to_vec(),
                    serial: serial.raw.to_vec(),
                }
            }
            Some(TAG_SUBJECT_KEY_ID) => {
                RecipientId::SubjectKeyId(fields.read()?.octets()?.into_owned())
            }
            _ => return Err(EyamlError::MalformedPkcs7("missing recipient identifier".into())),
        };
        if !matches!((version, &id), (0, RecipientId::IssuerAndSerial { .. }) | (2, _)) {
            tracing::debug!(version, "recipient info has an unexpected version");
        }

        let algorithm = fields.expect(asn1::SEQUENCE, "key-encryption algorithm")?;
        let key_encryption = algorithm
            .children()
            .expect(asn1::OID, "key-encryption algorithm")?
            .oid()?;
        let encrypted_key = fields
            .expect(asn1::OCTET_STRING, "encrypted key")?
            .octets()?
            .into_owned();

        Ok(Self {
            id,
            key_encryption,
            encrypted_key,
        })
    }

    fn to_der(&self) -> Vec<u8> {
        let (version, rid) = match &self.id {
            RecipientId::IssuerAndSerial { issuer, serial } => {
                (0, asn1::sequence(&[issuer.as_slice(), serial.as_slice()]))
            }
            RecipientId::SubjectKeyId(ski) => (2, asn1::encode(TAG_SUBJECT_KEY_ID, ski)),
        };
        asn1::sequence(&[
            &asn1::small_uint(version),
            &rid,
            &asn1::sequence(&[&asn1::oid(&self.key_encryption), &asn1::null()]),
            &asn1::octet_string(&self.encrypted_key),
        ])
    }

    /// Whether this entry names `cert`.
    pub fn matches(&self, cert: &Certificate) -> Result<bool> {
        match &self.id {
            RecipientId::IssuerAndSerial { issuer, serial } => {
                Ok(*issuer == cert.issuer_der()? && *serial == cert.serial_der()?)
            }
            RecipientId::SubjectKeyId(_) => Ok(false),
        }
    }
}

/// A decoded `EnvelopedData` message.
#[derive(Debug, Clone)]
pub(crate) struct EnvelopedData {
    pub recipients: Vec<RecipientInfo>,
    pub content_type: ObjectIdentifier,
    pub algorithm: ContentAlgorithm,
    pub encrypted_content: Vec<u8>,
}

impl EnvelopedData {
    /// Parse a `ContentInfo` holding enveloped data.
    pub fn parse(der: &[u8]) -> Result<Self> {
        let mut top = Reader::new(der);
        let content_info = top.expect(asn1::SEQUENCE, "ContentInfo")?;
        if !top.is_empty() {
            return Err(EyamlError::MalformedPkcs7(
                "trailing data after ContentInfo".into(),
            ));
        }

        let mut fields = content_info.children();
        let content_type = fields.expect(asn1::OID, "content type")?.oid()?;
        if content_type != OID_ENVELOPED_DATA {
            return Err(EyamlError::MalformedPkcs7(format!(
                "content type {content_type} is not envelopedData"
            )));
        }
        let explicit = fields.expect(asn1::CONTEXT_0_CONSTRUCTED, "enveloped content")?;
        let enveloped = explicit
            .children()
            .expect(asn1::SEQUENCE, "EnvelopedData")?;

        let mut fields = enveloped.children();
        fields.expect(asn1::INTEGER, "version")?.small_uint()?;
        // originatorInfo carries certificates/CRLs only; nothing to use here.
        fields.optional(&[asn1::CONTEXT_0_CONSTRUCTED])?;

        let set = fields.expect(asn1::SET, "recipient infos")?;
        let mut recipients = Vec::new();
        let mut entries = set.children();
        while !entries.is_empty() {
            let entry = entries.read()?;
            if entry.tag == asn1::SEQUENCE {
                recipients.push(RecipientInfo::parse(&entry)?);
            } else {
                tracing::debug!(tag = entry.tag, "skipping non key-transport recipient");
            }
        }

        let eci = fields.expect(asn1::SEQUENCE, "encrypted content info")?;
        let mut eci_fields = eci.children();
        let content_type = eci_fields.expect(asn1::OID, "encrypted content type")?.oid()?;
        let algorithm =
            ContentAlgorithm::parse(&eci_fields.expect(asn1::SEQUENCE, "content algorithm")?)?;
        let encrypted_content = eci_fields
            .optional(&[asn1::CONTEXT_0, asn1::CONTEXT_0_CONSTRUCTED])?
            .ok_or_else(|| EyamlError::MalformedPkcs7("encrypted content is detached".into()))?
            .octets()?
            .into_owned();

        fields.optional(&[TAG_UNPROTECTED_ATTRS])?;
        if !fields.is_empty() {
            return Err(EyamlError::MalformedPkcs7(
                "unexpected data after encrypted content".into(),
            ));
        }

        Ok(Self {
            recipients,
            content_type,
            algorithm,
            encrypted_content,
        })
    }

    /// DER `ContentInfo`.
    pub fn to_der(&self) -> Vec<u8> {
        let recipients = asn1::set_of(self.recipients.iter().map(RecipientInfo::to_der).collect());
        let eci = asn1::sequence(&[
            &asn1::oid(&self.content_type),
            &self.algorithm.to_der(),
            &asn1::encode(asn1::CONTEXT_0, &self.encrypted_content),
        ]);
        let enveloped = asn1::sequence(&[&asn1::small_uint(0), &recipients, &eci]);
        asn1::sequence(&[
            &asn1::oid(&OID_ENVELOPED_DATA),
            &asn1::encode(asn1::CONTEXT_0_CONSTRUCTED, &enveloped),
        ])
    }

    /// The key-transport entry addressed to `cert`, if any.
    pub fn recipient_for(&self, cert: &Certificate) -> Result<Option<&RecipientInfo>> {
        for recipient in &self.recipients {
            if recipient.matches(cert)? {
                return Ok(Some(recipient));
            }
        }
        Ok(None)
    }

    pub fn summary(&self) -> EnvelopeInfo {
        EnvelopeInfo {
            content_cipher: self.algorithm.cipher,
            content_length: self.encrypted_content.len(),
            recipients: self
                .recipients
                .iter()
                .map(|r| match &r.id {
                    RecipientId::IssuerAndSerial { issuer, serial } => RecipientSummary {
                        issuer: describe_name(issuer),
                        serial: Some(hex_colon(integer_content(serial))),
                        subject_key_id: None,
                        key_encryption: r.key_encryption.to_string(),
                    },
                    RecipientId::SubjectKeyId(ski) => RecipientSummary {
                        issuer: None,
                        serial: None,
                        subject_key_id: Some(hex_colon(ski)),
                        key_encryption: r.key_encryption.to_string(),
                    },
                })
                .collect(),
        }
    }
}

/// Non-secret description of an envelope, for `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeInfo {
    pub content_cipher: ContentCipher,
    /// Length of the encrypted content in bytes.
    pub content_length: usize,
    pub recipients: Vec<RecipientSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientSummary {
    /// Issuer distinguished name; `None` when not decodable.
    pub issuer: Option<String>,
    pub serial: Option<String>,
    pub subject_key_id: Option<String>,
    pub key_encryption: String,
}

fn describe_name(der: &[u8]) -> Option<String> {
    use x509_cert::der::Decode;
    x509_cert::name::Name::from_der(der).ok().map(|n| n.to_string())
}

fn integer_content(raw: &[u8]) -> &[u8] {
    Reader::new(raw)
        .read()
        .map(|e| e.content)
        .unwrap_or(raw)
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
