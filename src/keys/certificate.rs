//! X.509 recipient certificates.

use rsa::{BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};
use x509_cert::der::{Decode, Encode, Length, Reader, SliceReader};

use crate::crypto::enveloped::OID_RSA_ENCRYPTION;
use crate::errors::{EyamlError, Result};
use crate::keys::pem;

/// Largest RSA modulus accepted from a certificate, in bits.
pub const MAX_RSA_BITS: usize = 16384;

/// A parsed X.509 certificate.
///
/// Only reachable through [`parse_certificates`], so every value holds a
/// structurally valid certificate.
#[derive(Clone)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl Certificate {
    /// The certificate's DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// DER encoding of the issuer `Name`, as used in `IssuerAndSerialNumber`.
    pub fn issuer_der(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .issuer
            .to_der()
            .map_err(|e| EyamlError::KeyParse {
                what: "certificate issuer",
                reason: e.to_string(),
            })
    }

    /// DER encoding of the serial number `INTEGER`.
    pub fn serial_der(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .serial_number
            .to_der()
            .map_err(|e| EyamlError::KeyParse {
                what: "certificate serial",
                reason: e.to_string(),
            })
    }

    /// Human-readable subject, e.g. `CN=eyaml`. Empty for eyaml's default keys.
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// Human-readable issuer; equal to the subject for self-signed keys.
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    /// Colon-separated hex serial number.
    pub fn serial(&self) -> String {
        self.inner.tbs_certificate.serial_number.to_string()
    }

    pub fn not_after(&self) -> String {
        self.inner.tbs_certificate.validity.not_after.to_string()
    }

    /// SHA-256 over the certificate DER, uppercase hex.
    pub fn fingerprint_sha256(&self) -> String {
        Sha256::digest(&self.der)
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// The RSA public key carried by this certificate.
    ///
    /// Fails with [`EyamlError::UnsupportedAlgorithm`] for non-RSA keys and
    /// with [`EyamlError::KeyParse`] when the RSA key itself is malformed.
    /// Moduli up to [`MAX_RSA_BITS`] are accepted.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        let spki = &self.inner.tbs_certificate.subject_public_key_info;
        if spki.algorithm.oid != OID_RSA_ENCRYPTION {
            return Err(EyamlError::UnsupportedAlgorithm(format!(
                "certificate key algorithm {} is not RSA",
                spki.algorithm.oid
            )));
        }

        let malformed = |reason: String| EyamlError::KeyParse {
            what: "certificate RSA public key",
            reason,
        };
        let bits = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| malformed("public key bit string has unused bits".into()))?;
        let parts =
            rsa::pkcs1::RsaPublicKey::from_der(bits).map_err(|e| malformed(e.to_string()))?;

        RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(parts.modulus.as_bytes()),
            BigUint::from_bytes_be(parts.public_exponent.as_bytes()),
            MAX_RSA_BITS,
        )
        .map_err(|e| malformed(e.to_string()))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("serial", &self.serial())
            .finish()
    }
}

/// Parse a PEM string into the certificates it carries.
///
/// The PEM body may be a concatenation of DER certificates; all of them are
/// returned in order.  The block label is not checked.
pub fn parse_certificates(pem_text: &str) -> Result<Vec<Certificate>> {
    let block = pem::decode_single(pem_text)?;

    let mut reader = SliceReader::new(block.der()).map_err(|e| EyamlError::KeyParse {
        what: "certificate",
        reason: e.to_string(),
    })?;

    let mut certificates = Vec::new();
    while !reader.is_finished() {
        let start = offset(reader.position())?;
        let inner =
            x509_cert::Certificate::decode(&mut reader).map_err(|e| EyamlError::KeyParse {
                what: "certificate",
                reason: e.to_string(),
            })?;
        let end = offset(reader.position())?;
        certificates.push(Certificate {
            inner,
            der: block.der()[start..end].to_vec(),
        });
    }

    if certificates.is_empty() {
        return Err(EyamlError::KeyParse {
            what: "certificate",
            reason: "PEM block holds no certificate".into(),
        });
    }

    tracing::debug!(count = certificates.len(), "parsed recipient certificates");
    Ok(certificates)
}

fn offset(position: Length) -> Result<usize> {
    usize::try_from(position).map_err(|e| EyamlError::KeyParse {
        what: "certificate",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/public_key.pkcs7.pem");
    const EC_CERT: &str = include_str!("../../tests/fixtures/ec_public_key.pem");
    const LARGE_CERT: &str = include_str!("../../tests/fixtures/large_public_key.pem");

    #[test]
    fn parses_eyaml_style_certificate() {
        let certs = parse_certificates(PUBLIC_KEY).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].subject(), "");
        assert_eq!(certs[0].serial(), "01");
        assert!(certs[0].rsa_public_key().is_ok());
    }

    #[test]
    fn fingerprint_is_colon_separated_sha256() {
        let certs = parse_certificates(PUBLIC_KEY).unwrap();
        let fp = certs[0].fingerprint_sha256();
        assert_eq!(fp.split(':').count(), 32);
    }

    #[test]
    fn ec_certificate_has_no_rsa_key() {
        let certs = parse_certificates(EC_CERT).unwrap();
        let err = certs[0].rsa_public_key().unwrap_err();
        assert!(matches!(err, EyamlError::UnsupportedAlgorithm(_)));
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn accepts_rsa_keys_above_4096_bits() {
        use rsa::traits::PublicKeyParts;

        let certs = parse_certificates(LARGE_CERT).unwrap();
        let key = certs[0].rsa_public_key().unwrap();
        assert_eq!(key.n().bits(), 6144);
    }

    #[test]
    fn issuer_and_serial_encode_as_der() {
        let certs = parse_certificates(PUBLIC_KEY).unwrap();
        assert_eq!(certs[0].issuer(), certs[0].subject());
        assert_eq!(certs[0].issuer_der().unwrap()[0], 0x30);
        assert_eq!(certs[0].serial_der().unwrap(), vec![0x02, 0x01, 0x01]);
    }

    #[test]
    fn garbage_der_is_a_parse_error() {
        let pem = "-----BEGIN CERTIFICATE-----\naGVsbG8gd29ybGQ=\n-----END CERTIFICATE-----\n";
        let err = parse_certificates(pem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn two_pem_blocks_are_a_format_error() {
        let doubled = format!("{PUBLIC_KEY}{PUBLIC_KEY}");
        let err = parse_certificates(&doubled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
