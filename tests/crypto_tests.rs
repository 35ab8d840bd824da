//! Integration tests for the eyaml crypto module.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use eyaml::crypto::{
    decrypt, decrypt_envelope, decrypt_value, encrypt, encrypt_to_envelope, encrypt_value,
    encrypt_value_with, encrypt_with, inspect, ContentCipher,
};
use eyaml::envelope::{decode_payload, encode_payload, unwrap, wrap};
use eyaml::errors::{ErrorKind, EyamlError, Stage};
use eyaml::keys::{parse_certificates, parse_private_key};

const PUBLIC_KEY: &str = include_str!("fixtures/public_key.pkcs7.pem");
const PRIVATE_KEY: &str = include_str!("fixtures/private_key.pkcs7.pem");
const OTHER_PUBLIC_KEY: &str = include_str!("fixtures/other_public_key.pem");
const OTHER_PRIVATE_KEY: &str = include_str!("fixtures/other_private_key.pem");
const EC_PUBLIC_KEY: &str = include_str!("fixtures/ec_public_key.pem");
const LARGE_PUBLIC_KEY: &str = include_str!("fixtures/large_public_key.pem");
const LARGE_PRIVATE_KEY: &str = include_str!("fixtures/large_private_key.pem");

/// Plaintext of every envelope fixture.
const FIXTURE_PLAINTEXT: &str = "this-value-will-be-encrypted";

/// Both certificates of the fixture set in one PEM block, `first` leading.
fn combined_pem(first: &str, second: &str) -> String {
    let mut der = parse_certificates(first).unwrap()[0].as_der().to_vec();
    der.extend_from_slice(parse_certificates(second).unwrap()[0].as_der());
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        STANDARD.encode(der)
    )
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

#[test]
fn value_round_trip() {
    for value in [
        "this-value-will-be-encrypted",
        "this-value-will-be-encrypted-too",
    ] {
        let payload = encrypt_value(value, PUBLIC_KEY).expect("encrypt");
        let decrypted = decrypt_value(&payload, PRIVATE_KEY, PUBLIC_KEY).expect("decrypt");
        assert_eq!(decrypted, value);
    }
}

#[test]
fn same_plaintext_encrypts_differently_each_time() {
    let a = encrypt_value("this-value-will-be-encrypted", PUBLIC_KEY).unwrap();
    let b = encrypt_value("this-value-will-be-encrypted", PUBLIC_KEY).unwrap();
    let c = encrypt_value("this-value-will-be-encrypted-too", PUBLIC_KEY).unwrap();
    assert_ne!(a, b);
    assert_ne!(a, c);
}

#[test]
fn every_content_cipher_round_trips() {
    for cipher in ContentCipher::ALL {
        let payload = encrypt_value_with("DATABASE_URL=postgres://db/app", PUBLIC_KEY, cipher)
            .unwrap_or_else(|e| panic!("{cipher}: {e}"));
        let der = decode_payload(&payload).unwrap();
        assert_eq!(inspect(&der).unwrap().content_cipher, cipher);
        assert_eq!(
            decrypt_value(&payload, PRIVATE_KEY, PUBLIC_KEY).unwrap(),
            "DATABASE_URL=postgres://db/app"
        );
    }
}

#[test]
fn empty_and_multibyte_values_round_trip() {
    for value in ["", "p\u{00e4}ssw\u{00f6}rd \u{1F511}", "line1\nline2\n"] {
        let env = encrypt_to_envelope(value, PUBLIC_KEY, ContentCipher::default()).unwrap();
        assert_eq!(decrypt_envelope(&env, PRIVATE_KEY, PUBLIC_KEY).unwrap(), value);
    }
}

#[test]
fn binary_plaintext_round_trips_through_der_api() {
    let certs = parse_certificates(PUBLIC_KEY).unwrap();
    let key = parse_private_key(PRIVATE_KEY).unwrap();
    let plaintext: Vec<u8> = (0..=255u8).collect();

    let der = encrypt_with(&plaintext, &certs, ContentCipher::DesEde3Cbc).unwrap();
    assert_eq!(&decrypt(&der, &key, &certs[0]).unwrap()[..], &plaintext[..]);
}

#[test]
fn envelope_is_der_enveloped_data() {
    let certs = parse_certificates(PUBLIC_KEY).unwrap();
    let der = encrypt(b"x", &certs).unwrap();
    // SEQUENCE, then the envelopedData OID.
    assert_eq!(der[0], 0x30);
    let oid = [
        0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x03,
    ];
    assert!(der.windows(oid.len()).any(|w| w == oid));

    let env = wrap(&encode_payload(&der));
    assert!(env.starts_with("ENC[PKCS7,MII"));
    assert_eq!(decode_payload(unwrap(&env).unwrap()).unwrap(), der);
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

#[test]
fn wrong_private_key_is_recipient_mismatch() {
    let payload = encrypt_value("secret", PUBLIC_KEY).unwrap();

    let err = decrypt_value(&payload, OTHER_PRIVATE_KEY, PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::RecipientMismatch(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert_eq!(err.stage(), Some(Stage::Cipher));

    let err = decrypt_value(&payload, OTHER_PRIVATE_KEY, OTHER_PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::RecipientMismatch(_)), "{err}");
}

#[test]
fn multi_certificate_pem_encrypts_for_all() {
    let pem = combined_pem(PUBLIC_KEY, OTHER_PUBLIC_KEY);
    let payload = encrypt_value("shared", &pem).unwrap();

    let der = decode_payload(&payload).unwrap();
    assert_eq!(inspect(&der).unwrap().recipients.len(), 2);

    // Each key decrypts when its own certificate is given.
    assert_eq!(decrypt_value(&payload, PRIVATE_KEY, PUBLIC_KEY).unwrap(), "shared");
    assert_eq!(
        decrypt_value(&payload, OTHER_PRIVATE_KEY, OTHER_PUBLIC_KEY).unwrap(),
        "shared"
    );
}

#[test]
fn decryption_uses_only_the_first_certificate() {
    let pem = combined_pem(OTHER_PUBLIC_KEY, PUBLIC_KEY);
    let payload = encrypt_value("shared", &pem).unwrap();

    assert_eq!(
        decrypt_value(&payload, OTHER_PRIVATE_KEY, &pem).unwrap(),
        "shared"
    );
    // The matching certificate is second, so it is never consulted.
    let err = decrypt_value(&payload, PRIVATE_KEY, &pem).unwrap_err();
    assert!(matches!(err, EyamlError::RecipientMismatch(_)), "{err}");
}

#[test]
fn non_rsa_certificate_cannot_be_a_recipient() {
    let err = encrypt_value("x", EC_PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::UnsupportedAlgorithm(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[test]
fn large_rsa_key_round_trip() {
    let payload = encrypt_value(FIXTURE_PLAINTEXT, LARGE_PUBLIC_KEY).unwrap();
    assert_eq!(
        decrypt_value(&payload, LARGE_PRIVATE_KEY, LARGE_PUBLIC_KEY).unwrap(),
        FIXTURE_PLAINTEXT
    );
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn broken_cbc_padding_is_padding_error() {
    // 40 bytes pad to 48 with eight 0x08 bytes; flipping the last byte of the
    // previous ciphertext block turns the final pad byte into 0x00.
    let value = "x".repeat(40);
    let payload = encrypt_value_with(&value, PUBLIC_KEY, ContentCipher::Aes256Cbc).unwrap();
    let mut der = decode_payload(&payload).unwrap();
    let target = der.len() - 17;
    der[target] ^= 0x08;

    let err = decrypt_value(&encode_payload(&der), PRIVATE_KEY, PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::PaddingError), "{err}");
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[test]
fn non_utf8_plaintext_is_invalid_plaintext() {
    let certs = parse_certificates(PUBLIC_KEY).unwrap();
    let der = encrypt_with(&[0xff, 0xfe], &certs, ContentCipher::default()).unwrap();

    let err = decrypt_value(&encode_payload(&der), PRIVATE_KEY, PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::InvalidPlaintext), "{err}");
}

#[test]
fn tampered_gcm_tag_is_padding_error() {
    let payload = encrypt_value_with("secret", PUBLIC_KEY, ContentCipher::Aes256Gcm).unwrap();
    let mut der = decode_payload(&payload).unwrap();
    let last = der.len() - 1;
    der[last] ^= 0x01;

    let err = decrypt_value(&encode_payload(&der), PRIVATE_KEY, PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::PaddingError), "{err}");
}

#[test]
fn truncated_envelope_is_malformed() {
    let payload = encrypt_value("secret", PUBLIC_KEY).unwrap();
    let der = decode_payload(&payload).unwrap();

    let err = decrypt_value(&encode_payload(&der[..der.len() / 2]), PRIVATE_KEY, PUBLIC_KEY)
        .unwrap_err();
    assert!(matches!(err, EyamlError::MalformedPkcs7(_)), "{err}");
}

#[test]
fn invalid_base64_is_envelope_format_error() {
    let err = decrypt_value("%%%not-base64%%%", PRIVATE_KEY, PUBLIC_KEY).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(err.stage(), Some(Stage::Envelope));
}

#[test]
fn bad_key_material_fails_before_decryption() {
    let payload = encrypt_value("secret", PUBLIC_KEY).unwrap();

    let err = decrypt_value(&payload, "not a pem", PUBLIC_KEY).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::KeyLoading));

    let err = decrypt_value(&payload, PRIVATE_KEY, "").unwrap_err();
    assert_eq!(err.stage(), Some(Stage::KeyLoading));
}

// ---------------------------------------------------------------------------
// Interoperability with envelopes written by other tools
// ---------------------------------------------------------------------------

fn decrypt_fixture(b64: &str) -> String {
    decrypt_value(b64.trim(), PRIVATE_KEY, PUBLIC_KEY).expect("fixture should decrypt")
}

#[test]
fn decrypts_openssl_cms_envelopes() {
    let fixtures = [
        (include_str!("fixtures/openssl_aes-256-cbc.b64"), ContentCipher::Aes256Cbc),
        (include_str!("fixtures/openssl_aes-192-cbc.b64"), ContentCipher::Aes192Cbc),
        (include_str!("fixtures/openssl_aes-128-cbc.b64"), ContentCipher::Aes128Cbc),
        (include_str!("fixtures/openssl_des-ede3-cbc.b64"), ContentCipher::DesEde3Cbc),
        (include_str!("fixtures/openssl_des-cbc.b64"), ContentCipher::DesCbc),
    ];
    for (b64, cipher) in fixtures {
        let der = decode_payload(b64).unwrap();
        assert_eq!(inspect(&der).unwrap().content_cipher, cipher);
        assert_eq!(decrypt_fixture(b64), FIXTURE_PLAINTEXT, "{cipher}");
    }
}

#[test]
fn decrypts_streamed_ber_envelope() {
    assert_eq!(
        decrypt_fixture(include_str!("fixtures/openssl_stream_ber.b64")),
        FIXTURE_PLAINTEXT
    );
}

#[test]
fn decrypts_legacy_des_envelope() {
    let b64 = include_str!("fixtures/legacy_des-cbc.b64");
    assert!(b64.starts_with("MIIBfQYJKoZIhvcNAQcDoIIBbjCCAWoCAQAxggEfMIIBGwIBADAFMAACAQEw"));
    assert_eq!(decrypt_fixture(b64), FIXTURE_PLAINTEXT);
}

#[test]
fn legacy_envelope_with_other_key_is_mismatch() {
    let b64 = include_str!("fixtures/legacy_des-cbc.b64");
    let err = decrypt_value(b64.trim(), OTHER_PRIVATE_KEY, OTHER_PUBLIC_KEY).unwrap_err();
    assert!(matches!(err, EyamlError::RecipientMismatch(_)), "{err}");
}
