use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in eyaml.
///
/// Messages never include key material or plaintext.
#[derive(Debug, Error)]
pub enum EyamlError {
    // --- Key loading errors ---
    #[error("Invalid PEM block: {0}")]
    InvalidPem(String),

    #[error("Unsupported key type '{0}' — only 'RSA PRIVATE KEY' (PKCS#1) is supported")]
    UnsupportedKeyType(String),

    #[error("Failed to parse {what}: {reason}")]
    KeyParse { what: &'static str, reason: String },

    // --- Envelope errors ---
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    // --- Cipher errors ---
    #[error("Malformed PKCS7 data: {0}")]
    MalformedPkcs7(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Private key does not match the recipient: {0}")]
    RecipientMismatch(String),

    #[error("Decryption failed — invalid padding or corrupted content")]
    PaddingError,

    #[error("Decrypted data is not valid UTF-8")]
    InvalidPlaintext,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Key file not found at {0}")]
    KeyFileNotFound(PathBuf),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Coarse error category, independent of the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed PEM framing or envelope markers.
    Format,
    /// Key encoding or algorithm not recognized.
    UnsupportedKeyType,
    /// DER/ASN.1 of key material is structurally invalid.
    Parse,
    /// Failure in the PKCS7 layer, including recipient mismatch and padding.
    Crypto,
    Io,
    Config,
    Command,
}

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    KeyLoading,
    Envelope,
    Cipher,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::KeyLoading => f.write_str("key loading"),
            Stage::Envelope => f.write_str("envelope"),
            Stage::Cipher => f.write_str("cipher"),
        }
    }
}

impl EyamlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EyamlError::InvalidPem(_) | EyamlError::InvalidEnvelope(_) => ErrorKind::Format,
            EyamlError::UnsupportedKeyType(_) => ErrorKind::UnsupportedKeyType,
            EyamlError::KeyParse { .. } => ErrorKind::Parse,
            EyamlError::MalformedPkcs7(_)
            | EyamlError::UnsupportedAlgorithm(_)
            | EyamlError::EncryptionFailed(_)
            | EyamlError::RecipientMismatch(_)
            | EyamlError::PaddingError
            | EyamlError::InvalidPlaintext => ErrorKind::Crypto,
            EyamlError::ConfigError(_) | EyamlError::KeyFileNotFound(_) => ErrorKind::Config,
            EyamlError::Io(_) => ErrorKind::Io,
            EyamlError::CommandFailed(_) => ErrorKind::Command,
        }
    }

    /// Which part of the pipeline failed, so callers can tell a wrong key
    /// (key loading) from a corrupted value (envelope / cipher).
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EyamlError::InvalidPem(_)
            | EyamlError::UnsupportedKeyType(_)
            | EyamlError::KeyParse { .. }
            | EyamlError::KeyFileNotFound(_) => Some(Stage::KeyLoading),
            EyamlError::InvalidEnvelope(_) => Some(Stage::Envelope),
            EyamlError::MalformedPkcs7(_)
            | EyamlError::UnsupportedAlgorithm(_)
            | EyamlError::EncryptionFailed(_)
            | EyamlError::RecipientMismatch(_)
            | EyamlError::PaddingError
            | EyamlError::InvalidPlaintext => Some(Stage::Cipher),
            _ => None,
        }
    }
}

/// Convenience type alias for eyaml results.
pub type Result<T> = std::result::Result<T, EyamlError>;
