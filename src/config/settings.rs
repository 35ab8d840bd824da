use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::ContentCipher;
use crate::envelope::OutputFormat;
use crate::errors::{EyamlError, Result};

/// Project-level configuration, loaded from `.eyaml.toml`.
///
/// Every field has a default matching the eyaml key layout, so the tool
/// works without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Recipient certificate(s), relative to the config directory.
    #[serde(default = "default_public_key")]
    pub public_key: String,

    /// PKCS#1 RSA private key, relative to the config directory.
    #[serde(default = "default_private_key")]
    pub private_key: String,

    /// Content cipher used for new values (default: aes-256-cbc).
    #[serde(default)]
    pub content_cipher: ContentCipher,

    /// How `encrypt` prints envelopes: string or block.
    #[serde(default)]
    pub output: OutputFormat,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_public_key() -> String {
    "./keys/public_key.pkcs7.pem".to_string()
}

fn default_private_key() -> String {
    "./keys/private_key.pkcs7.pem".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_key: default_public_key(),
            private_key: default_private_key(),
            content_cipher: ContentCipher::default(),
            output: OutputFormat::default(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = ".eyaml.toml";

    /// Load settings from `<config_dir>/.eyaml.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            EyamlError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded config file");
        Ok(settings)
    }

    /// Public key path, resolved against `config_dir` unless absolute.
    pub fn public_key_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.public_key)
    }

    /// Private key path, resolved against `config_dir` unless absolute.
    pub fn private_key_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.private_key)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
