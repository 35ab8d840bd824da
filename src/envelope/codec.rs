//! The `ENC[PKCS7,<base64>]` transport envelope.
//!
//! Layout of an envelope string:
//!   `ENC[PKCS7,` | standard padded base64 of the PKCS7 DER | `]`

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{EyamlError, Result};

/// Literal envelope prefix.
pub const PREFIX: &str = "ENC[PKCS7,";

/// Literal envelope suffix.
pub const SUFFIX: &str = "]";

/// Column width of the block output format.
const BLOCK_WIDTH: usize = 60;

/// Indentation used by the block output format.
const BLOCK_INDENT: &str = "    ";

/// Wrap a base64 payload in the envelope markers.
pub fn wrap(payload: &str) -> String {
    format!("{PREFIX}{payload}{SUFFIX}")
}

/// Strip the envelope markers and return the payload.
///
/// Only the exact prefix and suffix are checked; the payload itself is
/// validated when it is decoded.
pub fn unwrap(envelope: &str) -> Result<&str> {
    let rest = envelope.strip_prefix(PREFIX).ok_or_else(|| {
        EyamlError::InvalidEnvelope(
            "data does not appear to start with an encryption envelope".into(),
        )
    })?;
    rest.strip_suffix(SUFFIX).ok_or_else(|| {
        EyamlError::InvalidEnvelope("data does not appear to end with an encryption envelope".into())
    })
}

/// Base64-encode a DER blob for transport (no line wrapping).
pub fn encode_payload(der: &[u8]) -> String {
    STANDARD.encode(der)
}

/// Decode a transport payload back into DER.
///
/// ASCII whitespace is removed first so payloads rendered in the block
/// format (which we emit ourselves) decode again.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(EyamlError::InvalidEnvelope("empty payload".into()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| EyamlError::InvalidEnvelope(format!("payload is not valid base64: {e}")))
}

/// How an envelope is rendered for the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line: `ENC[PKCS7,...]`.
    #[default]
    String,
    /// A YAML folded scalar wrapped at 60 columns.
    Block,
}

impl FromStr for OutputFormat {
    type Err = EyamlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" => Ok(OutputFormat::String),
            "block" => Ok(OutputFormat::Block),
            other => Err(EyamlError::ConfigError(format!(
                "unknown output format '{other}' — supported: string, block"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::String => f.write_str("string"),
            OutputFormat::Block => f.write_str("block"),
        }
    }
}

/// Render an envelope in the requested format.
pub fn format(envelope: &str, output: OutputFormat) -> String {
    match output {
        OutputFormat::String => envelope.to_string(),
        OutputFormat::Block => {
            let mut out = String::from(">\n");
            let chars: Vec<char> = envelope.chars().collect();
            for (i, line) in chars.chunks(BLOCK_WIDTH).enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(BLOCK_INDENT);
                out.extend(line.iter());
            }
            out
        }
    }
}

/// Undo [`format`]: accept either a plain envelope or a block rendering.
///
/// Returns the envelope on one line.  Whitespace inside the payload is
/// kept; [`decode_payload`] drops it.
pub fn normalize(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('>')
        .map(str::trim_start)
        .unwrap_or(trimmed)
}
