//! Strict single-block PEM framing.
//!
//! Key material must hold exactly one PEM block.  Whitespace around the
//! block is tolerated; anything else outside it (a second block, trailing
//! garbage, leading text) is rejected instead of silently ignored.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::errors::{EyamlError, Result};

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

/// A decoded PEM block: its type label and DER body.
///
/// The body is zeroized on drop since it may hold a private key.
pub struct PemBlock {
    label: String,
    der: Zeroizing<Vec<u8>>,
}

impl PemBlock {
    /// The type label, e.g. `CERTIFICATE` or `RSA PRIVATE KEY`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The decoded DER payload.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Decode exactly one PEM block from `input`.
pub fn decode_single(input: &str) -> Result<PemBlock> {
    let text = input.trim();

    let after_begin = text.strip_prefix(BEGIN).ok_or_else(|| {
        if text.contains(BEGIN) {
            EyamlError::InvalidPem("unexpected data before the BEGIN line".into())
        } else {
            EyamlError::InvalidPem("no PEM block found".into())
        }
    })?;

    // Label runs up to the closing dashes of the BEGIN line.
    let (begin_line, body_and_rest) = after_begin
        .split_once('\n')
        .ok_or_else(|| EyamlError::InvalidPem("truncated BEGIN line".into()))?;
    let label = begin_line
        .trim_end()
        .strip_suffix(DASHES)
        .filter(|l| !l.is_empty() && !l.contains('-'))
        .ok_or_else(|| EyamlError::InvalidPem("malformed BEGIN line".into()))?;

    let end_marker = format!("{END}{label}{DASHES}");
    let end_at = body_and_rest
        .find(&end_marker)
        .ok_or_else(|| EyamlError::InvalidPem(format!("missing END line for '{label}'")))?;

    let body = &body_and_rest[..end_at];
    let rest = body_and_rest[end_at + end_marker.len()..].trim();
    if !rest.is_empty() {
        return Err(if rest.contains(BEGIN) {
            EyamlError::InvalidPem("more than one PEM block supplied".into())
        } else {
            EyamlError::InvalidPem("unexpected data after the END line".into())
        });
    }

    // A stray BEGIN inside the body means blocks were nested or glued together.
    if body.contains(BEGIN) || body.contains(END) {
        return Err(EyamlError::InvalidPem(
            "more than one PEM block supplied".into(),
        ));
    }

    // Encapsulated headers (Proc-Type, DEK-Info) mark encrypted legacy keys.
    if body.lines().any(|line| line.contains(':')) {
        return Err(EyamlError::InvalidPem(
            "PEM headers (encrypted keys) are not supported".into(),
        ));
    }

    let encoded: Zeroizing<String> = Zeroizing::new(
        body.chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect(),
    );
    let der = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| EyamlError::InvalidPem(format!("invalid base64 body: {e}")))?;

    Ok(PemBlock {
        label: label.to_string(),
        der: Zeroizing::new(der),
    })
}
