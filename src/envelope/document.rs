//! Whole-document transforms for eyaml files.
//!
//! An eyaml document carries encrypted values as `ENC[PKCS7,...]`, possibly
//! wrapped over several indented lines.  For editing, those values are shown
//! as `DEC(<n>)::PKCS7[<plaintext>]!` and turned back into envelopes on save.
//! The crypto itself is supplied by the caller as a closure.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::errors::Result;

fn encrypted_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ENC\[PKCS7,[A-Za-z0-9+/=\s]*\]").expect("static regex is valid")
    })
}

fn decrypted_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)DEC(?:\(\d+\))?::PKCS7\[(.*?)\]!").expect("static regex is valid")
    })
}

/// Format a plaintext value as an editable marker.
pub fn dec_marker(index: usize, plaintext: &str) -> String {
    format!("DEC({index})::PKCS7[{plaintext}]!")
}

/// Replace every envelope in `text` with a `DEC(n)::PKCS7[...]!` marker.
///
/// `decrypt` receives the envelope (whitespace included) and returns the
/// plaintext.  The first error aborts the whole transform.
pub fn decrypt_document<F>(text: &str, mut decrypt: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    replace_all(encrypted_pattern(), text, |caps, index| {
        let plaintext = decrypt(&caps[0])?;
        Ok(dec_marker(index, &plaintext))
    })
}

/// Replace every `DEC::PKCS7[...]!` marker in `text` with a fresh envelope.
///
/// `encrypt` receives the plaintext and returns the `ENC[PKCS7,...]` string.
pub fn encrypt_document<F>(text: &str, mut encrypt: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    replace_all(decrypted_pattern(), text, |caps, _| encrypt(&caps[1]))
}

/// Count envelopes in a document without touching them.
pub fn count_envelopes(text: &str) -> usize {
    encrypted_pattern().find_iter(text).count()
}

fn replace_all<F>(re: &Regex, text: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&Captures<'_>, usize) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (i, caps) in re.captures_iter(text).enumerate() {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        out.push_str(&text[last..whole.start]);
        out.push_str(&replace(&caps, i + 1)?);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}
