//! Textual transport for encrypted values.
//!
//! - `codec`: the `ENC[PKCS7,<base64>]` envelope and its output formats
//! - `document`: rewriting every envelope / marker inside an eyaml file

pub mod codec;
pub mod document;

pub use codec::{decode_payload, encode_payload, format, normalize, unwrap, wrap, OutputFormat};
pub use document::{decrypt_document, encrypt_document};
