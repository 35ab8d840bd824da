//! Minimal ASN.1 TLV reader and DER writer for PKCS7 structures.
//!
//! The reader accepts BER as produced by common PKCS7 implementations:
//! definite and indefinite lengths, and constructed OCTET STRINGs.  The
//! writer always emits DER.

use std::borrow::Cow;

use x509_cert::der::asn1::ObjectIdentifier;

use crate::errors::{EyamlError, Result};

pub(crate) const INTEGER: u8 = 0x02;
pub(crate) const OCTET_STRING: u8 = 0x04;
pub(crate) const NULL: u8 = 0x05;
pub(crate) const OID: u8 = 0x06;
pub(crate) const SEQUENCE: u8 = 0x30;
pub(crate) const SET: u8 = 0x31;

/// `[0]` primitive, as used for IMPLICIT OCTET STRING fields.
pub(crate) const CONTEXT_0: u8 = 0x80;
/// `[0]` constructed, as used for EXPLICIT fields.
pub(crate) const CONTEXT_0_CONSTRUCTED: u8 = 0xA0;

const CONSTRUCTED: u8 = 0x20;
const HIGH_TAG_NUMBER: u8 = 0x1F;

/// Nesting bound for indefinite-length elements.
const MAX_DEPTH: usize = 32;

fn malformed(msg: impl Into<String>) -> EyamlError {
    EyamlError::MalformedPkcs7(msg.into())
}

/// One decoded TLV element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    pub tag: u8,
    /// Content octets (for indefinite lengths, without the end-of-contents marker).
    pub content: &'a [u8],
    /// The full encoding, header included.
    pub raw: &'a [u8],
}

impl<'a> Element<'a> {
    pub fn is_constructed(&self) -> bool {
        self.tag & CONSTRUCTED != 0
    }

    /// Reader over the children of a constructed element.
    pub fn children(&self) -> Reader<'a> {
        Reader::new(self.content)
    }

    /// Octets of an OCTET STRING (or an implicitly tagged one), joining
    /// the segments of a BER constructed encoding.
    pub fn octets(&self) -> Result<Cow<'a, [u8]>> {
        if !self.is_constructed() {
            return Ok(Cow::Borrowed(self.content));
        }
        let mut joined = Vec::new();
        self.collect_segments(&mut joined, 0)?;
        Ok(Cow::Owned(joined))
    }

    fn collect_segments(&self, out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(malformed("OCTET STRING nested too deeply"));
        }
        let mut children = self.children();
        while !children.is_empty() {
            let segment = children.read()?;
            match segment.tag {
                OCTET_STRING => out.extend_from_slice(segment.content),
                t if t == OCTET_STRING | CONSTRUCTED => segment.collect_segments(out, depth + 1)?,
                t => {
                    return Err(malformed(format!(
                        "unexpected tag 0x{t:02X} inside constructed OCTET STRING"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Value of a small non-negative INTEGER.
    pub fn small_uint(&self) -> Result<u64> {
        if self.tag != INTEGER {
            return Err(malformed(format!("expected INTEGER, found tag 0x{:02X}", self.tag)));
        }
        match self.content {
            [] => Err(malformed("empty INTEGER")),
            [first, ..] if first & 0x80 != 0 => Err(malformed("negative INTEGER")),
            bytes if bytes.len() > 8 && bytes[..bytes.len() - 8].iter().any(|b| *b != 0) => {
                Err(malformed("INTEGER too large"))
            }
            bytes => Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))),
        }
    }

    pub fn oid(&self) -> Result<ObjectIdentifier> {
        if self.tag != OID {
            return Err(malformed(format!(
                "expected OBJECT IDENTIFIER, found tag 0x{:02X}",
                self.tag
            )));
        }
        ObjectIdentifier::from_bytes(self.content)
            .map_err(|e| malformed(format!("invalid OBJECT IDENTIFIER: {e}")))
    }
}

/// Sequential reader over a run of TLV elements.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Read the next element, whatever its tag.
    pub fn read(&mut self) -> Result<Element<'a>> {
        let (element, rest) = parse_element(self.data, 0)?;
        self.data = rest;
        Ok(element)
    }

    /// Read the next element and require `tag`.
    pub fn expect(&mut self, tag: u8, what: &str) -> Result<Element<'a>> {
        match self.peek_tag() {
            Some(t) if t == tag => self.read(),
            Some(t) => Err(malformed(format!(
                "expected {what} (tag 0x{tag:02X}), found tag 0x{t:02X}"
            ))),
            None => Err(malformed(format!("missing {what}"))),
        }
    }

    /// Read the next element only if its tag is one of `tags`.
    pub fn optional(&mut self, tags: &[u8]) -> Result<Option<Element<'a>>> {
        match self.peek_tag() {
            Some(t) if tags.contains(&t) => self.read().map(Some),
            _ => Ok(None),
        }
    }
}

fn parse_element(data: &[u8], depth: usize) -> Result<(Element<'_>, &[u8])> {
    if depth > MAX_DEPTH {
        return Err(malformed("structure nested too deeply"));
    }
    let (&tag, after_tag) = data.split_first().ok_or_else(|| malformed("unexpected end of data"))?;
    if tag & HIGH_TAG_NUMBER == HIGH_TAG_NUMBER {
        return Err(malformed("high tag numbers are not supported"));
    }
    let (&first_len, after_len) = after_tag
        .split_first()
        .ok_or_else(|| malformed("truncated length"))?;

    if first_len == 0x80 {
        if tag & CONSTRUCTED == 0 {
            return Err(malformed("indefinite length on a primitive element"));
        }
        // Walk the children until the end-of-contents marker.
        let mut cursor = after_len;
        loop {
            match cursor {
                [0x00, 0x00, rest @ ..] => {
                    let content_len = after_len.len() - cursor.len();
                    let raw_len = data.len() - rest.len();
                    let element = Element {
                        tag,
                        content: &after_len[..content_len],
                        raw: &data[..raw_len],
                    };
                    return Ok((element, rest));
                }
                [] => return Err(malformed("missing end-of-contents marker")),
                _ => {
                    let (_, rest) = parse_element(cursor, depth + 1)?;
                    cursor = rest;
                }
            }
        }
    }

    let (length, body) = if first_len < 0x80 {
        (usize::from(first_len), after_len)
    } else {
        let count = usize::from(first_len & 0x7F);
        if count > 4 || after_len.len() < count {
            return Err(malformed("unsupported or truncated length"));
        }
        let (len_bytes, body) = after_len.split_at(count);
        let length = len_bytes
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        (length, body)
    };

    if body.len() < length {
        return Err(malformed("element length exceeds available data"));
    }
    let header_len = data.len() - body.len();
    let element = Element {
        tag,
        content: &body[..length],
        raw: &data[..header_len + length],
    };
    Ok((element, &body[length..]))
}

// ── DER writer ───────────────────────────────────────────────────────

/// Encode one TLV with a definite DER length.
pub(crate) fn encode(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(content);
    out
}

pub(crate) fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    encode(SEQUENCE, &parts.concat())
}

/// DER `SET OF`: elements sorted by their encodings.
pub(crate) fn set_of(mut items: Vec<Vec<u8>>) -> Vec<u8> {
    items.sort();
    encode(SET, &items.concat())
}

pub(crate) fn oid(oid: &ObjectIdentifier) -> Vec<u8> {
    encode(OID, oid.as_bytes())
}

pub(crate) fn octet_string(bytes: &[u8]) -> Vec<u8> {
    encode(OCTET_STRING, bytes)
}

pub(crate) fn null() -> Vec<u8> {
    vec![NULL, 0x00]
}

/// A small non-negative INTEGER (versions, tag lengths).
pub(crate) fn small_uint(value: u8) -> Vec<u8> {
    if value < 0x80 {
        encode(INTEGER, &[value])
    } else {
        encode(INTEGER, &[0x00, value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_definite_length_sequence() {
        let der = sequence(&[&small_uint(3), &octet_string(b"abc")]);
        let mut outer = Reader::new(&der);
        let seq = outer.expect(SEQUENCE, "SEQUENCE").unwrap();
        assert!(outer.is_empty());

        let mut inner = seq.children();
        assert_eq!(inner.read().unwrap().small_uint().unwrap(), 3);
        assert_eq!(&*inner.read().unwrap().octets().unwrap(), b"abc");
        assert!(inner.is_empty());
    }

    #[test]
    fn long_form_lengths_round_trip() {
        let payload = vec![0xAB; 300];
        let der = octet_string(&payload);
        assert_eq!(&der[..4], &[0x04, 0x82, 0x01, 0x2C]);
        let el = Reader::new(&der).read().unwrap();
        assert_eq!(el.content, &payload[..]);
        assert_eq!(el.raw.len(), der.len());
    }

    #[test]
    fn reads_indefinite_length_with_constructed_octets() {
        // [0] constructed, indefinite: two OCTET STRING segments, then EOC.
        let ber = [
            0xA0, 0x80, 0x04, 0x02, b'h', b'i', 0x04, 0x01, b'!', 0x00, 0x00, 0x05, 0x00,
        ];
        let mut reader = Reader::new(&ber);
        let el = reader.read().unwrap();
        assert_eq!(el.tag, CONTEXT_0_CONSTRUCTED);
        assert_eq!(&*el.octets().unwrap(), b"hi!");
        assert_eq!(el.raw.len(), 11);
        assert_eq!(reader.read().unwrap().tag, NULL);
    }

    #[test]
    fn rejects_truncated_data() {
        assert!(Reader::new(&[0x30, 0x05, 0x02]).read().is_err());
        assert!(Reader::new(&[0x30]).read().is_err());
        assert!(Reader::new(&[0x30, 0x80, 0x02, 0x01, 0x00]).read().is_err());
    }

    #[test]
    fn rejects_indefinite_primitive() {
        assert!(Reader::new(&[0x04, 0x80, 0x00, 0x00]).read().is_err());
    }

    #[test]
    fn expect_reports_wrong_tag() {
        let der = null();
        let err = Reader::new(&der).expect(SEQUENCE, "ContentInfo").unwrap_err();
        assert!(err.to_string().contains("ContentInfo"));
    }

    #[test]
    fn set_of_sorts_members() {
        let set = set_of(vec![octet_string(b"b"), octet_string(b"a")]);
        assert_eq!(set, vec![0x31, 0x06, 0x04, 0x01, b'a', 0x04, 0x01, b'b']);
    }

    #[test]
    fn small_uint_rejects_negative_values() {
        let der = encode(INTEGER, &[0xFF]);
        assert!(Reader::new(&der).read().unwrap().small_uint().is_err());
        assert_eq!(small_uint(0x90), vec![0x02, 0x02, 0x00, 0x90]);
    }

    #[test]
    fn oid_round_trips() {
        let id = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
        let der = oid(&id);
        assert_eq!(Reader::new(&der).read().unwrap().oid().unwrap(), id);
    }
}
