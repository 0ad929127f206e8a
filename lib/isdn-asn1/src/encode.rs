//! Encoders for the BER primitives, plus a constructed-value helper.
//!
//! Unlike the original's fixed-buffer reserve-and-fixup scheme (encode a
//! placeholder length, keep writing, then patch the length in once the
//! body's size is known), these build into a `Vec<u8>` and use a
//! measure-then-splice approach for constructed values: the body is
//! encoded into a scratch buffer first, so its length is already known
//! by the time the tag and length octets are written.

use crate::{length, oid::Oid, tag, Error};

pub fn boolean(out: &mut Vec<u8>, wire_tag: u32, value: bool) {
    tag::encode(out, wire_tag);
    length::encode(out, 1);
    out.push(value as u8);
}

/// Encode an INTEGER primitive, using the shortest two's-complement
/// encoding that round-trips `value` (matches the original's scan for the
/// first octet whose top 9 bits aren't all-ones or all-zeroes).
pub fn integer(out: &mut Vec<u8>, wire_tag: u32, value: i32) {
    let mut count: u32 = 3;
    let val = value as u32;
    let mut test_mask: u32 = 0xff80_0000;
    while count > 0 {
        let bits = val & test_mask;
        if bits != test_mask && bits != 0 {
            break;
        }
        test_mask >>= 8;
        count -= 1;
    }
    let num_octets = count + 1;
    tag::encode(out, wire_tag);
    length::encode(out, num_octets as usize);
    for shift in (0..num_octets).rev() {
        out.push((val >> (shift * 8)) as u8);
    }
}

pub fn null(out: &mut Vec<u8>, wire_tag: u32) {
    tag::encode(out, wire_tag);
    length::encode(out, 0);
}

pub fn object_identifier(out: &mut Vec<u8>, wire_tag: u32, value: &Oid) -> Result<(), Error> {
    let mut body = Vec::new();
    crate::oid::encode(&mut body, value)?;
    tag::encode(out, wire_tag);
    length::encode(out, body.len());
    out.extend_from_slice(&body);
    Ok(())
}

pub fn string_bin(out: &mut Vec<u8>, wire_tag: u32, value: &[u8]) {
    tag::encode(out, wire_tag);
    length::encode(out, value.len());
    out.extend_from_slice(value);
}

/// Encode a string, truncating to `max_len` bytes first.
pub fn string_max(out: &mut Vec<u8>, wire_tag: u32, value: &[u8], max_len: usize) {
    let truncated = if value.len() > max_len {
        &value[..max_len]
    } else {
        value
    };
    string_bin(out, wire_tag, truncated);
}

/// Encode a constructed value (SEQUENCE, SET, or a context-tagged
/// wrapper) by running `body` against a scratch buffer first, then
/// writing the tag, the now-known length, and the body into `out`.
///
/// Generic over the body's error type: this function never produces an
/// error of its own, so callers building higher-level codecs (whose
/// bodies fail with their own crate's error type, not this one) don't
/// need to convert anything to call it.
pub fn constructed<E>(
    out: &mut Vec<u8>,
    wire_tag: u32,
    body: impl FnOnce(&mut Vec<u8>) -> Result<(), E>,
) -> Result<(), E> {
    let mut scratch = Vec::new();
    body(&mut scratch)?;
    tag::encode(out, wire_tag);
    length::encode(out, scratch.len());
    out.extend_from_slice(&scratch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::decode;

    #[test]
    fn integer_roundtrips_small_and_negative() {
        for v in [0i32, 1, -1, 127, -128, 128, -129, 70000, -70000] {
            let mut buf = Vec::new();
            integer(&mut buf, tag::TAG_INTEGER, v);
            let mut cur = Cursor::new(&buf);
            cur.expect_tag(tag::TAG_INTEGER).unwrap();
            assert_eq!(decode::integer(&mut cur).unwrap(), v);
            assert!(cur.is_empty());
        }
    }

    #[test]
    fn boolean_roundtrips() {
        for v in [true, false] {
            let mut buf = Vec::new();
            boolean(&mut buf, tag::TAG_BOOLEAN, v);
            let mut cur = Cursor::new(&buf);
            cur.expect_tag(tag::TAG_BOOLEAN).unwrap();
            assert_eq!(decode::boolean(&mut cur).unwrap(), v);
        }
    }

    #[test]
    fn string_max_truncates_on_encode() {
        let mut buf = Vec::new();
        string_max(&mut buf, tag::TAG_OCTET_STRING, b"hello world", 5);
        let mut cur = Cursor::new(&buf);
        cur.expect_tag(tag::TAG_OCTET_STRING).unwrap();
        assert_eq!(
            decode::string_bin(&mut cur, tag::TAG_OCTET_STRING, 5).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn constructed_wraps_body_with_computed_length() {
        let mut buf = Vec::new();
        constructed(&mut buf, tag::TAG_SEQUENCE, |body| {
            integer(body, tag::TAG_INTEGER, 7);
            boolean(body, tag::TAG_BOOLEAN, true);
            Ok::<(), Error>(())
        })
        .unwrap();
        let mut cur = Cursor::new(&buf);
        cur.expect_tag(tag::TAG_SEQUENCE).unwrap();
        let len = cur.length().unwrap();
        assert_eq!(len, length::Length::Definite(6));
    }
}
