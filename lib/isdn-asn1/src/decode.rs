//! Decoders for the BER primitives the ROSE argument codecs build on:
//! BOOLEAN, INTEGER, NULL, and the two string flavors libpri distinguishes
//! by overflow behavior (`_bin` fails, `_max` truncates).

use crate::cursor::Cursor;
use crate::length::Length;
use crate::{tag, Error};

/// Decode a BOOLEAN primitive. Per X.690 any nonzero octet is TRUE, but
/// BER requires exactly one content octet.
pub fn boolean(cur: &mut Cursor<'_>) -> Result<bool, Error> {
    match cur.length()? {
        Length::Definite(1) => Ok(cur.byte()? != 0),
        Length::Definite(_) => Err(Error::Truncated),
        Length::Indefinite => Err(Error::Truncated),
    }
}

/// Decode an INTEGER primitive into a two's-complement `i32`. Matches the
/// original's sign-extend-then-shift-in loop: the accumulator seeds to -1
/// or 0 depending on the sign bit of the first content octet, then every
/// content octet (regardless of how many there are) shifts in, so an
/// encoding wider than 4 octets silently loses its high bits exactly as
/// the C implementation does.
pub fn integer(cur: &mut Cursor<'_>) -> Result<i32, Error> {
    let len = match cur.length()? {
        Length::Definite(n) if n > 0 => n,
        _ => return Err(Error::Truncated),
    };
    let first = cur.byte()?;
    let mut value: i32 = if first & 0x80 != 0 { -1 } else { 0 };
    value = (value << 8) | first as i32;
    for _ in 1..len {
        let byte = cur.byte()?;
        value = (value << 8) | byte as i32;
    }
    Ok(value)
}

/// Decode a NULL primitive: must be zero-length.
pub fn null(cur: &mut Cursor<'_>) -> Result<(), Error> {
    match cur.length()? {
        Length::Definite(0) => Ok(()),
        Length::Definite(_) => Err(Error::NullHasContent),
        Length::Indefinite => Err(Error::NullHasContent),
    }
}

/// Decode an OBJECT IDENTIFIER primitive.
pub fn object_identifier(cur: &mut Cursor<'_>) -> Result<crate::oid::Oid, Error> {
    let len = match cur.length()? {
        Length::Definite(n) => n,
        Length::Indefinite => return Err(Error::Truncated),
    };
    let bytes = cur.bytes(len)?;
    crate::oid::decode(bytes)
}

/// Decode a string primitive, failing if it doesn't fit in `max_len`
/// bytes. `tag` is the already-decoded tag of this string component (its
/// constructed bit distinguishes an ITU indefinite-length encoding, which
/// may itself be built from nested substrings, from a raw non-ITU one
/// terminated by the first `0x00` byte).
pub fn string_bin(cur: &mut Cursor<'_>, component_tag: u32, max_len: usize) -> Result<Vec<u8>, Error> {
    decode_string(cur, component_tag, max_len, false)
}

/// Decode a string primitive, silently truncating to `max_len` bytes
/// instead of failing.
pub fn string_max(cur: &mut Cursor<'_>, component_tag: u32, max_len: usize) -> Result<Vec<u8>, Error> {
    decode_string(cur, component_tag, max_len, true)
}

fn decode_string(
    cur: &mut Cursor<'_>,
    component_tag: u32,
    max_len: usize,
    truncate: bool,
) -> Result<Vec<u8>, Error> {
    match cur.length()? {
        Length::Definite(n) => {
            let bytes = cur.bytes(n)?;
            take_up_to(bytes, max_len, truncate)
        }
        Length::Indefinite => decode_indefinite_string(cur, component_tag, max_len, truncate),
    }
}

fn take_up_to(bytes: &[u8], max_len: usize, truncate: bool) -> Result<Vec<u8>, Error> {
    if bytes.len() > max_len {
        if truncate {
            Ok(bytes[..max_len].to_vec())
        } else {
            Err(Error::StringTooLong)
        }
    } else {
        Ok(bytes.to_vec())
    }
}

fn decode_indefinite_string(
    cur: &mut Cursor<'_>,
    component_tag: u32,
    max_len: usize,
    truncate: bool,
) -> Result<Vec<u8>, Error> {
    // An indefinite-length string's `00 00` end-of-contents octets get
    // split across the two branches below and this function's tail: each
    // branch consumes the first `0x00` as a side effect of finding its
    // own terminator, leaving exactly one more `0x00` to check here.
    let piece = if tag::is_constructed(component_tag) {
        // ITU-encoded indefinite string: a sequence of substrings, each
        // itself a string component, concatenated until the terminator
        // tag (whose octet IS the first `0x00`).
        let mut out = Vec::new();
        loop {
            let sub_tag = cur.tag()?;
            if sub_tag == 0 {
                break;
            }
            let remaining_cap = max_len.saturating_sub(out.len());
            let sub_piece = decode_string(cur, sub_tag, remaining_cap, truncate)?;
            out.extend_from_slice(&sub_piece);
        }
        out
    } else {
        // Non-ITU indefinite string: raw content octets up to the first
        // literal 0x00 byte, which terminates the string itself.
        let raw = cur.as_slice();
        let terminator = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::MissingTerminator)?;
        let piece = take_up_to(&raw[..terminator], max_len, truncate)?;
        cur.bytes(terminator + 1)?;
        piece
    };
    if cur.byte().map_err(|_| Error::MissingTerminator)? != 0 {
        return Err(Error::MissingTerminator);
    }
    Ok(piece)
}
