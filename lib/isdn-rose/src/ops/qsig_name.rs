//! Q.SIG Name-Operations (ECMA-164 Annex C): CallingName, CalledName,
//! ConnectedName, BusyName. All four share the same `PartyName` argument
//! shape -- a single `Name` value -- and differ only in which invoke
//! operation carries them.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::Error;

pub const MAX_NAME_LEN: usize = 50;

/// ISO 8859-1 is the overwhelmingly common case (`char_set == 1`), encoded
/// as a bare implicit-tagged OCTET STRING; anything else falls back to the
/// explicit `NameSet { data, char_set }` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Iso8859_1,
    Other(i32),
}

impl CharacterSet {
    fn code(self) -> i32 {
        match self {
            CharacterSet::Iso8859_1 => 1,
            CharacterSet::Other(v) => v,
        }
    }

    fn from_code(code: i32) -> Self {
        if code == 1 {
            CharacterSet::Iso8859_1
        } else {
            CharacterSet::Other(code)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Name {
    NotPresent,
    Allowed { data: Vec<u8>, char_set: CharacterSet },
    Restricted { data: Vec<u8>, char_set: CharacterSet },
    RestrictedNull,
    NotAvailable,
}

const CTX_ALLOWED_STRING: u32 = tag::CLASS_CONTEXT as u32 | 0;
const CTX_ALLOWED_SET: u32 = tag::CLASS_CONTEXT as u32 | 1;
const CTX_RESTRICTED_STRING: u32 = tag::CLASS_CONTEXT as u32 | 2;
const CTX_RESTRICTED_SET: u32 = tag::CLASS_CONTEXT as u32 | 3;
const CTX_NOT_AVAILABLE: u32 = tag::CLASS_CONTEXT as u32 | 4;
const CTX_RESTRICTED_NULL: u32 = tag::CLASS_CONTEXT as u32 | 7;

fn encode_name_set(out: &mut Vec<u8>, wire_tag: u32, data: &[u8], char_set: CharacterSet) {
    encode::constructed(out, wire_tag, |body| {
        encode::string_bin(body, tag::TAG_OCTET_STRING, data);
        encode::integer(body, tag::TAG_INTEGER, char_set.code());
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn encode_name(out: &mut Vec<u8>, name: &Name) {
    match name {
        Name::NotPresent => {}
        Name::Allowed { data, char_set } => match char_set {
            CharacterSet::Iso8859_1 => encode::string_bin(out, CTX_ALLOWED_STRING, data),
            _ => encode_name_set(out, CTX_ALLOWED_SET, data, *char_set),
        },
        Name::Restricted { data, char_set } => match char_set {
            CharacterSet::Iso8859_1 => encode::string_bin(out, CTX_RESTRICTED_STRING, data),
            _ => encode_name_set(out, CTX_RESTRICTED_SET, data, *char_set),
        },
        Name::RestrictedNull => encode::null(out, CTX_RESTRICTED_NULL),
        Name::NotAvailable => encode::null(out, CTX_NOT_AVAILABLE),
    }
}

fn decode_name_set(cur: &mut Cursor<'_>, len: isdn_asn1::Length) -> Result<(Vec<u8>, CharacterSet), Error> {
    let mut data = Vec::new();
    let mut char_set = CharacterSet::Iso8859_1;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        if field_tag == tag::TAG_OCTET_STRING {
            data = decode::string_bin(c, field_tag, MAX_NAME_LEN)?;
        } else if field_tag == tag::TAG_INTEGER {
            char_set = CharacterSet::from_code(decode::integer(c)?);
        }
        Ok(())
    })?;
    Ok((data, char_set))
}

/// Decode a `Name`, given the component's already-peeked tag (the caller
/// must look ahead since `Name` is a CHOICE with no outer wrapper).
pub fn decode_name(cur: &mut Cursor<'_>, wire_tag: u32) -> Result<Name, Error> {
    match wire_tag {
        CTX_ALLOWED_STRING => Ok(Name::Allowed {
            data: decode::string_bin(cur, wire_tag, MAX_NAME_LEN)?,
            char_set: CharacterSet::Iso8859_1,
        }),
        CTX_ALLOWED_SET => {
            let len = cur.length()?;
            let (data, char_set) = decode_name_set(cur, len)?;
            Ok(Name::Allowed { data, char_set })
        }
        CTX_RESTRICTED_STRING => Ok(Name::Restricted {
            data: decode::string_bin(cur, wire_tag, MAX_NAME_LEN)?,
            char_set: CharacterSet::Iso8859_1,
        }),
        CTX_RESTRICTED_SET => {
            let len = cur.length()?;
            let (data, char_set) = decode_name_set(cur, len)?;
            Ok(Name::Restricted { data, char_set })
        }
        CTX_RESTRICTED_NULL => {
            decode::null(cur)?;
            Ok(Name::RestrictedNull)
        }
        CTX_NOT_AVAILABLE => {
            decode::null(cur)?;
            Ok(Name::NotAvailable)
        }
        other => Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(other))),
    }
}

/// All four Name-Operations (`CallingName`, `CalledName`,
/// `ConnectedName`, `BusyName`) share this argument shape: just a `Name`.
pub type PartyNameArg = Name;

pub fn encode_party_name_arg(out: &mut Vec<u8>, arg: &PartyNameArg) {
    encode_name(out, arg)
}

pub fn decode_party_name_arg(cur: &mut Cursor<'_>) -> Result<PartyNameArg, Error> {
    if cur.is_empty() {
        return Ok(Name::NotPresent);
    }
    let wire_tag = cur.tag()?;
    decode_name(cur, wire_tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_name_iso8859_1_presentation_allowed_roundtrips() {
        // name = "Alice", char_set = iso8859-1, presentation = allowed.
        let arg = Name::Allowed {
            data: b"Alice".to_vec(),
            char_set: CharacterSet::Iso8859_1,
        };
        let mut buf = Vec::new();
        encode_party_name_arg(&mut buf, &arg);
        assert_eq!(buf, [0x80, 0x05, b'A', b'l', b'i', b'c', b'e']);

        let mut cur = Cursor::new(&buf);
        let decoded = decode_party_name_arg(&mut cur).unwrap();
        assert_eq!(decoded, arg);
        assert!(cur.is_empty());
    }

    #[test]
    fn name_set_variant_roundtrips_with_non_default_char_set() {
        let arg = Name::Restricted {
            data: b"Bob".to_vec(),
            char_set: CharacterSet::Other(4),
        };
        let mut buf = Vec::new();
        encode_party_name_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_party_name_arg(&mut cur).unwrap(), arg);
    }

    #[test]
    fn restricted_null_and_not_available_roundtrip() {
        for arg in [Name::RestrictedNull, Name::NotAvailable] {
            let mut buf = Vec::new();
            encode_party_name_arg(&mut buf, &arg);
            let mut cur = Cursor::new(&buf);
            assert_eq!(decode_party_name_arg(&mut cur).unwrap(), arg);
        }
    }

    #[test]
    fn not_present_encodes_to_nothing() {
        let mut buf = Vec::new();
        encode_party_name_arg(&mut buf, &Name::NotPresent);
        assert!(buf.is_empty());
    }
}
