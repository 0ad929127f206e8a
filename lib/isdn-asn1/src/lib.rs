//! Minimal BER (ASN.1 Basic Encoding Rules) codec for the subset of the
//! standard ROSE operation arguments use: booleans, integers, NULLs,
//! object identifiers, octet/character strings, and constructed
//! SEQUENCE/SET wrappers, in both definite and indefinite length form.
//!
//! This crate only implements what the wire protocol actually needs; it
//! is not a general-purpose ASN.1 toolkit.

pub mod cursor;
pub mod decode;
pub mod encode;
mod error;
pub mod length;
pub mod oid;
pub mod tag;

pub use cursor::Cursor;
pub use error::Error;
pub use length::Length;
pub use oid::Oid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_of_two_ints_roundtrips_via_for_each_component() {
        let mut buf = Vec::new();
        encode::constructed(&mut buf, tag::TAG_SEQUENCE, |body| {
            encode::integer(body, tag::TAG_INTEGER, 1);
            encode::integer(body, tag::TAG_INTEGER, 2);
            Ok::<(), Error>(())
        })
        .unwrap();

        let mut cur = Cursor::new(&buf);
        cur.expect_tag(tag::TAG_SEQUENCE).unwrap();
        let len = cur.length().unwrap();
        let mut values = Vec::new();
        cursor::for_each_component(&mut cur, len, |c| {
            c.expect_tag(tag::TAG_INTEGER)?;
            values.push(decode::integer(c)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn indefinite_length_sequence_decodes_same_as_definite() {
        // Hand-built: SEQUENCE, indefinite length, one INTEGER(5), then
        // end-of-contents octets.
        let mut buf = vec![tag::TAG_SEQUENCE as u8, 0x80];
        encode::integer(&mut buf, tag::TAG_INTEGER, 5);
        buf.push(0x00);
        buf.push(0x00);

        let mut cur = Cursor::new(&buf);
        cur.expect_tag(tag::TAG_SEQUENCE).unwrap();
        let len = cur.length().unwrap();
        assert_eq!(len, Length::Indefinite);
        let mut values = Vec::new();
        cursor::for_each_component(&mut cur, len, |c| {
            c.expect_tag(tag::TAG_INTEGER)?;
            values.push(decode::integer(c)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(values, vec![5]);
        assert!(cur.is_empty());
    }
}
