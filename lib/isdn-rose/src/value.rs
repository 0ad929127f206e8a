//! The ROSE `Code`/operation-value CHOICE: either a bare `INTEGER`
//! (`localValue`) or an `OBJECT IDENTIFIER` (`globalValue`). Every
//! invoke/result/error component identifies itself with one of these.

use isdn_asn1::{cursor::Cursor, decode, encode, oid::Oid, tag};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationValue {
    Local(i32),
    Global(Oid),
}

impl OperationValue {
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let wire_tag = cur.tag()?;
        Self::decode_with_tag(cur, wire_tag)
    }

    /// Decode given an already-consumed tag octet, for callers (like the
    /// invoke component, which must first check for an optional
    /// `[0] linkedId` before the operation-value) that peeked ahead.
    pub fn decode_with_tag(cur: &mut Cursor<'_>, wire_tag: u32) -> Result<Self, Error> {
        match wire_tag {
            t if t == tag::TAG_INTEGER => Ok(OperationValue::Local(decode::integer(cur)?)),
            t if t == tag::TAG_OBJECT_IDENTIFIER => {
                Ok(OperationValue::Global(decode::object_identifier(cur)?))
            }
            _ => Err(Error::BadOperationValue),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            OperationValue::Local(v) => {
                encode::integer(out, tag::TAG_INTEGER, *v);
                Ok(())
            }
            OperationValue::Global(oid) => {
                encode::object_identifier(out, tag::TAG_OBJECT_IDENTIFIER, oid)?;
                Ok(())
            }
        }
    }

    /// True if this is a `globalValue` whose prefix matches `prefix` and
    /// whose trailing sub-identifier is `last` -- the ETSI/QSIG convention
    /// of identifying an operation either by a bare localValue or by an
    /// organization OID prefix plus a final discriminator.
    pub fn matches_oid(&self, prefix: &Oid, last: u32) -> bool {
        match self {
            OperationValue::Global(oid) => oid.matches_prefix_and_last(prefix, last),
            OperationValue::Local(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isdn_asn1::oid;

    #[test]
    fn local_value_roundtrips() {
        let mut buf = Vec::new();
        OperationValue::Local(7).encode(&mut buf).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(OperationValue::decode(&mut cur).unwrap(), OperationValue::Local(7));
    }

    #[test]
    fn global_value_roundtrips_and_matches_prefix() {
        let prefix = oid!(0, 4, 0, 369, 1);
        let full = Oid::with_prefix_and_last(&prefix, 7).unwrap();
        let mut buf = Vec::new();
        OperationValue::Global(full.clone()).encode(&mut buf).unwrap();
        let mut cur = Cursor::new(&buf);
        let decoded = OperationValue::decode(&mut cur).unwrap();
        assert!(decoded.matches_oid(&prefix, 7));
    }
}
