//! `PartyNumber`: the CHOICE of number forms ROSE arguments across the
//! ETSI and QSIG operation families use to carry a dialable number. Each
//! variant is an implicit context-tagged `NumberDigits` (an IA5/numeric
//! string of decimal digits), the tag selecting the numbering plan.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::Error;

pub const MAX_DIGITS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyNumber {
    Unknown(Vec<u8>),
    Public(Vec<u8>),
    Nsap(Vec<u8>),
    National(Vec<u8>),
    Private(Vec<u8>),
}

impl Default for PartyNumber {
    fn default() -> Self {
        PartyNumber::Unknown(Vec::new())
    }
}

impl PartyNumber {
    fn context_tag(&self) -> u32 {
        let ctx = match self {
            PartyNumber::Unknown(_) => 0,
            PartyNumber::Public(_) => 1,
            PartyNumber::Nsap(_) => 2,
            PartyNumber::National(_) => 8,
            PartyNumber::Private(_) => 9,
        };
        tag::CLASS_CONTEXT as u32 | ctx
    }

    fn digits(&self) -> &[u8] {
        match self {
            PartyNumber::Unknown(d)
            | PartyNumber::Public(d)
            | PartyNumber::Nsap(d)
            | PartyNumber::National(d)
            | PartyNumber::Private(d) => d,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        encode::string_max(out, self.context_tag(), self.digits(), MAX_DIGITS);
    }

    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let wire_tag = cur.tag()?;
        Self::decode_with_tag(cur, wire_tag)
    }

    /// Decode given an already-consumed tag octet, for callers that must
    /// peek ahead to tell a `PartyNumber` apart from a sibling field.
    pub fn decode_with_tag(cur: &mut Cursor<'_>, wire_tag: u32) -> Result<Self, Error> {
        let ctx = wire_tag & !(tag::CLASS_MASK as u32 | tag::PC_MASK as u32);
        let digits = decode::string_max(cur, wire_tag, MAX_DIGITS)?;
        match ctx {
            0 => Ok(PartyNumber::Unknown(digits)),
            1 => Ok(PartyNumber::Public(digits)),
            2 => Ok(PartyNumber::Nsap(digits)),
            8 => Ok(PartyNumber::National(digits)),
            9 => Ok(PartyNumber::Private(digits)),
            _ => Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(wire_tag))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn public_number_roundtrips() {
        let num = PartyNumber::Public(b"5551234".to_vec());
        let mut buf = Vec::new();
        num.encode(&mut buf);
        let mut cur = Cursor::new(&buf);
        assert_eq!(PartyNumber::decode(&mut cur).unwrap(), num);
    }

    fn arb_party_number() -> impl Strategy<Value = PartyNumber> {
        (0..5u8, proptest::collection::vec(any::<u8>(), 0..=MAX_DIGITS)).prop_map(|(kind, digits)| {
            match kind {
                0 => PartyNumber::Unknown(digits),
                1 => PartyNumber::Public(digits),
                2 => PartyNumber::Nsap(digits),
                3 => PartyNumber::National(digits),
                _ => PartyNumber::Private(digits),
            }
        })
    }

    proptest! {
        #[test]
        fn any_party_number_roundtrips(num in arb_party_number()) {
            let mut buf = Vec::new();
            num.encode(&mut buf);
            let mut cur = Cursor::new(&buf);
            prop_assert_eq!(PartyNumber::decode(&mut cur).unwrap(), num);
            prop_assert!(cur.is_empty());
        }
    }
}
