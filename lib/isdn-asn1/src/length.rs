//! BER length octet encode/decode: short form, long form, and indefinite.

use crate::Error;

/// A decoded length: either a definite byte count or the indefinite form
/// (`0x80`, terminated later by `00 00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

/// Decode a length field. Returns `(length, rest)`.
///
/// - Short form: a single octet `< 128`, the length itself.
/// - Long form: top bit set, low 7 bits count the following length octets
///   (MSB-first); `0x7f` (127 following octets) is reserved and rejected.
/// - Indefinite form: exactly `0x80`.
pub fn decode(input: &[u8]) -> Result<(Length, &[u8]), Error> {
    let (&first, rest) = input.split_first().ok_or(Error::Truncated)?;
    if first & 0x80 == 0 {
        return Ok((Length::Definite(first as usize), rest));
    }
    let count = first & 0x7f;
    if count == 0 {
        return Ok((Length::Indefinite, rest));
    }
    if count == 0x7f {
        return Err(Error::ReservedLength);
    }
    if rest.len() < count as usize {
        return Err(Error::Truncated);
    }
    let (len_bytes, rest) = rest.split_at(count as usize);
    let mut value: usize = 0;
    for &b in len_bytes {
        value = value
            .checked_shl(8)
            .and_then(|v| v.checked_add(b as usize))
            .ok_or(Error::LengthOverflow)?;
    }
    Ok((Length::Definite(value), rest))
}

/// Confirm that a decoded definite length doesn't claim more octets than
/// remain in `remaining`.
pub fn check_available(length: Length, remaining: usize) -> Result<(), Error> {
    match length {
        Length::Definite(n) if n <= remaining => Ok(()),
        Length::Definite(_) => Err(Error::Truncated),
        Length::Indefinite => Ok(()),
    }
}

/// How many octets the final length field will take; used as a hint when
/// reserving space for a constructed value whose body hasn't been encoded
/// yet.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FormHint {
    /// Body will be under 128 octets: one length octet.
    Short,
    /// Body will be under 256 octets: `0x81` + 1 octet.
    LongU8,
    /// Body will be under 65536 octets: `0x82` + 2 octets.
    LongU16,
}

impl FormHint {
    pub fn width(self) -> usize {
        match self {
            FormHint::Short => 1,
            FormHint::LongU8 => 2,
            FormHint::LongU16 => 3,
        }
    }
}

/// Shortest-form length encoding for a known body length.
pub fn encode(out: &mut Vec<u8>, len: usize) {
    if len < 128 {
        out.push(len as u8);
    } else if len < 256 {
        out.push(0x81);
        out.push(len as u8);
    } else if len < 65536 {
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else {
        out.push(0x83);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
}

pub fn encoded_width(len: usize) -> usize {
    if len < 128 {
        1
    } else if len < 256 {
        2
    } else if len < 65536 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_roundtrip() {
        let mut buf = Vec::new();
        encode(&mut buf, 3);
        assert_eq!(buf, vec![0x03]);
        let (len, rest) = decode(&buf).unwrap();
        assert_eq!(len, Length::Definite(3));
        assert!(rest.is_empty());
    }

    #[test]
    fn long_form_u8() {
        let mut buf = Vec::new();
        encode(&mut buf, 200);
        assert_eq!(buf, vec![0x81, 200]);
    }

    #[test]
    fn reserved_127_is_rejected() {
        let bytes = [0xff];
        assert_eq!(decode(&bytes), Err(Error::ReservedLength));
    }

    #[test]
    fn indefinite_is_just_0x80() {
        let bytes = [0x80, 0xaa];
        let (len, rest) = decode(&bytes).unwrap();
        assert_eq!(len, Length::Indefinite);
        assert_eq!(rest, &[0xaa]);
    }

    proptest::proptest! {
        #[test]
        fn encode_decode_idempotent_and_shortest(len in 0usize..(1usize << 24)) {
            let mut buf = Vec::new();
            encode(&mut buf, len);
            let (decoded, rest) = decode(&buf).unwrap();
            proptest::prop_assert_eq!(decoded, Length::Definite(len));
            proptest::prop_assert!(rest.is_empty());
            proptest::prop_assert_eq!(buf.len(), encoded_width(len));
        }
    }
}
