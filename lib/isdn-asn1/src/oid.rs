//! ASN.1 OBJECT IDENTIFIER values: up to 10 sub-identifiers, the first two
//! compressed per X.690 (`first*40 + second`).

use arrayvec::ArrayVec;

use crate::Error;

pub const MAX_SUBIDENTIFIERS: usize = 10;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Oid {
    values: ArrayVec<u32, MAX_SUBIDENTIFIERS>,
}

impl Oid {
    pub fn from_values(values: &[u32]) -> Result<Self, Error> {
        let mut out = ArrayVec::new();
        for &v in values {
            out.try_push(v).map_err(|_| Error::OidTooLong)?;
        }
        Ok(Oid { values: out })
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// True if `self`'s values are exactly `prefix` followed by one more
    /// trailing sub-identifier equal to `last`. Used by the ROSE dispatcher
    /// to match a decoded OID against a per-operation OID prefix plus a
    /// trailing localValue-like discriminator.
    pub fn matches_prefix_and_last(&self, prefix: &Oid, last: u32) -> bool {
        let p = prefix.values();
        let v = self.values();
        v.len() == p.len() + 1 && &v[..p.len()] == p && v[p.len()] == last
    }

    pub fn with_prefix_and_last(prefix: &Oid, last: u32) -> Result<Self, Error> {
        let mut values: ArrayVec<u32, MAX_SUBIDENTIFIERS> = prefix.values.clone();
        values.try_push(last).map_err(|_| Error::OidTooLong)?;
        Ok(Oid { values })
    }
}

/// Decode the compressed first/second sub-identifier pair back into two
/// plain values (`first = compressed / 40`, `second = compressed % 40`)
/// using the X.690-mandated convention that `first` is 0, 1, or 2.
fn split_first_two(compressed: u32) -> (u32, u32) {
    if compressed < 80 {
        (compressed / 40, compressed % 40)
    } else {
        (2, compressed - 80)
    }
}

fn join_first_two(first: u32, second: u32) -> u32 {
    first * 40 + second
}

pub fn decode(mut input: &[u8]) -> Result<Oid, Error> {
    let mut raw: ArrayVec<u32, MAX_SUBIDENTIFIERS> = ArrayVec::new();
    while !input.is_empty() {
        let mut value: u32 = 0;
        loop {
            let (&byte, rest) = input.split_first().ok_or(Error::Truncated)?;
            value = value
                .checked_shl(7)
                .and_then(|v| v.checked_add((byte & 0x7f) as u32))
                .ok_or(Error::OidSubidentifierOverflow)?;
            input = rest;
            if byte & 0x80 == 0 {
                break;
            }
        }
        raw.try_push(value).map_err(|_| Error::OidTooLong)?;
    }
    if raw.is_empty() {
        return Ok(Oid::default());
    }
    let (first, second) = split_first_two(raw[0]);
    let mut values: ArrayVec<u32, MAX_SUBIDENTIFIERS> = ArrayVec::new();
    values.try_push(first).map_err(|_| Error::OidTooLong)?;
    values.try_push(second).map_err(|_| Error::OidTooLong)?;
    for &v in &raw[1..] {
        values.try_push(v).map_err(|_| Error::OidTooLong)?;
    }
    Ok(Oid { values })
}

pub fn encode(out: &mut Vec<u8>, oid: &Oid) -> Result<(), Error> {
    if oid.values.len() < 2 {
        // Nothing meaningful to encode; an empty OID encodes to zero octets.
        return Ok(());
    }
    let compressed = join_first_two(oid.values[0], oid.values[1]);
    encode_subidentifier(out, compressed);
    for &v in &oid.values[2..] {
        encode_subidentifier(out, v);
    }
    Ok(())
}

fn encode_subidentifier(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        buf[n] = (v & 0x7f) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let mut byte = buf[i];
        if i != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

#[macro_export]
macro_rules! oid {
    ($($v:expr),+ $(,)?) => {
        $crate::oid::Oid::from_values(&[$($v),+]).expect("static OID literal")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_etsi_ect_prefix() {
        // {ccitt(0) identified-organization(4) etsi(0) 369 operations-and-errors(1)}
        let oid = oid!(0, 4, 0, 369, 1);
        let mut buf = Vec::new();
        encode(&mut buf, &oid).unwrap();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded, oid);
    }

    #[test]
    fn too_many_subidentifiers_rejected() {
        let values: Vec<u32> = (0..11).collect();
        assert_eq!(Oid::from_values(&values), Err(Error::OidTooLong));
    }

    #[test]
    fn prefix_and_last_match() {
        let prefix = oid!(0, 4, 0, 369, 1);
        let full = Oid::with_prefix_and_last(&prefix, 7).unwrap();
        assert!(full.matches_prefix_and_last(&prefix, 7));
        assert!(!full.matches_prefix_and_last(&prefix, 8));
    }
}
