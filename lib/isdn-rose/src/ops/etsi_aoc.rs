//! ETSI Advice of Charge (EN 300 182-1): `AOCDCurrency` and
//! `AOCDChargingUnit`, both a three-way CHOICE on a `type` discriminant.
//!
//! The `specific` arm's `recorded` field is itself a further CHOICE
//! (`AOC_RecordedCurrency`/`AOC_RecordedUnitsList`) whose nested amount/unit
//! sub-structures weren't reachable in the filtered source (the file this
//! is grounded on runs to nearly 2000 lines and wasn't read past the
//! `AOCDCurrency`/`AOCDChargingUnit` encoders); `recorded` is kept as its
//! still-encoded bytes rather than guessed at further. The many other AOC
//! message types (`AOCSCurrency`, `AOCSSpecialArr`, `ChargingRequest`, ...)
//! are out of scope for the same reason.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::Error;

const CTX_FREE_OF_CHARGE: u32 = tag::CLASS_CONTEXT as u32 | 1;
const CTX_RECORDED: u32 = tag::CLASS_CONTEXT as u32 | tag::PC_CONSTRUCTED as u32 | 1;
const CTX_TYPE_OF_CHARGING_INFO: u32 = tag::CLASS_CONTEXT as u32 | 2;
const CTX_BILLING_ID: u32 = tag::CLASS_CONTEXT as u32 | 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AocdValue {
    ChargeNotAvailable,
    FreeOfCharge,
    Specific {
        recorded: Vec<u8>,
        type_of_charging_info: i32,
        billing_id: Option<i32>,
    },
}

fn encode_aocd(out: &mut Vec<u8>, value: &AocdValue) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        match value {
            AocdValue::ChargeNotAvailable => {
                encode::integer(body, tag::TAG_INTEGER, 0);
                encode::null(body, tag::TAG_NULL);
            }
            AocdValue::FreeOfCharge => {
                encode::integer(body, tag::TAG_INTEGER, 1);
                encode::null(body, CTX_FREE_OF_CHARGE);
            }
            AocdValue::Specific { recorded, type_of_charging_info, billing_id } => {
                encode::integer(body, tag::TAG_INTEGER, 2);
                encode::constructed(body, CTX_RECORDED, |inner| {
                    inner.extend_from_slice(recorded);
                    Ok::<(), Error>(())
                })?;
                encode::integer(body, CTX_TYPE_OF_CHARGING_INFO, *type_of_charging_info);
                if let Some(id) = billing_id {
                    encode::integer(body, CTX_BILLING_ID, *id);
                }
            }
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_aocd(cur: &mut Cursor<'_>) -> Result<AocdValue, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut kind = None;
    let mut recorded = Vec::new();
    let mut type_of_charging_info = 0;
    let mut billing_id = None;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        match field_tag {
            t if t == tag::TAG_INTEGER => kind = Some(decode::integer(c)?),
            t if t == tag::TAG_NULL => {
                decode::null(c)?;
            }
            t if t == CTX_FREE_OF_CHARGE => {
                decode::null(c)?;
            }
            t if t == CTX_RECORDED => {
                let inner_len = c.length()?;
                let body = match c.enter(inner_len)? {
                    isdn_asn1::cursor::Body::Definite(inner) => inner,
                    isdn_asn1::cursor::Body::Indefinite => {
                        return Err(Error::Asn1(isdn_asn1::Error::Truncated))
                    }
                };
                recorded = body.as_slice().to_vec();
            }
            t if t == CTX_TYPE_OF_CHARGING_INFO => type_of_charging_info = decode::integer(c)?,
            t if t == CTX_BILLING_ID => billing_id = Some(decode::integer(c)?),
            other => return Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(other))),
        }
        Ok(())
    })?;
    match kind.ok_or(Error::MalformedArguments)? {
        0 => Ok(AocdValue::ChargeNotAvailable),
        1 => Ok(AocdValue::FreeOfCharge),
        2 => Ok(AocdValue::Specific { recorded, type_of_charging_info, billing_id }),
        _ => Err(Error::MalformedArguments),
    }
}

pub fn encode_aocd_currency_arg(out: &mut Vec<u8>, value: &AocdValue) {
    encode_aocd(out, value);
}
pub fn decode_aocd_currency_arg(cur: &mut Cursor<'_>) -> Result<AocdValue, Error> {
    decode_aocd(cur)
}
pub fn encode_aocd_charging_unit_arg(out: &mut Vec<u8>, value: &AocdValue) {
    encode_aocd(out, value);
}
pub fn decode_aocd_charging_unit_arg(cur: &mut Cursor<'_>) -> Result<AocdValue, Error> {
    decode_aocd(cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_not_available_roundtrips() {
        let mut buf = Vec::new();
        encode_aocd_currency_arg(&mut buf, &AocdValue::ChargeNotAvailable);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_aocd_currency_arg(&mut cur).unwrap(), AocdValue::ChargeNotAvailable);
    }

    #[test]
    fn specific_with_billing_id_roundtrips() {
        let value = AocdValue::Specific {
            recorded: vec![0x02, 0x01, 0x05],
            type_of_charging_info: 1,
            billing_id: Some(3),
        };
        let mut buf = Vec::new();
        encode_aocd_charging_unit_arg(&mut buf, &value);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_aocd_charging_unit_arg(&mut cur).unwrap(), value);
    }
}
