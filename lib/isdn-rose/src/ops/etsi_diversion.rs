//! ETSI Call Diversion (EN 300 207-1): `ActivationDiversion` and
//! `DeactivationDiversion`. The richer diversion operations
//! (`InterrogationDiversion`, `DiversionInformation`,
//! `DivertingLegInformation1/2/3`) carry a `Q931ie` subaddress payload
//! whose field layout lived in `rose_internal.h` and isn't recoverable
//! from the encode/decode bodies alone, so only the activate/deactivate
//! pair -- whose `Address` is just a `PartyNumber` in a one-field
//! SEQUENCE -- is implemented here.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::party_number::PartyNumber;
use crate::Error;

const TAG_ENUMERATED: u32 = (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | tag::TYPE_ENUMERATED) as u32;

/// `Address ::= SEQUENCE { PartyNumber number }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub number: PartyNumber,
}

fn encode_address(out: &mut Vec<u8>, address: &Address) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        address.number.encode(body);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_address(cur: &mut Cursor<'_>) -> Result<Address, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut number = PartyNumber::default();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        number = PartyNumber::decode_with_tag(c, field_tag)?;
        Ok(())
    })?;
    Ok(Address { number })
}

/// `ServedUserNumber ::= SET SIZE(1..) OF PartyNumber`.
pub type ServedUserNumberList = Vec<PartyNumber>;

fn encode_served_user_numbers(out: &mut Vec<u8>, numbers: &ServedUserNumberList) {
    encode::constructed(out, tag::TAG_SET, |body| {
        for number in numbers {
            number.encode(body);
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_served_user_numbers(cur: &mut Cursor<'_>) -> Result<ServedUserNumberList, Error> {
    cur.expect_tag(tag::TAG_SET)?;
    let len = cur.length()?;
    let mut numbers = Vec::new();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        numbers.push(PartyNumber::decode(c)?);
        Ok(())
    })?;
    Ok(numbers)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationDiversionArg {
    pub procedure: i32,
    pub basic_service: i32,
    pub forwarded_to: Address,
    pub served_user_number: Option<ServedUserNumberList>,
}

pub fn encode_activation_diversion_arg(out: &mut Vec<u8>, arg: &ActivationDiversionArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode::integer(body, TAG_ENUMERATED, arg.procedure);
        encode::integer(body, TAG_ENUMERATED, arg.basic_service);
        encode_address(body, &arg.forwarded_to);
        if let Some(numbers) = &arg.served_user_number {
            encode_served_user_numbers(body, numbers);
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_activation_diversion_arg(cur: &mut Cursor<'_>) -> Result<ActivationDiversionArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut procedure = 0;
    let mut basic_service = 0;
    let mut forwarded_to = None;
    let mut served_user_number = None;
    let mut seen_enums = 0;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        match field_tag {
            t if t == TAG_ENUMERATED => {
                let value = decode::integer(c)?;
                if seen_enums == 0 {
                    procedure = value;
                } else {
                    basic_service = value;
                }
                seen_enums += 1;
            }
            t if t == tag::TAG_SEQUENCE => forwarded_to = Some(decode_address(c)?),
            t if t == tag::TAG_SET => served_user_number = Some(decode_served_user_numbers(c)?),
            other => return Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(other))),
        }
        Ok(())
    })?;
    Ok(ActivationDiversionArg {
        procedure,
        basic_service,
        forwarded_to: forwarded_to.ok_or(Error::MalformedArguments)?,
        served_user_number,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivationDiversionArg {
    pub procedure: i32,
    pub basic_service: i32,
    pub served_user_number: Option<ServedUserNumberList>,
}

pub fn encode_deactivation_diversion_arg(out: &mut Vec<u8>, arg: &DeactivationDiversionArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode::integer(body, TAG_ENUMERATED, arg.procedure);
        encode::integer(body, TAG_ENUMERATED, arg.basic_service);
        if let Some(numbers) = &arg.served_user_number {
            encode_served_user_numbers(body, numbers);
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_deactivation_diversion_arg(cur: &mut Cursor<'_>) -> Result<DeactivationDiversionArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut procedure = 0;
    let mut basic_service = 0;
    let mut served_user_number = None;
    let mut seen_enums = 0;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        if field_tag == TAG_ENUMERATED {
            let value = decode::integer(c)?;
            if seen_enums == 0 {
                procedure = value;
            } else {
                basic_service = value;
            }
            seen_enums += 1;
        } else {
            served_user_number = Some(decode_served_user_numbers(c)?);
        }
        Ok(())
    })?;
    Ok(DeactivationDiversionArg { procedure, basic_service, served_user_number })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_diversion_roundtrips_without_served_user_number() {
        let arg = ActivationDiversionArg {
            procedure: 0,
            basic_service: 1,
            forwarded_to: Address { number: PartyNumber::Public(b"5559999".to_vec()) },
            served_user_number: None,
        };
        let mut buf = Vec::new();
        encode_activation_diversion_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_activation_diversion_arg(&mut cur).unwrap(), arg);
    }

    #[test]
    fn deactivation_diversion_roundtrips_with_served_user_number() {
        let arg = DeactivationDiversionArg {
            procedure: 0,
            basic_service: 1,
            served_user_number: Some(vec![PartyNumber::Public(b"5550000".to_vec())]),
        };
        let mut buf = Vec::new();
        encode_deactivation_diversion_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_deactivation_diversion_arg(&mut cur).unwrap(), arg);
    }
}
