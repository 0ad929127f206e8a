//! ETSI Message Waiting Indication (EN 300 745-1): MWIActivate,
//! MWIDeactivate, MWIIndicate.

use isdn_asn1::{cursor::Cursor, decode, encode, length::Length, tag};

use crate::party_number::PartyNumber;
use crate::Error;

pub const MAX_TIME_LEN: usize = 19; // "YYMMDDhhmmss.s[sZ]" GeneralizedTime, truncated like the original.
const TAG_GENERALIZED_TIME: u32 = (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x18) as u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId {
    pub reference_number: i32,
    pub status: i32,
}

fn encode_message_id(out: &mut Vec<u8>, id: &MessageId) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode::integer(body, tag::TAG_INTEGER, id.reference_number);
        encode::integer(body, (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32, id.status);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_message_id(cur: &mut Cursor<'_>) -> Result<MessageId, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut reference_number = 0;
    let mut status = 0;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        if field_tag == tag::TAG_INTEGER {
            reference_number = decode::integer(c)?;
        } else {
            status = decode::integer(c)?;
        }
        Ok(())
    })?;
    Ok(MessageId { reference_number, status })
}

fn explicit_tag(ctx: u32) -> u32 {
    tag::CLASS_CONTEXT as u32 | tag::PC_CONSTRUCTED as u32 | ctx
}

/// An EXPLICIT context-tagged optional field: `[n] T`, present only when
/// `Some`.
fn encode_explicit<T>(out: &mut Vec<u8>, ctx: u32, value: &Option<T>, write: impl FnOnce(&mut Vec<u8>, &T)) {
    if let Some(v) = value {
        encode::constructed(out, explicit_tag(ctx), |body| {
            write(body, v);
            Ok::<(), Error>(())
        })
        .expect("constructed body never fails");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MwiActivateArg {
    pub receiving_user_number: Option<PartyNumber>,
    pub basic_service: i32,
    pub controlling_user_number: Option<PartyNumber>,
    pub number_of_messages: Option<i32>,
    pub controlling_user_provided_number: Option<PartyNumber>,
    pub time: Option<Vec<u8>>,
    pub message_id: Option<MessageId>,
    pub mode: Option<i32>,
}

pub fn encode_mwi_activate_arg(out: &mut Vec<u8>, arg: &MwiActivateArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        if let Some(number) = &arg.receiving_user_number {
            number.encode(body);
        }
        encode::integer(body, (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32, arg.basic_service);
        encode_explicit(body, 1, &arg.controlling_user_number, |b, n| n.encode(b));
        encode_explicit(body, 2, &arg.number_of_messages, |b, v| {
            encode::integer(b, tag::TAG_INTEGER, *v)
        });
        encode_explicit(body, 3, &arg.controlling_user_provided_number, |b, n| n.encode(b));
        encode_explicit(body, 4, &arg.time, |b, t| {
            encode::string_max(b, TAG_GENERALIZED_TIME, t, MAX_TIME_LEN)
        });
        encode_explicit(body, 5, &arg.message_id, |b, id| encode_message_id(b, id));
        encode_explicit(body, 6, &arg.mode, |b, v| {
            encode::integer(b, (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32, *v)
        });
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_mwi_activate_arg(cur: &mut Cursor<'_>, len: Length) -> Result<MwiActivateArg, Error> {
    let mut arg = MwiActivateArg::default();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        match field_tag {
            t if t == explicit_tag(1) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                arg.controlling_user_number = Some(PartyNumber::decode(&mut inner)?);
            }
            t if t == explicit_tag(2) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                inner.expect_tag(tag::TAG_INTEGER)?;
                arg.number_of_messages = Some(decode::integer(&mut inner)?);
            }
            t if t == explicit_tag(3) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                arg.controlling_user_provided_number = Some(PartyNumber::decode(&mut inner)?);
            }
            t if t == explicit_tag(4) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                arg.time = Some(decode::string_max(&mut inner, TAG_GENERALIZED_TIME, MAX_TIME_LEN)?);
            }
            t if t == explicit_tag(5) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                arg.message_id = Some(decode_message_id(&mut inner)?);
            }
            t if t == explicit_tag(6) => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                inner.expect_tag(tag::TAG_INTEGER)?;
                arg.mode = Some(decode::integer(&mut inner)?);
            }
            t if t == (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32 => {
                arg.basic_service = decode::integer(c)?;
            }
            _ => {
                arg.receiving_user_number = Some(PartyNumber::decode_with_tag(c, field_tag)?);
            }
        }
        Ok(())
    })?;
    Ok(arg)
}

/// Enter an EXPLICIT context-tagged wrapper's body as a fresh cursor.
fn enter_definite<'a>(cur: &mut Cursor<'a>, len: Length) -> Result<Cursor<'a>, Error> {
    match cur.enter(len)? {
        isdn_asn1::cursor::Body::Definite(inner) => Ok(inner),
        isdn_asn1::cursor::Body::Indefinite => Err(Error::Asn1(isdn_asn1::Error::Truncated)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MwiDeactivateArg {
    pub receiving_user_number: PartyNumber,
    pub basic_service: i32,
    pub controlling_user_number: Option<PartyNumber>,
    pub mode: Option<i32>,
}

pub fn encode_mwi_deactivate_arg(out: &mut Vec<u8>, arg: &MwiDeactivateArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        arg.receiving_user_number.encode(body);
        encode::integer(body, (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32, arg.basic_service);
        if let Some(number) = &arg.controlling_user_number {
            number.encode(body);
        }
        if let Some(mode) = arg.mode {
            encode::integer(body, (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32, mode);
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

const TAG_ENUMERATED: u32 = (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | 0x0a) as u32;

/// Positional like the source's `rose_dec_etsi_MWIDeactivate_ARG`: the
/// first two components are always `receivingUserNr` then `basicService`,
/// the rest an order-independent tail disambiguated by tag (ENUMERATED is
/// `mode`, anything else is `controllingUserNr`).
pub fn decode_mwi_deactivate_arg(cur: &mut Cursor<'_>) -> Result<MwiDeactivateArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut arg = MwiDeactivateArg::default();
    let mut seen_receiving = false;
    let mut seen_basic_service = false;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        if field_tag == TAG_ENUMERATED {
            let value = decode::integer(c)?;
            if !seen_basic_service {
                arg.basic_service = value;
                seen_basic_service = true;
            } else {
                arg.mode = Some(value);
            }
        } else {
            let number = PartyNumber::decode_with_tag(c, field_tag)?;
            if !seen_receiving {
                arg.receiving_user_number = number;
                seen_receiving = true;
            } else {
                arg.controlling_user_number = Some(number);
            }
        }
        Ok(())
    })?;
    Ok(arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mwi_activate_roundtrips_with_optional_fields_present() {
        let arg = MwiActivateArg {
            receiving_user_number: Some(PartyNumber::Public(b"1234".to_vec())),
            basic_service: 2,
            controlling_user_number: None,
            number_of_messages: Some(3),
            controlling_user_provided_number: None,
            time: None,
            message_id: Some(MessageId { reference_number: 9, status: 0 }),
            mode: None,
        };
        let mut buf = Vec::new();
        encode_mwi_activate_arg(&mut buf, &arg);

        let mut cur = Cursor::new(&buf);
        cur.expect_tag(tag::TAG_SEQUENCE).unwrap();
        let len = cur.length().unwrap();
        let decoded = decode_mwi_activate_arg(&mut cur, len).unwrap();
        assert_eq!(decoded, arg);
    }

    #[test]
    fn mwi_deactivate_minimal_roundtrips() {
        let arg = MwiDeactivateArg {
            receiving_user_number: PartyNumber::Public(b"1234".to_vec()),
            basic_service: 1,
            controlling_user_number: None,
            mode: None,
        };
        let mut buf = Vec::new();
        encode_mwi_deactivate_arg(&mut buf, &arg);
        assert!(!buf.is_empty());

        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_mwi_deactivate_arg(&mut cur).unwrap(), arg);
    }

    #[test]
    fn mwi_deactivate_roundtrips_with_controlling_number_and_mode() {
        let arg = MwiDeactivateArg {
            receiving_user_number: PartyNumber::Public(b"1234".to_vec()),
            basic_service: 1,
            controlling_user_number: Some(PartyNumber::National(b"5678".to_vec())),
            mode: Some(2),
        };
        let mut buf = Vec::new();
        encode_mwi_deactivate_arg(&mut buf, &arg);

        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_mwi_deactivate_arg(&mut cur).unwrap(), arg);
    }
}
