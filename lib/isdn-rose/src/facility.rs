//! The Facility information element's header octets, which precede a
//! ROSE [`Component`][crate::component::Component]: a protocol profile
//! octet (with an extension bit selecting whether header extension
//! octets follow) plus the optional NetworkFacilityExtension/NPP/
//! interpretation fields that make up that header.
//!
//! The protocol-profile numeric values themselves (`Q932_PROTOCOL_*`,
//! `ROSE_DMS100_RLT_SERVICE_ID`) are `#define`s that live outside the
//! filtered source pack this crate is grounded on (they aren't in any of
//! the present `.h` files); the constants below reproduce the bit
//! layout -- extension bit, profile field, DMS100's distinct
//! service-id-instead-of-header branch -- but their numeric codes are
//! this crate's own choice rather than a verified wire value.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::party_number::PartyNumber;
use crate::switch_type::SwitchType;
use crate::Error;

const PROFILE_EXT_BIT: u8 = 0x80;
const PROFILE_MASK: u8 = 0x1f;
const PROTOCOL_ROSE: u8 = 0x11;
const PROTOCOL_EXTENSIONS: u8 = 0x12;
const DMS100_RLT_SERVICE_ID: u8 = 0x01;

const CTX_NFE: u32 = tag::CLASS_CONTEXT as u32 | tag::PC_CONSTRUCTED as u32 | 10;
const CTX_NPP: u32 = tag::CLASS_CONTEXT as u32 | 18;
const CTX_INTERPRETATION: u32 = tag::CLASS_CONTEXT as u32 | 11;

const CTX_NFE_SOURCE_ENTITY: u32 = tag::CLASS_CONTEXT as u32 | 0;
const CTX_NFE_SOURCE_NUMBER: u32 = tag::CLASS_CONTEXT as u32 | tag::PC_CONSTRUCTED as u32 | 1;
const CTX_NFE_DEST_ENTITY: u32 = tag::CLASS_CONTEXT as u32 | 2;
const CTX_NFE_DEST_NUMBER: u32 = tag::CLASS_CONTEXT as u32 | tag::PC_CONSTRUCTED as u32 | 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkFacilityExtension {
    pub source_entity: i32,
    pub source_number: Option<PartyNumber>,
    pub destination_entity: i32,
    pub destination_number: Option<PartyNumber>,
}

fn encode_nfe(out: &mut Vec<u8>, nfe: &NetworkFacilityExtension) {
    encode::constructed(out, CTX_NFE, |body| {
        encode::integer(body, CTX_NFE_SOURCE_ENTITY, nfe.source_entity);
        if let Some(number) = &nfe.source_number {
            encode::constructed(body, CTX_NFE_SOURCE_NUMBER, |inner| {
                number.encode(inner);
                Ok::<(), Error>(())
            })?;
        }
        encode::integer(body, CTX_NFE_DEST_ENTITY, nfe.destination_entity);
        if let Some(number) = &nfe.destination_number {
            encode::constructed(body, CTX_NFE_DEST_NUMBER, |inner| {
                number.encode(inner);
                Ok::<(), Error>(())
            })?;
        }
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_nfe(cur: &mut Cursor<'_>) -> Result<NetworkFacilityExtension, Error> {
    cur.expect_tag(CTX_NFE)?;
    let len = cur.length()?;
    let mut nfe = NetworkFacilityExtension::default();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        match field_tag {
            t if t == CTX_NFE_SOURCE_ENTITY => nfe.source_entity = decode::integer(c)?,
            t if t == CTX_NFE_SOURCE_NUMBER => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                nfe.source_number = Some(PartyNumber::decode(&mut inner)?);
            }
            t if t == CTX_NFE_DEST_ENTITY => nfe.destination_entity = decode::integer(c)?,
            t if t == CTX_NFE_DEST_NUMBER => {
                let inner_len = c.length()?;
                let mut inner = enter_definite(c, inner_len)?;
                nfe.destination_number = Some(PartyNumber::decode(&mut inner)?);
            }
            other => return Err(Error::Asn1(isdn_asn1::Error::UnexpectedTag(other))),
        }
        Ok(())
    })?;
    Ok(nfe)
}

fn enter_definite<'a>(cur: &mut Cursor<'a>, len: isdn_asn1::Length) -> Result<Cursor<'a>, Error> {
    match cur.enter(len)? {
        isdn_asn1::cursor::Body::Definite(inner) => Ok(inner),
        isdn_asn1::cursor::Body::Indefinite => Err(Error::Asn1(isdn_asn1::Error::Truncated)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionHeader {
    pub nfe: Option<NetworkFacilityExtension>,
    pub npp: Option<i32>,
    pub interpretation: Option<i32>,
}

fn encode_extension_header(out: &mut Vec<u8>, header: &ExtensionHeader) {
    if let Some(nfe) = &header.nfe {
        encode_nfe(out, nfe);
    }
    if let Some(npp) = header.npp {
        encode::integer(out, CTX_NPP, npp);
    }
    if let Some(interpretation) = header.interpretation {
        encode::integer(out, CTX_INTERPRETATION, interpretation);
    }
}

fn decode_extension_header(cur: &mut Cursor<'_>) -> Result<ExtensionHeader, Error> {
    let mut header = ExtensionHeader::default();
    while !cur.is_empty() {
        match cur.peek_tag()? {
            CTX_NFE => header.nfe = Some(decode_nfe(cur)?),
            CTX_NPP => {
                cur.expect_tag(CTX_NPP)?;
                header.npp = Some(decode::integer(cur)?);
            }
            CTX_INTERPRETATION => {
                cur.expect_tag(CTX_INTERPRETATION)?;
                header.interpretation = Some(decode::integer(cur)?);
            }
            _ => break,
        }
    }
    Ok(header)
}

/// A fully-framed Facility information element: the protocol profile
/// octet(s), an optional extension header, and the ROSE component body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facility {
    /// Plain ROSE, no extension header (ETSI, and ATT4ESS/Lucent5E/NI2
    /// when no header fields are present).
    Rose(crate::component::Component),
    /// ROSE preceded by an extension header (QSIG always; NI2/ATT4ESS/
    /// Lucent5E when header fields are present).
    Extensions(ExtensionHeader, crate::component::Component),
    /// DMS100's Remote Line Transfer service, identified by a service id
    /// byte instead of an extension header.
    Dms100Rlt(crate::component::Component),
}

pub fn encode(out: &mut Vec<u8>, switch_type: SwitchType, facility: &Facility) -> Result<(), Error> {
    match (switch_type, facility) {
        (SwitchType::EuroIsdnE1 | SwitchType::EuroIsdnT1, Facility::Rose(component)) => {
            out.push(PROFILE_EXT_BIT | PROTOCOL_ROSE);
            component.encode(out)
        }
        (SwitchType::Qsig, Facility::Extensions(header, component)) => {
            out.push(PROFILE_EXT_BIT | PROTOCOL_EXTENSIONS);
            encode_extension_header(out, header);
            component.encode(out)
        }
        (SwitchType::Dms100, Facility::Dms100Rlt(component)) => {
            out.push(PROTOCOL_ROSE);
            out.push(PROFILE_EXT_BIT | DMS100_RLT_SERVICE_ID);
            component.encode(out)
        }
        (SwitchType::Ni2 | SwitchType::Att4ess | SwitchType::Lucent5e, Facility::Rose(component)) => {
            out.push(PROFILE_EXT_BIT | PROTOCOL_ROSE);
            component.encode(out)
        }
        (SwitchType::Ni2 | SwitchType::Att4ess | SwitchType::Lucent5e, Facility::Extensions(header, component)) => {
            out.push(PROFILE_EXT_BIT | PROTOCOL_EXTENSIONS);
            encode_extension_header(out, header);
            component.encode(out)
        }
        _ => Err(Error::MalformedArguments),
    }
}

pub fn decode(cur: &mut Cursor<'_>, switch_type: SwitchType) -> Result<Facility, Error> {
    let first = cur.byte().map_err(Error::from)?;
    if switch_type == SwitchType::Dms100 {
        let service_id = cur.byte().map_err(Error::from)?;
        if service_id & !PROFILE_EXT_BIT != DMS100_RLT_SERVICE_ID {
            return Err(Error::MalformedArguments);
        }
        let component = crate::component::Component::decode(cur)?;
        return Ok(Facility::Dms100Rlt(component));
    }
    match first & PROFILE_MASK {
        PROTOCOL_ROSE => Ok(Facility::Rose(crate::component::Component::decode(cur)?)),
        PROTOCOL_EXTENSIONS => {
            let header = decode_extension_header(cur)?;
            let component = crate::component::Component::decode(cur)?;
            Ok(Facility::Extensions(header, component))
        }
        _ => Err(Error::MalformedArguments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Invoke};
    use crate::value::OperationValue;

    fn sample_invoke() -> Component {
        Component::Invoke(Invoke {
            invoke_id: 1,
            linked_id: None,
            operation: OperationValue::Local(0),
            args: Vec::new(),
        })
    }

    #[test]
    fn etsi_rose_roundtrips_without_header() {
        let facility = Facility::Rose(sample_invoke());
        let mut buf = Vec::new();
        encode(&mut buf, SwitchType::EuroIsdnE1, &facility).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode(&mut cur, SwitchType::EuroIsdnE1).unwrap(), facility);
    }

    #[test]
    fn qsig_extensions_roundtrip_with_nfe_and_npp() {
        let header = ExtensionHeader {
            nfe: Some(NetworkFacilityExtension {
                source_entity: 0,
                source_number: Some(PartyNumber::Public(b"1000".to_vec())),
                destination_entity: 1,
                destination_number: None,
            }),
            npp: Some(4),
            interpretation: None,
        };
        let facility = Facility::Extensions(header, sample_invoke());
        let mut buf = Vec::new();
        encode(&mut buf, SwitchType::Qsig, &facility).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode(&mut cur, SwitchType::Qsig).unwrap(), facility);
    }

    #[test]
    fn dms100_rlt_roundtrips_via_service_id_byte() {
        let facility = Facility::Dms100Rlt(sample_invoke());
        let mut buf = Vec::new();
        encode(&mut buf, SwitchType::Dms100, &facility).unwrap();
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode(&mut cur, SwitchType::Dms100).unwrap(), facility);
    }
}
