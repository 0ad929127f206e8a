//! Q.SIG Call Transfer (ECMA-178): the three operations whose argument
//! shape is fully recoverable from the encode/decode bodies alone --
//! `CallTransferIdentify`, `CallTransferInitiate`, `CallTransferSetup`.
//!
//! `CallTransferActive`/`CallTransferComplete`/`CallTransferUpdate` also
//! exist in this operation family but build on `PresentedNumberScreened`,
//! `PresentedAddressScreened` and raw `Q931ie` sub-structures whose field
//! layout lived in `rose_internal.h` -- not available here -- so they are
//! left unimplemented rather than guessed at.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::party_number::PartyNumber;
use crate::Error;

const TAG_NUMERIC_STRING: u32 = (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | tag::TYPE_NUMERIC_STRING) as u32;
pub const MAX_CALL_ID_LEN: usize = 4;

fn encode_call_id(out: &mut Vec<u8>, call_id: &[u8]) {
    encode::string_bin(out, TAG_NUMERIC_STRING, call_id);
}

fn decode_call_id(cur: &mut Cursor<'_>) -> Result<Vec<u8>, Error> {
    cur.expect_tag(TAG_NUMERIC_STRING)?;
    decode::string_bin(cur, TAG_NUMERIC_STRING, MAX_CALL_ID_LEN)
}

/// Shared shape of `CallTransferIdentify_RES` and `CallTransferInitiate_ARG`:
/// `SEQUENCE { NumericString call_id, PartyNumber rerouting_number }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTransferRerouting {
    pub call_id: Vec<u8>,
    pub rerouting_number: PartyNumber,
}

fn encode_rerouting(out: &mut Vec<u8>, arg: &CallTransferRerouting) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode_call_id(body, &arg.call_id);
        arg.rerouting_number.encode(body);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

fn decode_rerouting(cur: &mut Cursor<'_>) -> Result<CallTransferRerouting, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut call_id = Vec::new();
    let mut rerouting_number = PartyNumber::default();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        if field_tag == TAG_NUMERIC_STRING {
            call_id = decode::string_bin(c, field_tag, MAX_CALL_ID_LEN)?;
        } else {
            rerouting_number = PartyNumber::decode_with_tag(c, field_tag)?;
        }
        Ok(())
    })?;
    Ok(CallTransferRerouting { call_id, rerouting_number })
}

pub type CallTransferIdentifyRes = CallTransferRerouting;
pub fn encode_call_transfer_identify_res(out: &mut Vec<u8>, arg: &CallTransferIdentifyRes) {
    encode_rerouting(out, arg);
}
pub fn decode_call_transfer_identify_res(cur: &mut Cursor<'_>) -> Result<CallTransferIdentifyRes, Error> {
    decode_rerouting(cur)
}

pub type CallTransferInitiateArg = CallTransferRerouting;
pub fn encode_call_transfer_initiate_arg(out: &mut Vec<u8>, arg: &CallTransferInitiateArg) {
    encode_rerouting(out, arg);
}
pub fn decode_call_transfer_initiate_arg(cur: &mut Cursor<'_>) -> Result<CallTransferInitiateArg, Error> {
    decode_rerouting(cur)
}

/// `CallTransferSetup_ARG`: `SEQUENCE { NumericString call_id }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTransferSetupArg {
    pub call_id: Vec<u8>,
}

pub fn encode_call_transfer_setup_arg(out: &mut Vec<u8>, arg: &CallTransferSetupArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode_call_id(body, &arg.call_id);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_call_transfer_setup_arg(cur: &mut Cursor<'_>) -> Result<CallTransferSetupArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut call_id = Vec::new();
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        call_id = decode_call_id(c)?;
        Ok(())
    })?;
    Ok(CallTransferSetupArg { call_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_transfer_identify_res_roundtrips() {
        let arg = CallTransferIdentifyRes {
            call_id: b"12".to_vec(),
            rerouting_number: PartyNumber::Public(b"5551111".to_vec()),
        };
        let mut buf = Vec::new();
        encode_call_transfer_identify_res(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_call_transfer_identify_res(&mut cur).unwrap(), arg);
    }

    #[test]
    fn call_transfer_setup_arg_roundtrips() {
        let arg = CallTransferSetupArg { call_id: b"7".to_vec() };
        let mut buf = Vec::new();
        encode_call_transfer_setup_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_call_transfer_setup_arg(&mut cur).unwrap(), arg);
    }
}
