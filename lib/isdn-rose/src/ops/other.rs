//! Operations private to the "Other" switch family (NI2, DMS100,
//! Lucent5E, ATT4ESS, NI1): DMS100's Remote Line Transfer control pair
//! and NI2's call-transfer/information-following pair.

use isdn_asn1::{cursor::Cursor, decode, encode, tag};

use crate::Error;

const TAG_ENUMERATED: u32 = (tag::CLASS_UNIVERSAL | tag::PC_PRIMITIVE | tag::TYPE_ENUMERATED) as u32;

/// DMS100 `RLT_OperationInd_RES`: `[0] INTEGER call_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RltOperationIndRes {
    pub call_id: i32,
}

pub fn encode_rlt_operation_ind_res(out: &mut Vec<u8>, arg: &RltOperationIndRes) {
    encode::integer(out, tag::CLASS_CONTEXT as u32 | 0, arg.call_id);
}

pub fn decode_rlt_operation_ind_res(cur: &mut Cursor<'_>) -> Result<RltOperationIndRes, Error> {
    cur.expect_tag(tag::CLASS_CONTEXT as u32 | 0)?;
    Ok(RltOperationIndRes { call_id: decode::integer(cur)? })
}

/// DMS100 `RLT_ThirdParty_ARG`: `SEQUENCE { [0] call_id INTEGER, [1] reason
/// INTEGER }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RltThirdPartyArg {
    pub call_id: i32,
    pub reason: i32,
}

pub fn encode_rlt_third_party_arg(out: &mut Vec<u8>, arg: &RltThirdPartyArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode::integer(body, tag::CLASS_CONTEXT as u32 | 0, arg.call_id);
        encode::integer(body, tag::CLASS_CONTEXT as u32 | 1, arg.reason);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_rlt_third_party_arg(cur: &mut Cursor<'_>) -> Result<RltThirdPartyArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut call_id = 0;
    let mut reason = 0;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        let field_tag = c.tag()?;
        let value = decode::integer(c)?;
        if field_tag == (tag::CLASS_CONTEXT as u32 | 0) {
            call_id = value;
        } else {
            reason = value;
        }
        Ok(())
    })?;
    Ok(RltThirdPartyArg { call_id, reason })
}

/// NI2 `InformationFollowing_ARG`: a bare `ENUMERATED`.
pub fn encode_information_following_arg(out: &mut Vec<u8>, value: i32) {
    encode::integer(out, TAG_ENUMERATED, value);
}

pub fn decode_information_following_arg(cur: &mut Cursor<'_>) -> Result<i32, Error> {
    cur.expect_tag(TAG_ENUMERATED)?;
    decode::integer(cur)
}

/// NI2 `InitiateTransfer_ARG`: `SEQUENCE { INTEGER call_reference }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiateTransferArg {
    pub call_reference: i32,
}

pub fn encode_initiate_transfer_arg(out: &mut Vec<u8>, arg: &InitiateTransferArg) {
    encode::constructed(out, tag::TAG_SEQUENCE, |body| {
        encode::integer(body, tag::TAG_INTEGER, arg.call_reference);
        Ok::<(), Error>(())
    })
    .expect("constructed body never fails");
}

pub fn decode_initiate_transfer_arg(cur: &mut Cursor<'_>) -> Result<InitiateTransferArg, Error> {
    cur.expect_tag(tag::TAG_SEQUENCE)?;
    let len = cur.length()?;
    let mut call_reference = 0;
    isdn_asn1::cursor::for_each_component(cur, len, |c| {
        c.expect_tag(tag::TAG_INTEGER)?;
        call_reference = decode::integer(c)?;
        Ok(())
    })?;
    Ok(InitiateTransferArg { call_reference })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rlt_operation_ind_res_roundtrips() {
        let arg = RltOperationIndRes { call_id: 42 };
        let mut buf = Vec::new();
        encode_rlt_operation_ind_res(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_rlt_operation_ind_res(&mut cur).unwrap(), arg);
    }

    #[test]
    fn rlt_third_party_arg_roundtrips() {
        let arg = RltThirdPartyArg { call_id: 1, reason: 2 };
        let mut buf = Vec::new();
        encode_rlt_third_party_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_rlt_third_party_arg(&mut cur).unwrap(), arg);
    }

    #[test]
    fn initiate_transfer_arg_roundtrips() {
        let arg = InitiateTransferArg { call_reference: 99 };
        let mut buf = Vec::new();
        encode_initiate_transfer_arg(&mut buf, &arg);
        let mut cur = Cursor::new(&buf);
        assert_eq!(decode_initiate_transfer_arg(&mut cur).unwrap(), arg);
    }
}
