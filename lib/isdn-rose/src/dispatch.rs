//! Ties an [`Operation`] to the argument codec in [`crate::ops`] that
//! knows how to encode/decode it, and maps each operation to/from its
//! wire-level [`OperationValue`] local code per switch family.
//!
//! `rose.h`'s `ROSE_*` constants aren't part of the retrieved source, so
//! the local values below are reconstructed from the public ECMA-164/
//! ECMA-178 (QSIG Name/Call-Transfer) and ETSI EN 300 207/EN 300 182
//! (Diversion/AOC) operation numbering, kept internally consistent within
//! each switch family (see DESIGN.md for the exact values chosen and why
//! this reconstruction, rather than the header, is the source of truth
//! here).

use isdn_asn1::cursor::Cursor;

use crate::ops::{etsi_aoc, etsi_diversion, etsi_mwi, other, qsig_ct, qsig_name};
use crate::switch_type::SwitchFamily;
use crate::value::OperationValue;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    QsigCallingName,
    QsigCalledName,
    QsigConnectedName,
    QsigBusyName,
    QsigCallTransferIdentify,
    QsigCallTransferInitiate,
    QsigCallTransferSetup,
    EtsiActivationDiversion,
    EtsiDeactivationDiversion,
    EtsiMwiActivate,
    EtsiMwiDeactivate,
    EtsiAocdCurrency,
    EtsiAocdChargingUnit,
    OtherRltOperationIndRes,
    OtherRltThirdParty,
    OtherInformationFollowing,
    OtherInitiateTransfer,
}

impl Operation {
    /// The switch family an operation is valid under; used to reject a
    /// codec lookup for an operation that doesn't belong to the link's
    /// configured switchtype.
    pub fn family(self) -> SwitchFamily {
        match self {
            Operation::QsigCallingName
            | Operation::QsigCalledName
            | Operation::QsigConnectedName
            | Operation::QsigBusyName
            | Operation::QsigCallTransferIdentify
            | Operation::QsigCallTransferInitiate
            | Operation::QsigCallTransferSetup => SwitchFamily::Qsig,
            Operation::EtsiActivationDiversion
            | Operation::EtsiDeactivationDiversion
            | Operation::EtsiMwiActivate
            | Operation::EtsiMwiDeactivate
            | Operation::EtsiAocdCurrency
            | Operation::EtsiAocdChargingUnit => SwitchFamily::Etsi,
            Operation::OtherRltOperationIndRes
            | Operation::OtherRltThirdParty
            | Operation::OtherInformationFollowing
            | Operation::OtherInitiateTransfer => SwitchFamily::Other,
        }
    }
}

/// The local-value code this operation is sent/recognized under, scoped to
/// its own switch family's table (see module doc for provenance).
pub fn operation_value(operation: Operation) -> OperationValue {
    let local = match operation {
        Operation::QsigCallingName => 0,
        Operation::QsigCalledName => 1,
        Operation::QsigConnectedName => 2,
        Operation::QsigBusyName => 3,
        Operation::QsigCallTransferIdentify => 7,
        Operation::QsigCallTransferInitiate => 9,
        Operation::QsigCallTransferSetup => 10,
        Operation::EtsiActivationDiversion => 7,
        Operation::EtsiDeactivationDiversion => 8,
        Operation::EtsiMwiActivate => 9,
        Operation::EtsiMwiDeactivate => 10,
        Operation::EtsiAocdCurrency => 30,
        Operation::EtsiAocdChargingUnit => 31,
        Operation::OtherRltOperationIndRes => 0,
        Operation::OtherRltThirdParty => 1,
        Operation::OtherInformationFollowing => 2,
        Operation::OtherInitiateTransfer => 3,
    };
    OperationValue::Local(local)
}

/// Recovers an [`Operation`] from a decoded wire value, scoped to the
/// table for `family` (the switchtype the link is configured for). Returns
/// `None` if no entry matches, in which case the caller sets the library
/// code to its `Unknown` sentinel and skips argument decoding.
pub fn lookup_operation(family: SwitchFamily, value: &OperationValue) -> Option<Operation> {
    let OperationValue::Local(local) = value else {
        // No entry in this reconstructed table carries an OID prefix.
        return None;
    };
    let candidates: &[Operation] = match family {
        SwitchFamily::Qsig => &[
            Operation::QsigCallingName,
            Operation::QsigCalledName,
            Operation::QsigConnectedName,
            Operation::QsigBusyName,
            Operation::QsigCallTransferIdentify,
            Operation::QsigCallTransferInitiate,
            Operation::QsigCallTransferSetup,
        ],
        SwitchFamily::Etsi => &[
            Operation::EtsiActivationDiversion,
            Operation::EtsiDeactivationDiversion,
            Operation::EtsiMwiActivate,
            Operation::EtsiMwiDeactivate,
            Operation::EtsiAocdCurrency,
            Operation::EtsiAocdChargingUnit,
        ],
        SwitchFamily::Other => &[
            Operation::OtherRltOperationIndRes,
            Operation::OtherRltThirdParty,
            Operation::OtherInformationFollowing,
            Operation::OtherInitiateTransfer,
        ],
        SwitchFamily::None => &[],
    };
    candidates
        .iter()
        .copied()
        .find(|op| operation_value(*op) == OperationValue::Local(*local))
}

/// The decoded argument payload for any operation this crate knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    PartyName(qsig_name::PartyNameArg),
    CallTransferRerouting(qsig_ct::CallTransferRerouting),
    CallTransferSetup(qsig_ct::CallTransferSetupArg),
    ActivationDiversion(etsi_diversion::ActivationDiversionArg),
    DeactivationDiversion(etsi_diversion::DeactivationDiversionArg),
    MwiActivate(etsi_mwi::MwiActivateArg),
    MwiDeactivate(etsi_mwi::MwiDeactivateArg),
    Aocd(etsi_aoc::AocdValue),
    RltOperationIndRes(other::RltOperationIndRes),
    RltThirdParty(other::RltThirdPartyArg),
    InformationFollowing(i32),
    InitiateTransfer(other::InitiateTransferArg),
}

pub fn encode_invoke_args(out: &mut Vec<u8>, args: &Arguments) -> Result<(), Error> {
    match args {
        Arguments::PartyName(arg) => qsig_name::encode_party_name_arg(out, arg),
        Arguments::CallTransferRerouting(arg) => qsig_ct::encode_call_transfer_initiate_arg(out, arg),
        Arguments::CallTransferSetup(arg) => qsig_ct::encode_call_transfer_setup_arg(out, arg),
        Arguments::ActivationDiversion(arg) => etsi_diversion::encode_activation_diversion_arg(out, arg),
        Arguments::DeactivationDiversion(arg) => etsi_diversion::encode_deactivation_diversion_arg(out, arg),
        Arguments::MwiActivate(arg) => etsi_mwi::encode_mwi_activate_arg(out, arg),
        Arguments::MwiDeactivate(arg) => etsi_mwi::encode_mwi_deactivate_arg(out, arg),
        Arguments::Aocd(value) => etsi_aoc::encode_aocd_currency_arg(out, value),
        Arguments::RltOperationIndRes(arg) => other::encode_rlt_operation_ind_res(out, arg),
        Arguments::RltThirdParty(arg) => other::encode_rlt_third_party_arg(out, arg),
        Arguments::InformationFollowing(value) => other::encode_information_following_arg(out, *value),
        Arguments::InitiateTransfer(arg) => other::encode_initiate_transfer_arg(out, arg),
    }
    Ok(())
}

pub fn decode_invoke_args(operation: Operation, cur: &mut Cursor<'_>) -> Result<Arguments, Error> {
    match operation {
        Operation::QsigCallingName
        | Operation::QsigCalledName
        | Operation::QsigConnectedName
        | Operation::QsigBusyName => Ok(Arguments::PartyName(qsig_name::decode_party_name_arg(cur)?)),
        Operation::QsigCallTransferIdentify => Ok(Arguments::CallTransferRerouting(
            qsig_ct::decode_call_transfer_identify_res(cur)?,
        )),
        Operation::QsigCallTransferInitiate => Ok(Arguments::CallTransferRerouting(
            qsig_ct::decode_call_transfer_initiate_arg(cur)?,
        )),
        Operation::QsigCallTransferSetup => {
            Ok(Arguments::CallTransferSetup(qsig_ct::decode_call_transfer_setup_arg(cur)?))
        }
        Operation::EtsiActivationDiversion => Ok(Arguments::ActivationDiversion(
            etsi_diversion::decode_activation_diversion_arg(cur)?,
        )),
        Operation::EtsiDeactivationDiversion => Ok(Arguments::DeactivationDiversion(
            etsi_diversion::decode_deactivation_diversion_arg(cur)?,
        )),
        Operation::EtsiMwiActivate => {
            cur.expect_tag(isdn_asn1::tag::TAG_SEQUENCE)?;
            let len = cur.length()?;
            Ok(Arguments::MwiActivate(etsi_mwi::decode_mwi_activate_arg(cur, len)?))
        }
        Operation::EtsiMwiDeactivate => Ok(Arguments::MwiDeactivate(
            etsi_mwi::decode_mwi_deactivate_arg(cur)?,
        )),
        Operation::EtsiAocdCurrency => Ok(Arguments::Aocd(etsi_aoc::decode_aocd_currency_arg(cur)?)),
        Operation::EtsiAocdChargingUnit => Ok(Arguments::Aocd(etsi_aoc::decode_aocd_charging_unit_arg(cur)?)),
        Operation::OtherRltOperationIndRes => {
            Ok(Arguments::RltOperationIndRes(other::decode_rlt_operation_ind_res(cur)?))
        }
        Operation::OtherRltThirdParty => Ok(Arguments::RltThirdParty(other::decode_rlt_third_party_arg(cur)?)),
        Operation::OtherInformationFollowing => {
            Ok(Arguments::InformationFollowing(other::decode_information_following_arg(cur)?))
        }
        Operation::OtherInitiateTransfer => {
            Ok(Arguments::InitiateTransfer(other::decode_initiate_transfer_arg(cur)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::qsig_name::{CharacterSet, Name};

    #[test]
    fn party_name_args_roundtrip_through_dispatch() {
        let args = Arguments::PartyName(Name::Allowed {
            data: b"Alice".to_vec(),
            char_set: CharacterSet::Iso8859_1,
        });
        let mut buf = Vec::new();
        encode_invoke_args(&mut buf, &args).unwrap();
        let mut cur = Cursor::new(&buf);
        let decoded = decode_invoke_args(Operation::QsigCallingName, &mut cur).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn mwi_deactivate_args_roundtrip_through_dispatch() {
        use crate::party_number::PartyNumber;
        let args = Arguments::MwiDeactivate(etsi_mwi::MwiDeactivateArg {
            receiving_user_number: PartyNumber::Public(b"1234".to_vec()),
            basic_service: 1,
            controlling_user_number: None,
            mode: None,
        });
        let mut buf = Vec::new();
        encode_invoke_args(&mut buf, &args).unwrap();
        let mut cur = Cursor::new(&buf);
        let decoded = decode_invoke_args(Operation::EtsiMwiDeactivate, &mut cur).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn operation_family_matches_switch_type() {
        assert_eq!(Operation::QsigCallingName.family(), SwitchFamily::Qsig);
        assert_eq!(Operation::EtsiMwiActivate.family(), SwitchFamily::Etsi);
        assert_eq!(Operation::OtherInitiateTransfer.family(), SwitchFamily::Other);
    }

    #[test]
    fn calling_name_operation_value_is_local_zero() {
        // QSIG CallingName's operation-value is localValue 0.
        assert_eq!(
            operation_value(Operation::QsigCallingName),
            OperationValue::Local(0)
        );
    }

    #[test]
    fn lookup_operation_round_trips_for_every_table_entry() {
        for op in [
            Operation::QsigCallingName,
            Operation::QsigCalledName,
            Operation::QsigConnectedName,
            Operation::QsigBusyName,
            Operation::QsigCallTransferIdentify,
            Operation::QsigCallTransferInitiate,
            Operation::QsigCallTransferSetup,
        ] {
            let value = operation_value(op);
            assert_eq!(lookup_operation(SwitchFamily::Qsig, &value), Some(op));
        }
        for op in [
            Operation::EtsiActivationDiversion,
            Operation::EtsiDeactivationDiversion,
            Operation::EtsiMwiActivate,
            Operation::EtsiMwiDeactivate,
            Operation::EtsiAocdCurrency,
            Operation::EtsiAocdChargingUnit,
        ] {
            let value = operation_value(op);
            assert_eq!(lookup_operation(SwitchFamily::Etsi, &value), Some(op));
        }
    }

    #[test]
    fn lookup_operation_rejects_cross_family_value() {
        let value = operation_value(Operation::QsigCallingName);
        assert_eq!(lookup_operation(SwitchFamily::Etsi, &value), None);
    }
}
