//! PTMP TEI (Terminal Endpoint Identifier) management: the SAPI 63 wire
//! format shared by both roles, NT-side dynamic allocation plus dead-TEI
//! reclamation, and TE-side TEI request retry.
//!
//! Grounded in `q921_send_tei`/`q921_receive_MDL`/`t202_expire`/`t201_expire`
//! in `q921.c`. Unlike `Link`, these are free functions and small trackers
//! rather than one state machine: the NT side manages a pool of links, the
//! TE side drives exactly one.

use num_derive::{FromPrimitive, ToPrimitive};

use crate::error::Error;
use crate::frame::{Address, CmdResp, Control, TEI_AUTO_FIRST, TEI_AUTO_LAST, TEI_GROUP};
use crate::link::TeiCheckState;
use crate::timer::{L2Persistence, TimerConfig};

const MGMT_ENTITY: u8 = 0x0f;

/// Message-type octet values, matching `enum q921_tei_identity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TeiMessage {
    Request = 1,
    Assigned = 2,
    Denied = 3,
    CheckRequest = 4,
    CheckResponse = 5,
    Remove = 6,
    Verify = 7,
}

impl TeiMessage {
    fn from_wire(v: u8) -> Option<Self> {
        Some(match v {
            1 => TeiMessage::Request,
            2 => TeiMessage::Assigned,
            3 => TeiMessage::Denied,
            4 => TeiMessage::CheckRequest,
            5 => TeiMessage::CheckResponse,
            6 => TeiMessage::Remove,
            7 => TeiMessage::Verify,
            _ => return None,
        })
    }
}

/// A decoded TEI management frame (address already known to be
/// SAPI_LAYER2_MANAGEMENT/TEI_GROUP by the caller's SAPI dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeiFrame {
    pub message: TeiMessage,
    pub ri: u16,
    pub ai: u8,
    /// The Ai octet's low "extension" bit; CHECK_RESPONSE frames may omit
    /// it being set on any but the last action in a multi-TEI list, which
    /// this single-action decoder does not attempt to enumerate.
    pub ai_extension: bool,
}

/// Builds a full SAPI 63 UI frame carrying one TEI management action, as
/// `q921_send_tei` does (`iscommand` mirrors its own parameter; this crate
/// always sends management frames as commands per source call sites).
pub fn encode_tei_frame(role: crate::event::Role, message: TeiMessage, ri: u16, ai: u8) -> Vec<u8> {
    let cr = match role {
        crate::event::Role::Network => CmdResp::Command,
        crate::event::Role::Cpe => CmdResp::Response,
    };
    let mut out = Vec::new();
    Address {
        sapi: crate::frame::SAPI_LAYER2_MANAGEMENT,
        cr,
        tei: TEI_GROUP,
    }
    .encode(&mut out);
    Control::U {
        kind: crate::frame::UFrameKind::Ui,
        poll_final: false,
        payload: &[],
    }
    .encode(&mut out);
    out.push(MGMT_ENTITY);
    out.push((ri >> 8) as u8);
    out.push((ri & 0xff) as u8);
    out.push(message as u8);
    out.push((ai << 1) | 1);
    out
}

/// Decodes the management-entity payload following the address and
/// control octets (i.e. `data[0..5]` in the source's `q921_u`).
pub fn decode_tei_frame(payload: &[u8]) -> Result<TeiFrame, Error> {
    if payload.len() < 5 {
        return Err(Error::MalformedTeiManagement);
    }
    if payload[0] != MGMT_ENTITY {
        return Err(Error::MalformedTeiManagement);
    }
    let ri = ((payload[1] as u16) << 8) | payload[2] as u16;
    let message = TeiMessage::from_wire(payload[3]).ok_or(Error::MalformedTeiManagement)?;
    let ai_extension = payload[4] & 0x01 != 0;
    if message != TeiMessage::CheckResponse && !ai_extension {
        return Err(Error::MalformedTeiManagement);
    }
    let ai = payload[4] >> 1;
    Ok(TeiFrame {
        message,
        ri,
        ai,
        ai_extension,
    })
}

/// NT-side free-TEI allocator over the dynamic range
/// `TEI_AUTO_FIRST..=TEI_AUTO_LAST`, mirroring the linear scan in
/// `q921_receive_MDL`'s `Q921_TEI_IDENTITY_REQUEST` arm.
#[derive(Debug, Default)]
pub struct TeiPool {
    assigned: Vec<u8>,
}

impl TeiPool {
    pub fn new() -> Self {
        TeiPool::default()
    }

    pub fn is_assigned(&self, tei: u8) -> bool {
        self.assigned.contains(&tei)
    }

    /// Finds the lowest free TEI and marks it assigned, or returns
    /// `TeiPoolExhausted` if the whole range is in use (the caller should
    /// then run a dead-TEI reclamation poll, as the source does).
    pub fn allocate(&mut self) -> Result<u8, Error> {
        for tei in TEI_AUTO_FIRST..=TEI_AUTO_LAST {
            if !self.is_assigned(tei) {
                self.assigned.push(tei);
                return Ok(tei);
            }
        }
        Err(Error::TeiPoolExhausted)
    }

    pub fn release(&mut self, tei: u8) {
        self.assigned.retain(|&t| t != tei);
    }

    pub fn is_full(&self) -> bool {
        self.assigned.len() as u32 >= (TEI_AUTO_LAST - TEI_AUTO_FIRST + 1) as u32
    }
}

/// NT-side dead-TEI check poll, advancing every tracked link's
/// [`TeiCheckState`] the way `t201_expire` does at the start of each of
/// its two rounds.
pub fn advance_check_round(states: impl IntoIterator<Item = (u8, TeiCheckState)>, first_round: bool) -> Vec<(u8, TeiCheckState)> {
    states
        .into_iter()
        .map(|(tei, state)| {
            let next = if first_round {
                TeiCheckState::Dead
            } else {
                match state {
                    TeiCheckState::Reply => TeiCheckState::DeadReply,
                    other => other,
                }
            };
            (tei, next)
        })
        .collect()
}

/// What to do with a TEI's tracked state on receipt of one CHECK_RESPONSE
/// action, matching the `switch (sub->tei_check)` block in
/// `q921_receive_MDL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResponseAction {
    Noop,
    MarkReplied,
    DuplicateRemove,
}

pub fn record_check_response(state: TeiCheckState) -> (TeiCheckState, CheckResponseAction) {
    match state {
        TeiCheckState::None => (TeiCheckState::None, CheckResponseAction::Noop),
        TeiCheckState::Dead | TeiCheckState::DeadReply => {
            (TeiCheckState::Reply, CheckResponseAction::MarkReplied)
        }
        TeiCheckState::Reply => (TeiCheckState::None, CheckResponseAction::DuplicateRemove),
    }
}

/// TEI still marked dead after a two-round poll should be removed,
/// matching the end-of-poll sweep implied by `Q921_TEI_CHECK_DEAD`/
/// `Q921_TEI_CHECK_DEAD_REPLY` never receiving a response.
pub fn is_unresponsive(state: TeiCheckState) -> bool {
    matches!(state, TeiCheckState::Dead | TeiCheckState::DeadReply)
}

/// TE-side TEI request retry, grounded in `t202_expire`/`q921_tei_request`.
#[derive(Debug, Default)]
pub struct TeRequest {
    pub n202_counter: u32,
    pub ri: u16,
}

pub enum T202Outcome {
    /// Send another REQUEST with the given `ri`.
    Retry { ri: u16 },
    /// N202 retries exhausted (or persistence made the counter irrelevant
    /// and the scheduler itself ran out); give up and fall back to
    /// TEI_UNASSIGNED.
    GiveUp,
}

impl TeRequest {
    pub fn start(&mut self, ri: u16) {
        self.n202_counter = 0;
        self.ri = ri;
    }

    /// Called each time T202 fires; `next_ri` is a fresh random `ri` the
    /// caller supplies (this crate does not depend on a RNG crate).
    pub fn on_t202_expire(&mut self, cfg: &TimerConfig, persistence: L2Persistence, next_ri: u16) -> T202Outcome {
        if !matches!(persistence, L2Persistence::KeepUp) {
            self.n202_counter += 1;
        }
        if self.n202_counter > cfg.n202 {
            return T202Outcome::GiveUp;
        }
        self.ri = next_ri;
        T202Outcome::Retry { ri: self.ri }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Role;

    #[test]
    fn tei_request_frame_roundtrips() {
        let bytes = encode_tei_frame(Role::Cpe, TeiMessage::Request, 0x1234, TEI_GROUP);
        let decoded = decode_tei_frame(&bytes[3..]).unwrap();
        assert_eq!(decoded.message, TeiMessage::Request);
        assert_eq!(decoded.ri, 0x1234);
        assert_eq!(decoded.ai, TEI_GROUP);
    }

    #[test]
    fn pool_allocates_lowest_free_tei_then_exhausts() {
        let mut pool = TeiPool::new();
        assert_eq!(pool.allocate().unwrap(), TEI_AUTO_FIRST);
        assert_eq!(pool.allocate().unwrap(), TEI_AUTO_FIRST + 1);
        pool.release(TEI_AUTO_FIRST);
        assert_eq!(pool.allocate().unwrap(), TEI_AUTO_FIRST);

        let mut pool = TeiPool::new();
        for _ in TEI_AUTO_FIRST..=TEI_AUTO_LAST {
            pool.allocate().unwrap();
        }
        assert!(pool.is_full());
        assert_eq!(pool.allocate(), Err(Error::TeiPoolExhausted));
    }

    #[test]
    fn duplicate_tei_detected_on_second_reply() {
        let (s, a) = record_check_response(TeiCheckState::Dead);
        assert_eq!((s, a), (TeiCheckState::Reply, CheckResponseAction::MarkReplied));
        let (s2, a2) = record_check_response(s);
        assert_eq!((s2, a2), (TeiCheckState::None, CheckResponseAction::DuplicateRemove));
    }

    #[test]
    fn t202_gives_up_after_n202_retries() {
        let cfg = TimerConfig {
            n202: 2,
            ..TimerConfig::default()
        };
        let mut req = TeRequest::default();
        req.start(1);
        assert!(matches!(
            req.on_t202_expire(&cfg, L2Persistence::Default, 2),
            T202Outcome::Retry { ri: 2 }
        ));
        assert!(matches!(
            req.on_t202_expire(&cfg, L2Persistence::Default, 3),
            T202Outcome::Retry { ri: 3 }
        ));
        assert!(matches!(
            req.on_t202_expire(&cfg, L2Persistence::Default, 4),
            T202Outcome::GiveUp
        ));
    }
}
