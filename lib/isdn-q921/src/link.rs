//! The per-(SAPI, TEI) Q.921 link state machine: establishment, the
//! windowed I-frame send/ack/reject engine, and MDL-ERROR handling.
//!
//! Every method that can produce wire traffic or arm/disarm a timer takes
//! a [`Ctx`], which bundles the pieces a [`Link`] cannot own itself (the
//! controller's scheduler, the configured timer values, the current wall
//! time, and where to push encoded frames) without pulling the whole
//! controller into this crate.

use std::collections::VecDeque;

use isdn_sched::SchedId;
use num_derive::{FromPrimitive, ToPrimitive};

use crate::event::{DlEvent, MdlError, Role, Topology};
use crate::frame::{Address, CmdResp, Control, SFrameKind, UFrameKind};
use crate::timer::{L2Persistence, LinkScheduler, TimerConfig, TimerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub sapi: u8,
    pub tei: u8,
}

/// Q.921 link states, numbered to match `q921_state` in `pri_q921.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum State {
    TeiUnassigned = 1,
    AssignAwaitingTei,
    EstablishAwaitingTei,
    TeiAssigned,
    AwaitingEstablishment,
    AwaitingRelease,
    MultiFrameEstablished,
    TimerRecovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeiCheckState {
    None,
    Dead,
    Reply,
    DeadReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxStatus {
    NeverSent,
    PushedBack,
    Sent,
}

#[derive(Debug, Clone)]
struct TxFrame {
    status: TxStatus,
    ns: u8,
    payload: Vec<u8>,
}

/// Everything a [`Link`] method needs from its owning controller for one
/// call: where to arm/disarm timers, the configured values, the current
/// wall-clock time, where to push frames it wants transmitted, and the
/// static facts (role, persistence policy) that aren't link state.
pub struct Ctx<'a> {
    pub sched: &'a mut dyn LinkScheduler,
    pub cfg: &'a TimerConfig,
    pub now_ms: u64,
    pub frames_out: &'a mut Vec<Vec<u8>>,
    pub role: Role,
    pub l2_persistence: L2Persistence,
}

fn add_mod128(a: u8, b: u8) -> u8 {
    (a as u16 + b as u16).rem_euclid(128) as u8
}

/// True iff `x` lies in the half-open window `[start, end)` modulo 128.
fn in_window_mod128(start: u8, end: u8, x: u8) -> bool {
    let mut y = start;
    while y != end {
        if y == x {
            return true;
        }
        y = add_mod128(y, 1);
    }
    false
}

pub struct Link {
    pub id: LinkId,
    pub state: State,
    pub tei_check: TeiCheckState,
    pub ri: u16,
    pub v_a: u8,
    pub v_s: u8,
    pub v_r: u8,
    pub rc: u32,
    tx_queue: VecDeque<TxFrame>,
    t200: SchedId,
    t203: SchedId,
    restart: SchedId,
    pub peer_rx_busy: bool,
    pub own_rx_busy: bool,
    pub acknowledge_pending: bool,
    pub reject_exception: bool,
    pub l3_initiated: bool,
    pub mdl_free_me: bool,
    /// Deferred MDL-ERROR, consumed at the end of the current ingress/timer
    /// turn (see [`Link::take_pending_mdl_error`]). Stands in for the
    /// source's zero-delay scheduled callback -- see the design note on
    /// breaking reentrancy without a real async boundary.
    pending_mdl_error: Option<MdlError>,
}

impl Link {
    pub fn new(id: LinkId, state: State) -> Self {
        Link {
            id,
            state,
            tei_check: TeiCheckState::None,
            ri: 0,
            v_a: 0,
            v_s: 0,
            v_r: 0,
            rc: 0,
            tx_queue: VecDeque::new(),
            t200: SchedId::NONE,
            t203: SchedId::NONE,
            restart: SchedId::NONE,
            peer_rx_busy: false,
            own_rx_busy: false,
            acknowledge_pending: false,
            reject_exception: false,
            l3_initiated: false,
            mdl_free_me: false,
            pending_mdl_error: None,
        }
    }

    pub fn take_pending_mdl_error(&mut self) -> Option<MdlError> {
        self.pending_mdl_error.take()
    }

    /// Whether exactly one of T200/T203 is armed.
    pub fn exactly_one_timer_running(&self) -> bool {
        match self.state {
            State::MultiFrameEstablished => self.t200.is_none() != self.t203.is_none(),
            State::TeiUnassigned | State::TeiAssigned => {
                self.t200.is_none() && self.t203.is_none()
            }
            _ => true,
        }
    }

    pub fn window_len(&self) -> u8 {
        let mut n = 0u8;
        let mut x = self.v_a;
        while x != self.v_s {
            n += 1;
            x = add_mod128(x, 1);
        }
        n
    }

    fn discard_iqueue(&mut self) {
        self.tx_queue.clear();
    }

    fn clear_exception_conditions(&mut self) {
        self.own_rx_busy = false;
        self.peer_rx_busy = false;
        self.reject_exception = false;
        self.acknowledge_pending = false;
    }

    fn stop_t200(&mut self, ctx: &mut Ctx) {
        ctx.sched.stop(self.t200);
        self.t200 = SchedId::NONE;
    }

    fn start_t200(&mut self, ctx: &mut Ctx) {
        self.t200 = ctx.sched.start(TimerKind::T200, ctx.cfg.t200_ms);
    }

    fn restart_t200(&mut self, ctx: &mut Ctx) {
        ctx.sched.stop(self.t200);
        self.t200 = ctx.sched.start(TimerKind::T200, ctx.cfg.t200_ms);
    }

    fn stop_t203(&mut self, ctx: &mut Ctx) {
        ctx.sched.stop(self.t203);
        self.t203 = SchedId::NONE;
    }

    fn start_t203(&mut self, ctx: &mut Ctx) {
        self.t203 = ctx.sched.start(TimerKind::T203, ctx.cfg.t203_ms);
    }

    fn check_delay_restart(&mut self, ctx: &mut Ctx) {
        if matches!(ctx.l2_persistence, L2Persistence::KeepUp) {
            ctx.sched.stop(self.restart);
            self.restart = ctx.sched.start(TimerKind::Restart, ctx.cfg.t200_ms);
        }
    }

    /// SABME/DISC retransmission setup: clear exceptions, reset RC, stop
    /// T203, (re)start T200, send SABME. Shared by initial establishment,
    /// T200-exhaustion-driven re-establishment, and the KEEP_UP restart
    /// timer.
    fn establish_data_link(&mut self, ctx: &mut Ctx) {
        self.clear_exception_conditions();
        self.rc = 0;
        self.stop_t203(ctx);
        self.restart_t200(ctx);
        self.send_sabme(ctx);
    }

    fn build_frame(&self, cr: CmdResp, control: Control) -> Vec<u8> {
        let mut out = Vec::new();
        Address {
            sapi: self.id.sapi,
            cr,
            tei: self.id.tei,
        }
        .encode(&mut out);
        control.encode(&mut out);
        out
    }

    /// SABME is always a command; the bit polarity matches the address
    /// convention `pri_q921.h`'s `is_command` uses for the local role.
    fn cr_sabme(role: Role) -> CmdResp {
        match role {
            Role::Network => CmdResp::Command,
            Role::Cpe => CmdResp::Response,
        }
    }

    /// DISC/UA/DM share the opposite polarity from SABME in the source
    /// (`q921_send_disc`/`q921_send_ua`/`q921_send_dm` all hard-code the
    /// same network/CPE branch, distinct from `q921_send_sabme`'s).
    fn cr_disc_ua_dm(role: Role) -> CmdResp {
        match role {
            Role::Network => CmdResp::Response,
            Role::Cpe => CmdResp::Command,
        }
    }

    /// I/RR/RNR/REJ take an explicit command/response flag (`q921_rr`'s
    /// `cmd` parameter); I-frames are always sent as commands.
    fn cr_supervisory(role: Role, as_command: bool) -> CmdResp {
        match role {
            Role::Network => {
                if as_command {
                    CmdResp::Command
                } else {
                    CmdResp::Response
                }
            }
            Role::Cpe => {
                if as_command {
                    CmdResp::Response
                } else {
                    CmdResp::Command
                }
            }
        }
    }

    fn is_incoming_command(role: Role, cr: CmdResp) -> bool {
        let bit_set = matches!(cr, CmdResp::Command);
        match role {
            Role::Network => !bit_set,
            Role::Cpe => bit_set,
        }
    }

    fn send_sabme(&self, ctx: &mut Ctx) {
        let frame = self.build_frame(
            Self::cr_sabme(ctx.role),
            Control::U {
                kind: UFrameKind::Sabme,
                poll_final: true,
                payload: &[],
            },
        );
        ctx.frames_out.push(frame);
    }

    fn send_disc(&self, ctx: &mut Ctx, poll: bool) {
        let frame = self.build_frame(
            Self::cr_disc_ua_dm(ctx.role),
            Control::U {
                kind: UFrameKind::Disc,
                poll_final: poll,
                payload: &[],
            },
        );
        ctx.frames_out.push(frame);
    }

    fn send_ua(&self, ctx: &mut Ctx, final_bit: bool) {
        let frame = self.build_frame(
            Self::cr_disc_ua_dm(ctx.role),
            Control::U {
                kind: UFrameKind::Ua,
                poll_final: final_bit,
                payload: &[],
            },
        );
        ctx.frames_out.push(frame);
    }

    fn send_dm(&self, ctx: &mut Ctx, final_bit: bool) {
        let frame = self.build_frame(
            Self::cr_disc_ua_dm(ctx.role),
            Control::U {
                kind: UFrameKind::Dm,
                poll_final: final_bit,
                payload: &[],
            },
        );
        ctx.frames_out.push(frame);
    }

    fn send_rr(&self, ctx: &mut Ctx, poll_final: bool, as_command: bool) {
        let frame = self.build_frame(
            Self::cr_supervisory(ctx.role, as_command),
            Control::S {
                kind: SFrameKind::Rr,
                nr: self.v_r,
                poll_final,
            },
        );
        ctx.frames_out.push(frame);
    }

    fn send_rej(&self, ctx: &mut Ctx, poll_final: bool, as_command: bool) {
        let frame = self.build_frame(
            Self::cr_supervisory(ctx.role, as_command),
            Control::S {
                kind: SFrameKind::Rej,
                nr: self.v_r,
                poll_final,
            },
        );
        ctx.frames_out.push(frame);
    }

    fn enquiry_response(&mut self, ctx: &mut Ctx) {
        if !self.own_rx_busy {
            self.send_rr(ctx, true, false);
        }
        self.acknowledge_pending = false;
    }

    fn transmit_enquiry(&mut self, ctx: &mut Ctx) {
        if !self.own_rx_busy {
            self.send_rr(ctx, true, true);
            self.acknowledge_pending = false;
            self.start_t200(ctx);
        }
    }

    // ---- upper-layer requests ----------------------------------------

    /// DL-DATA request: queue a Q.931 frame as an I-frame. If the link
    /// isn't even TEI_ASSIGNED-or-later, this also kicks off establishment
    /// (mirrors `q921_transmit_iframe`'s TEI_ASSIGNED fallthrough).
    pub fn queue_data(&mut self, payload: Vec<u8>, ctx: &mut Ctx) {
        self.tx_queue.push_back(TxFrame {
            status: TxStatus::NeverSent,
            ns: 0,
            payload,
        });
        if self.state == State::TeiAssigned {
            ctx.sched.stop(self.restart);
            self.restart = SchedId::NONE;
            self.establish_data_link(ctx);
            self.l3_initiated = true;
            self.state = State::AwaitingEstablishment;
            return;
        }
        if matches!(
            self.state,
            State::MultiFrameEstablished | State::TimerRecovery
        ) {
            self.send_queued_iframes(ctx);
        }
    }

    /// PTP startup: both ends unconditionally send SABME, matching
    /// `q921_start`'s PTP branch (no TEI management needed).
    pub fn start_ptp(&mut self, ctx: &mut Ctx) {
        self.establish_data_link(ctx);
        self.l3_initiated = true;
        self.state = State::AwaitingEstablishment;
    }

    /// DL-RELEASE request: send DISC and move to AWAITING_RELEASE.
    pub fn request_release(&mut self, ctx: &mut Ctx) {
        if !matches!(
            self.state,
            State::MultiFrameEstablished | State::TimerRecovery
        ) {
            return;
        }
        self.discard_iqueue();
        self.rc = 0;
        self.stop_t203(ctx);
        self.restart_t200(ctx);
        self.send_disc(ctx, true);
        self.state = State::AwaitingRelease;
    }

    /// Walks the Tx queue sending every never-sent/pushed-back frame while
    /// the window is open and the peer isn't busy, matching
    /// `q921_send_queued_iframes`.
    fn send_queued_iframes(&mut self, ctx: &mut Ctx) -> bool {
        let mut sent_any = false;
        loop {
            if self.peer_rx_busy {
                break;
            }
            if self.v_s == add_mod128(self.v_a, ctx.cfg.k) {
                break;
            }
            let idx = self
                .tx_queue
                .iter()
                .position(|f| matches!(f.status, TxStatus::NeverSent | TxStatus::PushedBack));
            let idx = match idx {
                Some(i) => i,
                None => break,
            };
            let ns = self.v_s;
            let nr = self.v_r;
            let payload = self.tx_queue[idx].payload.clone();
            self.tx_queue[idx].status = TxStatus::Sent;
            self.tx_queue[idx].ns = ns;
            let frame = self.build_frame(
                Self::cr_supervisory(ctx.role, true),
                Control::I {
                    ns,
                    nr,
                    poll: false,
                    payload: &payload,
                },
            );
            ctx.frames_out.push(frame);
            self.v_s = add_mod128(self.v_s, 1);
            sent_any = true;
        }
        if sent_any {
            self.acknowledge_pending = false;
            if self.t200.is_none() {
                self.start_t200(ctx);
            }
            self.stop_t203(ctx);
        }
        sent_any
    }

    fn n_r_is_valid(&self, n_r: u8) -> bool {
        in_window_mod128(self.v_a, self.v_s, n_r) || n_r == self.v_s
    }

    fn update_v_a(&mut self, n_r: u8) {
        self.tx_queue.retain(|f| {
            !(matches!(f.status, TxStatus::Sent) && in_window_mod128(self.v_a, n_r, f.ns))
        });
        self.v_a = n_r;
    }

    fn invoke_retransmission(&mut self, n_r: u8, ctx: &mut Ctx) {
        for f in self.tx_queue.iter_mut() {
            if matches!(f.status, TxStatus::Sent) {
                f.status = TxStatus::PushedBack;
            }
        }
        self.v_s = n_r;
        self.send_queued_iframes(ctx);
    }

    fn n_r_error_recovery(&mut self, ctx: &mut Ctx) {
        self.pending_mdl_error = Some(MdlError::J);
        self.establish_data_link(ctx);
        self.l3_initiated = false;
    }

    // ---- MDL-REMOVE -----------------------------------------------------

    /// Tears the link down to TEI_UNASSIGNED from whatever state it is in,
    /// discarding the Tx queue and posting the matching DL event, then
    /// reports TEI-REMOVAL -- mirrors `q921_mdl_remove`, collapsed to the
    /// single event this reimplementation allows per turn.
    pub fn mdl_remove(&mut self, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::TeiAssigned => {
                ctx.sched.stop(self.restart);
                self.restart = SchedId::NONE;
                self.discard_iqueue();
            }
            State::AwaitingEstablishment => {
                self.discard_iqueue();
                self.stop_t200(ctx);
            }
            State::AwaitingRelease => {
                self.discard_iqueue();
                self.stop_t200(ctx);
            }
            State::MultiFrameEstablished => {
                self.discard_iqueue();
                self.stop_t200(ctx);
                self.stop_t203(ctx);
            }
            State::TimerRecovery => {
                self.discard_iqueue();
                self.stop_t200(ctx);
            }
            _ => return None,
        }
        self.state = State::TeiUnassigned;
        Some(DlEvent::TeiRemoval { tei: self.id.tei })
    }

    // ---- frame reception -------------------------------------------------

    pub fn handle_frame(&mut self, cr: CmdResp, control: &Control<'_>, ctx: &mut Ctx) -> Option<DlEvent> {
        let is_command = Self::is_incoming_command(ctx.role, cr);
        match control {
            Control::U {
                kind,
                poll_final,
                ..
            } => self.handle_u(*kind, is_command, *poll_final, ctx),
            Control::S {
                kind,
                nr,
                poll_final,
            } => self.handle_s(*kind, is_command, *nr, *poll_final, ctx),
            Control::I {
                ns,
                nr,
                poll,
                payload,
            } => self.handle_i(*ns, *nr, *poll, payload, ctx),
        }
    }

    fn handle_u(
        &mut self,
        kind: UFrameKind,
        is_command: bool,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        let _ = is_command;
        match kind {
            UFrameKind::Sabme => self.handle_sabme(poll_final, ctx),
            UFrameKind::Ua => self.handle_ua(poll_final, ctx),
            UFrameKind::Disc => self.handle_disc(poll_final, ctx),
            UFrameKind::Dm => self.handle_dm(poll_final, ctx),
            UFrameKind::Frmr => self.handle_frmr(ctx),
            UFrameKind::Ui => None,
        }
    }

    fn handle_sabme(&mut self, poll: bool, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::MultiFrameEstablished | State::TimerRecovery => {
                self.send_ua(ctx, poll);
                self.clear_exception_conditions();
                self.pending_mdl_error = Some(MdlError::F);
                let had_unacked = self.v_s != self.v_a;
                if had_unacked {
                    self.discard_iqueue();
                }
                self.stop_t200(ctx);
                self.start_t203(ctx);
                self.v_a = 0;
                self.v_s = 0;
                self.v_r = 0;
                self.state = State::MultiFrameEstablished;
                had_unacked.then_some(DlEvent::EstablishIndication)
            }
            State::TeiAssigned => {
                ctx.sched.stop(self.restart);
                self.restart = SchedId::NONE;
                self.send_ua(ctx, poll);
                self.clear_exception_conditions();
                self.v_a = 0;
                self.v_s = 0;
                self.v_r = 0;
                self.start_t203(ctx);
                self.state = State::MultiFrameEstablished;
                Some(DlEvent::EstablishIndication)
            }
            State::AwaitingEstablishment => {
                self.send_ua(ctx, poll);
                None
            }
            State::AwaitingRelease => {
                self.send_dm(ctx, poll);
                None
            }
            _ => None,
        }
    }

    fn handle_disc(&mut self, poll: bool, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::TeiAssigned | State::AwaitingEstablishment => {
                self.send_dm(ctx, poll);
                None
            }
            State::AwaitingRelease => {
                self.send_ua(ctx, poll);
                None
            }
            State::MultiFrameEstablished | State::TimerRecovery => {
                let was_established = self.state == State::MultiFrameEstablished;
                self.check_delay_restart(ctx);
                self.discard_iqueue();
                self.send_ua(ctx, poll);
                self.stop_t200(ctx);
                if was_established {
                    self.stop_t203(ctx);
                }
                self.state = State::TeiAssigned;
                Some(DlEvent::ReleaseIndication)
            }
            _ => None,
        }
    }

    fn handle_ua(&mut self, final_bit: bool, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::TeiAssigned | State::MultiFrameEstablished | State::TimerRecovery => {
                self.pending_mdl_error = Some(if final_bit { MdlError::C } else { MdlError::D });
                None
            }
            State::AwaitingEstablishment => {
                if !final_bit {
                    self.pending_mdl_error = Some(MdlError::D);
                    return None;
                }
                let event = if !self.l3_initiated {
                    if self.v_s != self.v_a {
                        self.discard_iqueue();
                        Some(DlEvent::EstablishIndication)
                    } else {
                        None
                    }
                } else {
                    self.l3_initiated = false;
                    Some(DlEvent::EstablishConfirm)
                };
                self.stop_t200(ctx);
                self.start_t203(ctx);
                self.v_r = 0;
                self.v_s = 0;
                self.v_a = 0;
                self.state = State::MultiFrameEstablished;
                event
            }
            State::AwaitingRelease => {
                if !final_bit {
                    self.pending_mdl_error = Some(MdlError::D);
                    None
                } else {
                    self.check_delay_restart(ctx);
                    self.stop_t200(ctx);
                    self.state = State::TeiAssigned;
                    Some(DlEvent::ReleaseConfirm)
                }
            }
            _ => None,
        }
    }

    fn handle_dm(&mut self, final_bit: bool, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::TeiAssigned => {
                if final_bit {
                    return None;
                }
                ctx.sched.stop(self.restart);
                self.restart = SchedId::NONE;
                self.establish_data_link(ctx);
                self.l3_initiated = true;
                self.state = State::AwaitingEstablishment;
                None
            }
            State::AwaitingEstablishment => {
                if !final_bit {
                    return None;
                }
                self.check_delay_restart(ctx);
                self.discard_iqueue();
                self.stop_t200(ctx);
                self.state = State::TeiAssigned;
                Some(DlEvent::ReleaseIndication)
            }
            State::AwaitingRelease => {
                if !final_bit {
                    return None;
                }
                self.check_delay_restart(ctx);
                self.stop_t200(ctx);
                self.state = State::TeiAssigned;
                Some(DlEvent::ReleaseConfirm)
            }
            State::MultiFrameEstablished | State::TimerRecovery => {
                self.pending_mdl_error = Some(if final_bit { MdlError::B } else { MdlError::E });
                self.establish_data_link(ctx);
                self.l3_initiated = false;
                self.state = State::AwaitingEstablishment;
                None
            }
            _ => None,
        }
    }

    fn handle_frmr(&mut self, ctx: &mut Ctx) -> Option<DlEvent> {
        match self.state {
            State::MultiFrameEstablished | State::TimerRecovery => {
                self.pending_mdl_error = Some(MdlError::K);
                self.establish_data_link(ctx);
                self.l3_initiated = false;
                self.state = State::AwaitingEstablishment;
                None
            }
            _ => None,
        }
    }

    fn handle_s(
        &mut self,
        kind: SFrameKind,
        is_command: bool,
        nr: u8,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        match kind {
            SFrameKind::Rr => self.handle_rr(is_command, nr, poll_final, ctx),
            SFrameKind::Rnr => self.handle_rnr(is_command, nr, poll_final, ctx),
            SFrameKind::Rej => self.handle_rej(is_command, nr, poll_final, ctx),
        }
    }

    fn handle_rr(
        &mut self,
        is_command: bool,
        nr: u8,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        match self.state {
            State::TimerRecovery => self.timer_recovery_rr_rej(is_command, nr, poll_final, ctx),
            State::MultiFrameEstablished => {
                self.peer_rx_busy = false;
                if is_command {
                    if poll_final {
                        self.enquiry_response(ctx);
                    }
                } else if poll_final {
                    self.pending_mdl_error = Some(MdlError::A);
                }
                if !self.n_r_is_valid(nr) {
                    self.n_r_error_recovery(ctx);
                    self.state = State::AwaitingEstablishment;
                } else if nr == self.v_s {
                    self.update_v_a(nr);
                    self.stop_t200(ctx);
                    self.start_t203(ctx);
                } else if nr != self.v_a {
                    self.update_v_a(nr);
                    self.restart_t200(ctx);
                }
                None
            }
            _ => None,
        }
    }

    fn handle_rnr(
        &mut self,
        is_command: bool,
        nr: u8,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        match self.state {
            State::MultiFrameEstablished | State::TimerRecovery => {
                self.peer_rx_busy = true;
                if is_command {
                    if poll_final {
                        self.enquiry_response(ctx);
                    }
                } else if poll_final {
                    self.pending_mdl_error = Some(MdlError::A);
                }
                if !self.n_r_is_valid(nr) {
                    self.n_r_error_recovery(ctx);
                    self.state = State::AwaitingEstablishment;
                } else {
                    self.update_v_a(nr);
                    self.stop_t203(ctx);
                    self.restart_t200(ctx);
                }
                None
            }
            _ => None,
        }
    }

    fn timer_recovery_rr_rej(
        &mut self,
        is_command: bool,
        nr: u8,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        self.peer_rx_busy = false;
        if is_command {
            if poll_final {
                self.enquiry_response(ctx);
            }
            if self.n_r_is_valid(nr) {
                self.update_v_a(nr);
            } else {
                self.n_r_error_recovery(ctx);
                self.state = State::AwaitingEstablishment;
            }
        } else if !poll_final {
            if self.n_r_is_valid(nr) {
                self.update_v_a(nr);
            } else {
                self.n_r_error_recovery(ctx);
                self.state = State::AwaitingEstablishment;
            }
        } else if self.n_r_is_valid(nr) {
            self.update_v_a(nr);
            self.stop_t200(ctx);
            self.start_t203(ctx);
            self.invoke_retransmission(nr, ctx);
            self.state = State::MultiFrameEstablished;
        } else {
            self.n_r_error_recovery(ctx);
            self.state = State::AwaitingEstablishment;
        }
        None
    }

    fn handle_rej(
        &mut self,
        is_command: bool,
        nr: u8,
        poll_final: bool,
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        match self.state {
            State::TimerRecovery => self.timer_recovery_rr_rej(is_command, nr, poll_final, ctx),
            State::MultiFrameEstablished => {
                self.peer_rx_busy = false;
                if is_command {
                    if poll_final {
                        self.enquiry_response(ctx);
                    }
                } else if poll_final {
                    self.pending_mdl_error = Some(MdlError::A);
                }
                if !self.n_r_is_valid(nr) {
                    self.n_r_error_recovery(ctx);
                    self.state = State::AwaitingEstablishment;
                } else {
                    self.update_v_a(nr);
                    self.stop_t200(ctx);
                    self.start_t203(ctx);
                    self.invoke_retransmission(nr, ctx);
                }
                None
            }
            _ => None,
        }
    }

    fn handle_i(
        &mut self,
        ns: u8,
        nr: u8,
        poll: bool,
        payload: &[u8],
        ctx: &mut Ctx,
    ) -> Option<DlEvent> {
        if !matches!(
            self.state,
            State::MultiFrameEstablished | State::TimerRecovery
        ) {
            return None;
        }
        if self.own_rx_busy {
            // RNR path is intentionally not implemented, matching the
            // source's own unfinished `own_rx_busy` branch.
            return None;
        }
        let data_event = if ns == self.v_r {
            self.v_r = add_mod128(self.v_r, 1);
            self.reject_exception = false;
            let event = Some(DlEvent::DataIndication(payload.to_vec()));
            if poll {
                self.send_rr(ctx, true, false);
                self.acknowledge_pending = false;
            } else if !self.acknowledge_pending {
                self.acknowledge_pending = true;
            }
            event
        } else {
            if !self.reject_exception {
                self.reject_exception = true;
                self.send_rej(ctx, poll, false);
            } else if poll {
                self.send_rr(ctx, true, false);
            }
            None
        };
        if !self.n_r_is_valid(nr) {
            self.n_r_error_recovery(ctx);
            self.state = State::AwaitingEstablishment;
            return None;
        }
        if nr == self.v_s {
            self.update_v_a(nr);
            self.stop_t200(ctx);
            self.start_t203(ctx);
        } else if nr != self.v_a {
            self.update_v_a(nr);
            self.restart_t200(ctx);
        }
        data_event
    }

    // ---- timers -----------------------------------------------------------

    pub fn handle_timer(&mut self, kind: TimerKind, ctx: &mut Ctx) -> Option<DlEvent> {
        match kind {
            TimerKind::T200 => self.t200_expire(ctx),
            TimerKind::T203 => self.t203_expire(ctx),
            TimerKind::Restart => self.restart_expire(ctx),
            TimerKind::T202 | TimerKind::T201 | TimerKind::Mdl => None,
        }
    }

    fn t200_expire(&mut self, ctx: &mut Ctx) -> Option<DlEvent> {
        self.t200 = SchedId::NONE;
        match self.state {
            State::MultiFrameEstablished => {
                self.rc = 0;
                self.transmit_enquiry(ctx);
                self.rc += 1;
                self.state = State::TimerRecovery;
                None
            }
            State::TimerRecovery => {
                if self.rc != ctx.cfg.n200 {
                    self.transmit_enquiry(ctx);
                    self.rc += 1;
                    None
                } else {
                    self.pending_mdl_error = Some(MdlError::I);
                    self.establish_data_link(ctx);
                    self.l3_initiated = false;
                    self.state = State::AwaitingEstablishment;
                    Some(DlEvent::DchanDown)
                }
            }
            State::AwaitingEstablishment => {
                if self.rc != ctx.cfg.n200 {
                    self.rc += 1;
                    self.send_sabme(ctx);
                    self.start_t200(ctx);
                    None
                } else {
                    self.check_delay_restart(ctx);
                    self.discard_iqueue();
                    self.pending_mdl_error = Some(MdlError::G);
                    self.state = State::TeiAssigned;
                    Some(DlEvent::ReleaseIndication)
                }
            }
            State::AwaitingRelease => {
                if self.rc != ctx.cfg.n200 {
                    self.rc += 1;
                    self.send_disc(ctx, true);
                    self.start_t200(ctx);
                    None
                } else {
                    self.check_delay_restart(ctx);
                    self.pending_mdl_error = Some(MdlError::H);
                    self.state = State::TeiAssigned;
                    Some(DlEvent::ReleaseConfirm)
                }
            }
            _ => None,
        }
    }

    fn t203_expire(&mut self, ctx: &mut Ctx) -> Option<DlEvent> {
        self.t203 = SchedId::NONE;
        if self.state != State::MultiFrameEstablished {
            return None;
        }
        self.rc = 0;
        self.transmit_enquiry(ctx);
        self.rc += 1;
        self.state = State::TimerRecovery;
        None
    }

    fn restart_expire(&mut self, ctx: &mut Ctx) -> Option<DlEvent> {
        self.restart = SchedId::NONE;
        if self.state != State::TeiAssigned {
            return None;
        }
        self.establish_data_link(ctx);
        self.l3_initiated = false;
        self.state = State::AwaitingEstablishment;
        None
    }

    /// Resolves a deferred MDL-ERROR following the network/CPE/PTP
    /// dispatch. Returns `true` if the caller should now MDL-REMOVE this
    /// link, plus an event to post (PTP raises DCHAN_DOWN on error J).
    pub fn dispatch_mdl_error(
        error: MdlError,
        topology: Topology,
    ) -> (bool, Option<DlEvent>) {
        match topology {
            Topology::Ptp => {
                if error == MdlError::J {
                    (false, Some(DlEvent::DchanDown))
                } else {
                    (false, None)
                }
            }
            Topology::Ptmp => (error.triggers_ptmp_remove(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::L2Persistence;

    /// Wraps a real pool so tests exercise the same `SchedId` allocation
    /// path the controller does, rather than a hand-rolled stand-in.
    struct FakeSched {
        pool: isdn_sched::Pool<TimerKind>,
    }

    impl FakeSched {
        fn new() -> Self {
            FakeSched {
                pool: isdn_sched::Pool::new(),
            }
        }
    }

    impl LinkScheduler for FakeSched {
        fn start(&mut self, kind: TimerKind, delay_ms: u64) -> SchedId {
            self.pool.schedule(delay_ms, kind)
        }

        fn stop(&mut self, id: SchedId) {
            self.pool.cancel(id);
        }
    }

    fn ctx<'a>(
        sched: &'a mut FakeSched,
        cfg: &'a TimerConfig,
        frames_out: &'a mut Vec<Vec<u8>>,
        role: Role,
    ) -> Ctx<'a> {
        Ctx {
            sched,
            cfg,
            now_ms: 0,
            frames_out,
            role,
            l2_persistence: L2Persistence::Default,
        }
    }

    fn pri_link() -> Link {
        Link::new(
            LinkId {
                sapi: 0,
                tei: crate::frame::TEI_PRI,
            },
            State::TeiAssigned,
        )
    }

    #[test]
    fn ptp_establishment_network_side() {
        let mut link = pri_link();
        let cfg = TimerConfig::default();
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        {
            let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);
            // Peer (CPE) sends SABME command with P=1; CPE command bit is 0.
            let ev = link.handle_frame(
                CmdResp::Response,
                &Control::U {
                    kind: UFrameKind::Sabme,
                    poll_final: true,
                    payload: &[],
                },
                &mut c,
            );
            assert_eq!(ev, Some(DlEvent::EstablishIndication));
        }
        assert_eq!(link.state, State::MultiFrameEstablished);
        assert_eq!((link.v_a, link.v_s, link.v_r), (0, 0, 0));
        assert_eq!(frames.len(), 1);
        let decoded = Control::decode(&frames[0][2..]).unwrap();
        assert_eq!(
            decoded,
            Control::U {
                kind: UFrameKind::Ua,
                poll_final: true,
                payload: &[]
            }
        );
    }

    #[test]
    fn iframe_round_trip() {
        let mut link = pri_link();
        link.state = State::MultiFrameEstablished;
        let cfg = TimerConfig::default();
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);

        link.queue_data(vec![0xAA; 12], &mut c);
        assert_eq!(frames.len(), 1);
        assert_eq!(link.v_s, 1);

        let ev = link.handle_frame(
            CmdResp::Response,
            &Control::I {
                ns: 0,
                nr: 1,
                poll: false,
                payload: &[0xBB; 9],
            },
            &mut c,
        );
        assert_eq!(ev, Some(DlEvent::DataIndication(vec![0xBB; 9])));
        assert_eq!(link.v_a, 1);
        assert_eq!(link.v_r, 1);
        assert_eq!(link.v_s, 1);
        assert!(link.t200.is_none());
        assert!(!link.t203.is_none());
    }

    #[test]
    fn rej_retransmits_in_order() {
        let mut link = pri_link();
        link.state = State::MultiFrameEstablished;
        let cfg = TimerConfig::default();
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);

        link.queue_data(vec![1], &mut c);
        link.queue_data(vec![2], &mut c);
        link.queue_data(vec![3], &mut c);
        assert_eq!(link.v_s, 3);
        frames.clear();

        link.handle_frame(
            CmdResp::Response,
            &Control::S {
                kind: SFrameKind::Rej,
                nr: 1,
                poll_final: false,
            },
            &mut c,
        );
        assert_eq!(link.v_a, 1);
        assert_eq!(link.v_s, 3);
        assert_eq!(frames.len(), 2);
        for (i, frame) in frames.iter().enumerate() {
            match Control::decode(&frame[2..]).unwrap() {
                Control::I { ns, .. } => assert_eq!(ns, 1 + i as u8),
                other => panic!("expected I-frame, got {other:?}"),
            }
        }
    }

    #[test]
    fn t200_exhaustion_releases() {
        let mut link = pri_link();
        let cfg = TimerConfig {
            n200: 3,
            ..TimerConfig::default()
        };
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);

        link.queue_data(vec![9], &mut c);
        assert_eq!(link.state, State::AwaitingEstablishment);
        assert_eq!(link.rc, 0);

        link.handle_timer(TimerKind::T200, &mut c);
        assert_eq!(link.rc, 1);
        link.handle_timer(TimerKind::T200, &mut c);
        assert_eq!(link.rc, 2);
        let ev = link.handle_timer(TimerKind::T200, &mut c);
        assert_eq!(ev, None);
        assert_eq!(link.rc, 3);
        assert_eq!(link.state, State::AwaitingEstablishment);
        let ev = link.handle_timer(TimerKind::T200, &mut c);
        assert_eq!(ev, Some(DlEvent::ReleaseIndication));
        assert_eq!(link.state, State::TeiAssigned);
        assert_eq!(link.take_pending_mdl_error(), Some(MdlError::G));
    }

    #[test]
    fn window_never_exceeds_k() {
        let mut link = pri_link();
        link.state = State::MultiFrameEstablished;
        let cfg = TimerConfig {
            k: 2,
            ..TimerConfig::default()
        };
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);
        for i in 0..5u8 {
            link.queue_data(vec![i], &mut c);
        }
        assert!(link.window_len() <= cfg.k);
    }

    #[test]
    fn mdl_remove_from_established_posts_tei_removal() {
        let mut link = pri_link();
        link.state = State::MultiFrameEstablished;
        let cfg = TimerConfig::default();
        let mut sched = FakeSched::new();
        let mut frames = Vec::new();
        let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);
        link.queue_data(vec![1], &mut c);
        let ev = link.mdl_remove(&mut c);
        assert_eq!(ev, Some(DlEvent::TeiRemoval { tei: link.id.tei }));
        assert_eq!(link.state, State::TeiUnassigned);
    }

    proptest::proptest! {
        #[test]
        fn invariant_window_bound_holds_after_arbitrary_sends_and_acks(
            n_queued in 0u8..20,
            acks in proptest::collection::vec(0u8..20, 0..10),
        ) {
            let mut link = pri_link();
            link.state = State::MultiFrameEstablished;
            let cfg = TimerConfig::default();
            let mut sched = FakeSched::new();
            let mut frames = Vec::new();
            let mut c = ctx(&mut sched, &cfg, &mut frames, Role::Network);
            for i in 0..n_queued {
                link.queue_data(vec![i], &mut c);
            }
            for &a in &acks {
                let nr = a % (link.v_s.wrapping_add(1)).max(1);
                if link.n_r_is_valid(nr) {
                    link.update_v_a(nr);
                }
                link.queue_data(vec![0xff], &mut c);
            }
            assert!(link.window_len() <= cfg.k);
        }
    }
}
