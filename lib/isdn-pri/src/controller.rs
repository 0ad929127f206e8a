//! The controller: one per D channel. Owns the link pool, the shared
//! timer scheduler, TEI management state, and the diagnostic trace/line
//! buffers, and is the thing an upstream caller drives with received
//! octets and upper-layer requests.

use isdn_q921::frame::{SAPI_CALL_CTRL, SAPI_LAYER2_MANAGEMENT, TEI_GROUP};
use isdn_q921::link::TeiCheckState;
use isdn_q921::tei::{self, CheckResponseAction, T202Outcome, TeRequest, TeiMessage, TeiPool};
use isdn_q921::{
    Address, Control, Ctx, DlEvent, Link, LinkId, LinkScheduler, Role, State, TimerKind, Topology,
};
use isdn_sched::{Pool, SchedId};

use crate::config::ControllerConfig;
use crate::io::DChannelIo;
use crate::line::LineBuffer;
use crate::trace::{Trace, TraceLog};

/// Capacity of a controller's trace log. Sized like a typical `ringbuf!`
/// instance for a moderately chatty subsystem.
const TRACE_CAPACITY: usize = 64;

/// Number of T201 polls a PTMP NT-side dead-TEI check runs before sweeping
/// unresponsive TEIs, matching `Q921_TEI_CHECK_MAX_POLLS`.
const TEI_CHECK_MAX_POLLS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    /// A link-owned timer (T200/T203/restart), routed back by index.
    Link { link_index: usize, kind: TimerKind },
    /// PTMP TE-side TEI request retry (T202).
    TeRequest,
    /// PTMP NT-side dead-TEI check poll (T201).
    TeiCheck,
}

/// Adapts one controller's [`isdn_sched::Pool`] into the per-link
/// [`LinkScheduler`] a [`Ctx`] expects, tagging every scheduled timer with
/// the owning link's index so a firing can be routed back.
struct LinkSchedAdapter<'a> {
    pool: &'a mut Pool<Timer>,
    link_index: usize,
    now_ms: u64,
}

impl<'a> LinkScheduler for LinkSchedAdapter<'a> {
    fn start(&mut self, kind: TimerKind, delay_ms: u64) -> SchedId {
        self.pool.schedule(
            self.now_ms + delay_ms,
            Timer::Link {
                link_index: self.link_index,
                kind,
            },
        )
    }

    fn stop(&mut self, id: SchedId) {
        self.pool.cancel(id);
    }
}

pub struct Controller {
    pub cfg: ControllerConfig,
    links: Vec<Link>,
    sched: Pool<Timer>,
    pub trace: TraceLog<TRACE_CAPACITY>,
    pub line: LineBuffer,
    call_ref_counter: u16,
    last_invoke_id: u8,
    tei_pool: TeiPool,
    te_request: TeRequest,
    te_request_timer: SchedId,
    tei_check_timer: SchedId,
    /// Which poll of a dead-TEI check is outstanding: 0 = none running,
    /// 1 = first CHECK_REQUEST sent, 2 = second sent (see
    /// [`Controller::trigger_tei_check`]/[`Controller::tei_check_expire`]).
    tei_check_poll: u8,
    /// xorshift16 state seeding this controller's `ri` generation. The
    /// source draws `ri` from `random()`; this crate has no RNG dependency
    /// in its workspace stack (see DESIGN.md), so a small deterministic
    /// generator stands in -- it only needs to avoid repeating the same
    /// value across consecutive requests, not to be cryptographically
    /// unpredictable.
    ri_state: u16,
}

impl Controller {
    pub fn new(cfg: ControllerConfig) -> Self {
        let mut links = Vec::new();
        if cfg.topology == Topology::Ptp {
            links.push(Link::new(
                LinkId {
                    sapi: SAPI_CALL_CTRL,
                    tei: isdn_q921::frame::TEI_PRI,
                },
                State::TeiAssigned,
            ));
        }
        Controller {
            cfg,
            links,
            sched: Pool::new(),
            trace: TraceLog::new(),
            line: LineBuffer::new(),
            call_ref_counter: 0,
            last_invoke_id: 0,
            tei_pool: TeiPool::new(),
            te_request: TeRequest::default(),
            te_request_timer: SchedId::NONE,
            tei_check_timer: SchedId::NONE,
            tei_check_poll: 0,
            ri_state: 0xACE1,
        }
    }

    /// Next pseudo-random `ri` value (see `ri_state` doc comment).
    fn next_ri(&mut self) -> u16 {
        let mut x = self.ri_state;
        x ^= x << 7;
        x ^= x >> 9;
        x ^= x << 8;
        if x == 0 {
            x = 0xACE1;
        }
        self.ri_state = x;
        x
    }

    fn link_index(&self, sapi: u8, tei: u8) -> Option<usize> {
        self.links
            .iter()
            .position(|l| l.id.sapi == sapi && l.id.tei == tei)
    }

    fn with_ctx<R>(
        &mut self,
        idx: usize,
        now_ms: u64,
        f: impl FnOnce(&mut Link, &mut Ctx) -> R,
    ) -> (R, Vec<Vec<u8>>) {
        let mut frames_out = Vec::new();
        let result = {
            let mut adapter = LinkSchedAdapter {
                pool: &mut self.sched,
                link_index: idx,
                now_ms,
            };
            let mut ctx = Ctx {
                sched: &mut adapter,
                cfg: &self.cfg.timers,
                now_ms,
                frames_out: &mut frames_out,
                role: self.cfg.local_role,
                l2_persistence: self.cfg.l2_persistence,
            };
            f(&mut self.links[idx], &mut ctx)
        };
        (result, frames_out)
    }

    fn drain_frames(&mut self, idx: usize, frames: Vec<Vec<u8>>, io: &mut impl DChannelIo) {
        let (sapi, tei) = (self.links[idx].id.sapi, self.links[idx].id.tei);
        for f in frames {
            self.trace.record(Trace::FrameOut {
                sapi,
                tei,
                len: f.len() as u16,
            });
            io.send(&f);
        }
    }

    /// Resolves whatever [`isdn_q921::MdlError`] the link deferred during
    /// the last frame/timer handling, following the network/CPE/PTP dispatch
    /// (PTP raises DCHAN_DOWN only on error J; PTMP removes the link on
    /// C/D/G/H). Stands in for the source's zero-delay scheduled callback.
    fn resolve_mdl_error(&mut self, idx: usize, now_ms: u64) -> Option<DlEvent> {
        let err = self.links[idx].take_pending_mdl_error()?;
        let tei = self.links[idx].id.tei;
        self.trace.record(Trace::MdlError { tei, error: err });
        let (remove, event) = Link::dispatch_mdl_error(err, self.cfg.topology);
        if remove {
            let (removal_event, _frames) =
                self.with_ctx(idx, now_ms, |link, ctx| link.mdl_remove(ctx));
            if let Some(DlEvent::TeiRemoval { tei }) = removal_event {
                self.trace.record(Trace::TeiRemoved { tei });
            }
            return removal_event.or(event);
        }
        event
    }

    fn ingress_frame(&mut self, frame: &[u8], io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        let (addr, rest) = match Address::decode(frame) {
            Ok(v) => v,
            Err(_) => {
                self.trace.record(Trace::ParseError);
                return None;
            }
        };
        if addr.sapi == SAPI_LAYER2_MANAGEMENT {
            return self.ingress_tei_management(rest, io, now_ms);
        }
        let control = match Control::decode(rest) {
            Ok(c) => c,
            Err(_) => {
                self.trace.record(Trace::ParseError);
                return None;
            }
        };
        let idx = self.link_index(addr.sapi, addr.tei)?;
        self.trace.record(Trace::FrameIn {
            sapi: addr.sapi,
            tei: addr.tei,
            len: frame.len() as u16,
        });
        let (event, frames_out) =
            self.with_ctx(idx, now_ms, |link, ctx| link.handle_frame(addr.cr, &control, ctx));
        self.drain_frames(idx, frames_out, io);
        event.or_else(|| self.resolve_mdl_error(idx, now_ms))
    }

    /// NT-side TEI allocation and TE-side TEI assignment, grounded in
    /// `q921_receive_MDL`. Full T201/T202 retry-timer orchestration is not
    /// wired through [`Controller::run_timers`] (see DESIGN.md); this
    /// handles the request/assign exchange itself.
    fn ingress_tei_management(
        &mut self,
        payload: &[u8],
        io: &mut impl DChannelIo,
        now_ms: u64,
    ) -> Option<DlEvent> {
        // `payload` still has the one-octet UI control field in front of
        // the management entity bytes `decode_tei_frame` expects.
        let payload = payload.get(1..).unwrap_or(&[]);
        let frame = match tei::decode_tei_frame(payload) {
            Ok(f) => f,
            Err(_) => {
                self.trace.record(Trace::ParseError);
                return None;
            }
        };
        match (self.cfg.local_role, frame.message) {
            (Role::Network, TeiMessage::Request) => {
                if frame.ai != TEI_GROUP {
                    io.send(&tei::encode_tei_frame(
                        Role::Network,
                        TeiMessage::Denied,
                        frame.ri,
                        frame.ai,
                    ));
                    return None;
                }
                if self.tei_pool.is_full() {
                    self.trigger_tei_check(io, now_ms);
                }
                let new_tei = match self.tei_pool.allocate() {
                    Ok(t) => t,
                    Err(_) => {
                        io.send(&tei::encode_tei_frame(
                            Role::Network,
                            TeiMessage::Denied,
                            frame.ri,
                            TEI_GROUP,
                        ));
                        return None;
                    }
                };
                self.links.push(Link::new(
                    LinkId {
                        sapi: SAPI_CALL_CTRL,
                        tei: new_tei,
                    },
                    State::TeiAssigned,
                ));
                io.send(&tei::encode_tei_frame(
                    Role::Network,
                    TeiMessage::Assigned,
                    frame.ri,
                    new_tei,
                ));
                self.trace.record(Trace::TeiAssigned { tei: new_tei });
                if self.tei_pool.is_full() {
                    self.trigger_tei_check(io, now_ms);
                }
                None
            }
            (Role::Network, TeiMessage::CheckResponse) => {
                let idx = self.link_index(SAPI_CALL_CTRL, frame.ai)?;
                let (new_state, action) = tei::record_check_response(self.links[idx].tei_check);
                self.links[idx].tei_check = new_state;
                if action == CheckResponseAction::DuplicateRemove {
                    self.remove_tei(idx, io, now_ms);
                }
                None
            }
            (Role::Cpe, TeiMessage::Assigned) => {
                if frame.ri != self.te_request.ri {
                    return None;
                }
                self.sched.cancel(self.te_request_timer);
                self.te_request_timer = SchedId::NONE;
                let tei = frame.ai;
                self.links.push(Link::new(
                    LinkId {
                        sapi: SAPI_CALL_CTRL,
                        tei,
                    },
                    State::TeiAssigned,
                ));
                self.trace.record(Trace::TeiAssigned { tei });
                Some(DlEvent::TeiAssigned { tei })
            }
            (Role::Cpe, TeiMessage::CheckRequest) => {
                let our_tei = self.links.iter().find_map(|l| {
                    (l.id.sapi == SAPI_CALL_CTRL).then_some(l.id.tei)
                })?;
                if frame.ai != TEI_GROUP && frame.ai != our_tei {
                    return None;
                }
                let ri = self.next_ri();
                io.send(&tei::encode_tei_frame(
                    Role::Cpe,
                    TeiMessage::CheckResponse,
                    ri,
                    our_tei,
                ));
                None
            }
            (Role::Cpe, TeiMessage::Remove) => {
                let idx = self
                    .links
                    .iter()
                    .position(|l| l.id.sapi == SAPI_CALL_CTRL && (frame.ai == TEI_GROUP || l.id.tei == frame.ai))?;
                self.links.remove(idx);
                let ri = self.next_ri();
                self.te_request.start(ri);
                io.send(&tei::encode_tei_frame(Role::Cpe, TeiMessage::Request, ri, TEI_GROUP));
                self.te_request_timer = self.sched.schedule(now_ms + self.cfg.timers.t202_ms, Timer::TeRequest);
                None
            }
            _ => None,
        }
    }

    /// NT-side: start (or restart) a dead-TEI check poll. Marks every
    /// currently-assigned link DEAD, sends a CHECK_REQUEST to the group,
    /// and arms T201 -- matching the first poll of `q921_start_tei_check`.
    fn trigger_tei_check(&mut self, io: &mut impl DChannelIo, now_ms: u64) {
        for link in self.links.iter_mut() {
            link.tei_check = TeiCheckState::Dead;
        }
        let ri = self.next_ri();
        io.send(&tei::encode_tei_frame(Role::Network, TeiMessage::CheckRequest, ri, TEI_GROUP));
        self.tei_check_poll = 1;
        self.sched.cancel(self.tei_check_timer);
        self.tei_check_timer = self.sched.schedule(now_ms + self.cfg.timers.t201_ms, Timer::TeiCheck);
    }

    /// NT-side T201 expiry: runs the second poll round, then on the final
    /// expiry sweeps every TEI that never responded.
    fn tei_check_expire(&mut self, io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        self.tei_check_timer = SchedId::NONE;
        match self.tei_check_poll {
            1 => {
                let states = self
                    .links
                    .iter()
                    .map(|l| (l.id.tei, l.tei_check));
                let advanced = tei::advance_check_round(states, false);
                for (tei, state) in advanced {
                    if let Some(idx) = self.link_index(SAPI_CALL_CTRL, tei) {
                        self.links[idx].tei_check = state;
                    }
                }
                let ri = self.next_ri();
                io.send(&tei::encode_tei_frame(Role::Network, TeiMessage::CheckRequest, ri, TEI_GROUP));
                self.tei_check_poll = TEI_CHECK_MAX_POLLS;
                self.tei_check_timer = self.sched.schedule(now_ms + self.cfg.timers.t201_ms, Timer::TeiCheck);
                None
            }
            _ => {
                self.tei_check_poll = 0;
                let dead: Vec<usize> = self
                    .links
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| tei::is_unresponsive(l.tei_check))
                    .map(|(i, _)| i)
                    .collect();
                let mut event = None;
                for idx in dead.into_iter().rev() {
                    if let Some(ev) = self.remove_tei(idx, io, now_ms) {
                        event = event.or(Some(ev));
                    }
                }
                event
            }
        }
    }

    /// MDL-REMOVEs the link at `idx` and drops it from the pool, mirroring
    /// what a dead-TEI sweep or a duplicate-reply detection both need to do.
    fn remove_tei(&mut self, idx: usize, io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        let tei = self.links[idx].id.tei;
        let (event, frames_out) = self.with_ctx(idx, now_ms, |link, ctx| link.mdl_remove(ctx));
        self.drain_frames(idx, frames_out, io);
        self.links.remove(idx);
        self.tei_pool.release(tei);
        self.trace.record(Trace::TeiRemoved { tei });
        event
    }

    /// TE-side T202 expiry: retry the TEI request up to N202 times (or
    /// forever under KEEP_UP persistence), per `t202_expire`.
    fn te_request_expire(&mut self, io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        self.te_request_timer = SchedId::NONE;
        let next_ri = self.next_ri();
        match self
            .te_request
            .on_t202_expire(&self.cfg.timers, self.cfg.l2_persistence, next_ri)
        {
            T202Outcome::Retry { ri } => {
                io.send(&tei::encode_tei_frame(Role::Cpe, TeiMessage::Request, ri, TEI_GROUP));
                self.te_request_timer =
                    self.sched.schedule(now_ms + self.cfg.timers.t202_ms, Timer::TeRequest);
                None
            }
            T202Outcome::GiveUp => None,
        }
    }

    /// Drains every queued inbound frame, stopping at (and returning) the
    /// first [`DlEvent`] one of them produces; remaining queued frames
    /// stay for the next call. Approximates the single-event-per-turn
    /// discipline at the multi-frame level (see DESIGN.md).
    pub fn ingress(&mut self, io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        while let Some(frame) = io.recv() {
            if let Some(ev) = self.ingress_frame(&frame, io, now_ms) {
                return Some(ev);
            }
        }
        None
    }

    /// Runs every timer due at `now_ms`, one firing per call (see
    /// DESIGN.md on why this collapses `isdn_sched::Pool::run_ready`'s
    /// internal multi-firing scan into one firing at a time), returning
    /// the first event produced, if any.
    pub fn run_timers(&mut self, io: &mut impl DChannelIo, now_ms: u64) -> Option<DlEvent> {
        match self.sched.run_ready(now_ms, Some)? {
            Timer::Link { link_index, kind } => {
                if link_index >= self.links.len() {
                    return None;
                }
                let (event, frames_out) =
                    self.with_ctx(link_index, now_ms, |link, ctx| link.handle_timer(kind, ctx));
                self.drain_frames(link_index, frames_out, io);
                event.or_else(|| self.resolve_mdl_error(link_index, now_ms))
            }
            Timer::TeRequest => self.te_request_expire(io, now_ms),
            Timer::TeiCheck => self.tei_check_expire(io, now_ms),
        }
    }

    /// DL-DATA request: queue a Q.931 frame on the named link.
    pub fn queue_data(&mut self, sapi: u8, tei: u8, payload: Vec<u8>, io: &mut impl DChannelIo, now_ms: u64) {
        let idx = match self.link_index(sapi, tei) {
            Some(i) => i,
            None => return,
        };
        let (_, frames_out) = self.with_ctx(idx, now_ms, |link, ctx| link.queue_data(payload, ctx));
        self.drain_frames(idx, frames_out, io);
    }

    /// Startup, matching `q921_start`. PTP unconditionally sends SABME on
    /// both ends; PTMP CPE begins a TEI request (`initial_ri` stands in
    /// for the source's `random() % 65535`, since this crate does not
    /// depend on a RNG crate); PTMP NT just waits for REQUEST messages.
    pub fn start(&mut self, io: &mut impl DChannelIo, now_ms: u64, initial_ri: u16) {
        match self.cfg.topology {
            Topology::Ptp => {
                let (_, frames_out) = self.with_ctx(0, now_ms, |link, ctx| link.start_ptp(ctx));
                self.drain_frames(0, frames_out, io);
            }
            Topology::Ptmp => {
                if self.cfg.local_role == Role::Cpe {
                    self.te_request.start(initial_ri);
                    io.send(&tei::encode_tei_frame(
                        Role::Cpe,
                        TeiMessage::Request,
                        self.te_request.ri,
                        TEI_GROUP,
                    ));
                    self.te_request_timer =
                        self.sched.schedule(now_ms + self.cfg.timers.t202_ms, Timer::TeRequest);
                }
            }
        }
    }

    pub fn next_deadline(&mut self) -> Option<u64> {
        self.sched.next_deadline()
    }

    pub fn next_call_reference(&mut self) -> u16 {
        self.call_ref_counter = self.call_ref_counter.wrapping_add(1);
        self.call_ref_counter
    }

    pub fn next_invoke_id(&mut self) -> u8 {
        self.last_invoke_id = self.last_invoke_id.wrapping_add(1);
        self.last_invoke_id
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_state(&self, sapi: u8, tei: u8) -> Option<State> {
        self.link_index(sapi, tei).map(|i| self.links[i].state)
    }
}

/// An NFAS (Non-Facility Associated Signaling) group: one master D-channel
/// controller and its slaves. `isdn_sched::Pool`s draw disjoint id ranges
/// per-process, so [`isdn_sched::cancel_in_chain`] can walk every member's
/// pool to find whichever one owns a given timer id -- the Rust stand-in
/// for the source's singly-linked `struct pri` chain of raw pointers.
pub struct NfasGroup {
    pub controllers: Vec<Controller>,
}

impl NfasGroup {
    pub fn new(controllers: Vec<Controller>) -> Self {
        NfasGroup { controllers }
    }

    pub fn cancel_anywhere(&mut self, id: SchedId) -> bool {
        isdn_sched::cancel_in_chain(self.controllers.iter_mut().map(|c| &mut c.sched), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::io::FakeDChannel;
    use isdn_q921::Control as WireControl;
    use isdn_q921::{CmdResp, UFrameKind};

    fn ptp_pair() -> (Controller, Controller) {
        let network_cfg = ControllerConfig {
            local_role: Role::Network,
            remote_role: Role::Cpe,
            topology: Topology::Ptp,
            ..ControllerConfig::default()
        };
        let cpe_cfg = ControllerConfig {
            local_role: Role::Cpe,
            remote_role: Role::Network,
            topology: Topology::Ptp,
            ..ControllerConfig::default()
        };
        (Controller::new(network_cfg), Controller::new(cpe_cfg))
    }

    #[test]
    fn ptp_establishment_between_two_controllers() {
        let (mut network, mut cpe) = ptp_pair();
        let mut net_io = FakeDChannel::new();
        let mut cpe_io = FakeDChannel::new();

        network.start(&mut net_io, 0, 0);
        let sabme_frames = net_io.take_outbound();
        assert_eq!(sabme_frames.len(), 1);

        for f in sabme_frames {
            cpe_io.deliver(f);
        }
        let event = cpe.ingress(&mut cpe_io, 0);
        assert_eq!(event, Some(DlEvent::EstablishIndication));

        let ua_frames = cpe_io.take_outbound();
        assert_eq!(ua_frames.len(), 1);
        for f in ua_frames {
            net_io.deliver(f);
        }
        let event = network.ingress(&mut net_io, 0);
        assert_eq!(event, Some(DlEvent::EstablishConfirm));

        assert_eq!(
            network.link_state(SAPI_CALL_CTRL, isdn_q921::frame::TEI_PRI),
            Some(State::MultiFrameEstablished)
        );
        assert_eq!(
            cpe.link_state(SAPI_CALL_CTRL, isdn_q921::frame::TEI_PRI),
            Some(State::MultiFrameEstablished)
        );
    }

    #[test]
    fn nt_allocates_tei_for_request() {
        let nt_cfg = ControllerConfig {
            local_role: Role::Network,
            remote_role: Role::Cpe,
            topology: Topology::Ptmp,
            ..ControllerConfig::default()
        };
        let mut nt = Controller::new(nt_cfg);
        let mut io = FakeDChannel::new();

        let request = tei::encode_tei_frame(Role::Cpe, TeiMessage::Request, 0xABCD, TEI_GROUP);
        io.deliver(request);
        assert!(nt.ingress(&mut io, 0).is_none());

        let sent = io.take_outbound();
        assert_eq!(sent.len(), 1);
        let (addr, rest) = Address::decode(&sent[0]).unwrap();
        assert_eq!(addr.sapi, SAPI_LAYER2_MANAGEMENT);
        let _ = WireControl::decode(rest).unwrap();
        assert_eq!(nt.link_count(), 1);
    }

    #[test]
    fn unknown_control_octet_is_dropped_without_panicking() {
        let (mut network, _) = ptp_pair();
        let mut io = FakeDChannel::new();
        io.deliver(vec![0x02, 0x01, 0xff, 0xff, 0xff]);
        assert_eq!(network.ingress(&mut io, 0), None);
    }

    #[test]
    fn sabme_command_bit_matches_network_role() {
        let (mut network, _) = ptp_pair();
        let mut io = FakeDChannel::new();
        network.start(&mut io, 0, 0);
        let frames = io.take_outbound();
        let (addr, rest) = Address::decode(&frames[0]).unwrap();
        assert_eq!(addr.cr, CmdResp::Command);
        match WireControl::decode(rest).unwrap() {
            WireControl::U { kind, .. } => assert_eq!(kind, UFrameKind::Sabme),
            other => panic!("expected U frame, got {other:?}"),
        }
    }
}
