//! Timer identities and defaults for the Q.921 link state machine.
//!
//! The controller owns the actual [`isdn_sched::Pool`]; a [`Link`][crate::link::Link]
//! only ever talks to a [`LinkScheduler`], which the controller implements by
//! wrapping its pool and tagging every scheduled callback with this link's
//! [`crate::link::LinkId`] so the controller can route an expiry back to the
//! right link without the link needing to know its own index.

use isdn_sched::SchedId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Retransmission timer: SABME/DISC retry, or enquiry retry in
    /// TIMER_RECOVERY.
    T200,
    /// Idle-link polling timer, running whenever T200 is not.
    T203,
    /// PTMP TE-side TEI request retry timer.
    T202,
    /// PTMP NT-side TEI identity check poll timer.
    T201,
    /// Layer-2-persistence `KEEP_UP` re-establishment delay.
    Restart,
    /// Zero-delay deferred MDL-ERROR action (see `pending_mdl_error`
    /// doc on `Link`; kept as a named timer kind for parity with the
    /// source's scheduled callback, even though the reimplementation
    /// resolves it as a plain end-of-turn field instead of rescheduling).
    Mdl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub t200_ms: u64,
    pub t203_ms: u64,
    pub t202_ms: u64,
    pub t201_ms: u64,
    pub n200: u32,
    pub n202: u32,
    /// Window size K: maximum number of unacknowledged outstanding I-frames.
    pub k: u8,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            t200_ms: 1000,
            t203_ms: 10_000,
            t202_ms: 2000,
            t201_ms: 1000,
            n200: 3,
            n202: 3,
            k: 7,
        }
    }
}

/// What a [`Link`][crate::link::Link] uses to arm/disarm its own timers,
/// implemented by the controller so it can multiplex many links over one
/// [`isdn_sched::Pool`].
pub trait LinkScheduler {
    fn start(&mut self, kind: TimerKind, delay_ms: u64) -> SchedId;
    fn stop(&mut self, id: SchedId);
}

/// Layer-2 persistence policy for a PTP link once it drops to TEI_ASSIGNED,
/// mirroring libpri's `PRI_L2_PERSISTENCE_*` knob: either leave the link
/// down until the upper layer asks for it again, or keep re-attempting
/// SABME on a delay.
///
/// `Default` and `LeaveDown` are distinct config values a caller can select
/// between (matching `enum pri_layer2_persistence`), but -- as in the
/// source, where every `l2_persistence ==`/`!=` check in `q921.c` only ever
/// special-cases `KEEP_UP` -- they drive identical behavior at this layer;
/// the distinction is meaningful to a caller above Q.921 that decides
/// whether to proactively re-request establishment itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2Persistence {
    /// Re-establish only when the upper layer queues new data.
    Default,
    /// Re-arm the `Restart` timer on every teardown to keep retrying.
    KeepUp,
    /// Leave layer 2 down if the peer brings it down; never re-request
    /// automatically.
    LeaveDown,
}
