//! Static, build-time-style configuration for a [`crate::Controller`].
//!
//! Expressed as a plain struct literal rather than a generated builder:
//! this domain has no `app.toml`/build-script layer to generate one from
//! (unlike `sys/task-config`'s hardware task configs), so a caller
//! constructs a [`ControllerConfig`] directly, the way a test harness
//! constructs any other plain-data config struct.

use bitflags::bitflags;

use isdn_q921::{L2Persistence, Role, TimerConfig, Topology};
use isdn_rose::SwitchType;

bitflags! {
    /// Diagnostic emission mask. Controls which [`crate::trace::Trace`]
    /// categories are recorded; never changes protocol behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DebugFlags: u32 {
        const Q921_STATE  = 0b0000_0001;
        const Q921_DUMP   = 0b0000_0010;
        const APDU        = 0b0000_0100;
        const AOC         = 0b0000_1000;
        const AT_PRI      = 0b0001_0000;
    }
}

bitflags! {
    /// Per-controller feature-enable flags. These are config surface only:
    /// the CC/AOC/transfer FSMs they would gate are Non-goals of this
    /// crate, so enabling a flag here does not turn on behavior this crate
    /// doesn't implement -- it exists so a caller built on top of this
    /// crate (e.g. a future Q.931 layer) can query the same config object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureFlags: u32 {
        const HOLD               = 0b0000_0000_0001;
        const TRANSFER           = 0b0000_0000_0010;
        const REROUTING          = 0b0000_0000_0100;
        const AOC                = 0b0000_0000_1000;
        const MCID               = 0b0000_0001_0000;
        const CALL_COMPLETION    = 0b0000_0010_0000;
        const MANUAL_CONNECT_ACK = 0b0000_0100_0000;
        const HANGUP_FIX         = 0b0000_1000_0000;
        const SERVICE_MESSAGE    = 0b0001_0000_0000;
        const OVERLAP_DIALING    = 0b0010_0000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTimePolicy {
    Never,
    OnSetup,
    Always,
}

/// Everything [`crate::Controller::new`] needs that isn't per-call state.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub switch_type: SwitchType,
    pub local_role: Role,
    pub remote_role: Role,
    pub bri: bool,
    pub topology: Topology,
    pub l2_persistence: L2Persistence,
    pub display_time_policy: DisplayTimePolicy,
    pub features: FeatureFlags,
    pub debug: DebugFlags,
    pub timers: TimerConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            switch_type: SwitchType::Unknown,
            local_role: Role::Cpe,
            remote_role: Role::Network,
            bri: false,
            topology: Topology::Ptp,
            l2_persistence: L2Persistence::Default,
            display_time_policy: DisplayTimePolicy::Never,
            features: FeatureFlags::empty(),
            debug: DebugFlags::empty(),
            timers: TimerConfig::default(),
        }
    }
}
