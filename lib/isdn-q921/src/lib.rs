//! Q.921 LAPD: frame encoding, the per-(SAPI, TEI) link state machine, and
//! PTMP TEI management.
//!
//! This crate owns everything between "bytes arrived on the D channel" and
//! "a DL-primitive event for the layer above" (normally Q.931). It knows
//! nothing about call control; see `isdn-pri` for the controller that wires
//! a pool of [`link::Link`]s to an [`isdn_sched::Pool`] and a byte-level I/O
//! trait.

pub mod error;
pub mod event;
pub mod frame;
pub mod link;
pub mod tei;
pub mod timer;

pub use error::Error;
pub use event::{DlEvent, MdlError, Role, Topology};
pub use frame::{Address, CmdResp, Control, SFrameKind, UFrameKind};
pub use link::{Ctx, Link, LinkId, State, TeiCheckState};
pub use timer::{L2Persistence, LinkScheduler, TimerConfig, TimerKind};
