//! Q.921-plus-ROSE front end for an ISDN PRI/BRI D channel: a [`Controller`]
//! per D channel, multiplexing the link pool, shared timer scheduler, and
//! TEI management state behind a small `ingress`/`run_timers`/`queue_data`
//! surface, with [`config::ControllerConfig`] as its static setup and
//! [`trace::TraceLog`] as its diagnostic record.

pub mod config;
pub mod controller;
pub mod io;
pub mod line;
pub mod trace;

pub use config::{ControllerConfig, DebugFlags, DisplayTimePolicy, FeatureFlags};
pub use controller::{Controller, NfasGroup};
pub use io::{DChannelIo, FakeDChannel};
pub use line::LineBuffer;
pub use trace::{Trace, TraceLog};

pub use isdn_q921::{DlEvent, MdlError, Role, Topology};
pub use isdn_rose::{SwitchFamily, SwitchType};
