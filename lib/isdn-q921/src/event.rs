//! Events a [`Link`][crate::link::Link] hands upward toward Q.931, and the
//! MDL-ERROR letter taxonomy that drives MDL-REMOVE / re-establishment
//! decisions.

use num_derive::{FromPrimitive, ToPrimitive};

/// One of the eleven Q.921 management-sublayer fault indications. Letters
/// follow `q921_mdl_error`'s usage in the source. Discriminants are the
/// letter's 1-based position (A=1..K=11) so a letter can cross into a
/// diagnostic trace entry as a plain wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum MdlError {
    A = 1,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
}

impl MdlError {
    pub fn letter(self) -> char {
        match self {
            MdlError::A => 'A',
            MdlError::B => 'B',
            MdlError::C => 'C',
            MdlError::D => 'D',
            MdlError::E => 'E',
            MdlError::F => 'F',
            MdlError::G => 'G',
            MdlError::H => 'H',
            MdlError::I => 'I',
            MdlError::J => 'J',
            MdlError::K => 'K',
        }
    }

    /// In PTMP (network or CPE) operation, whether this error additionally
    /// triggers MDL-REMOVE of the link, per `q921_mdl_handle_network_error`/
    /// `q921_mdl_handle_cpe_error`.
    pub fn triggers_ptmp_remove(self) -> bool {
        matches!(self, MdlError::C | MdlError::D | MdlError::G | MdlError::H)
    }
}

/// Local vs. network role of this D-channel endpoint, controlling C/R
/// direction and MDL-error disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Network,
    Cpe,
}

/// Point-to-point vs. point-to-multipoint D-channel configuration,
/// controlling both TEI management and MDL-error disposition (PTP raises
/// DCHAN_DOWN on error J instead of ever removing the link).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Ptp,
    Ptmp,
}

/// An event a link hands to the single per-turn event slot, matching the
/// DL-primitives and `PRI_EVENT_*` values the overview describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DlEvent {
    EstablishIndication,
    EstablishConfirm,
    ReleaseIndication,
    ReleaseConfirm,
    DataIndication(Vec<u8>),
    TeiAssigned { tei: u8 },
    TeiRemoval { tei: u8 },
    DchanUp,
    DchanDown,
}
