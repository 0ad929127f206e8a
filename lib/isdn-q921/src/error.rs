use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Fewer octets than the minimum two-octet address plus one control
    /// octet were present.
    ShortFrame,
    /// An EA bit was not in the position the two-octet address format
    /// requires (EA1=0, EA2=1).
    BadExtendedAddress,
    /// The control octet's frame-type bits didn't match I/S/U.
    UnknownFrameType,
    /// A U-format frame's modifier bits didn't match any of
    /// SABME/UA/DISC/DM/FRMR/UI.
    UnknownUFrame,
    /// An S-format frame's `ss` bits didn't match RR/RNR/REJ.
    UnknownSFrame,
    /// A TEI-management (SAPI 63) frame was too short or had an
    /// unrecognized management-entity or message-type octet.
    MalformedTeiManagement,
    /// No TEI pool slot is free for a new PTMP terminal.
    TeiPoolExhausted,
    /// The scheduler has no free slot left for a new timer.
    SchedulerExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShortFrame => write!(f, "frame shorter than minimum header"),
            Error::BadExtendedAddress => write!(f, "EA bits not in two-octet address form"),
            Error::UnknownFrameType => write!(f, "control octet frame-type bits unrecognized"),
            Error::UnknownUFrame => write!(f, "unrecognized U-frame modifier bits"),
            Error::UnknownSFrame => write!(f, "unrecognized S-frame ss bits"),
            Error::MalformedTeiManagement => write!(f, "malformed TEI management frame"),
            Error::TeiPoolExhausted => write!(f, "no free TEI in auto-assignment range"),
            Error::SchedulerExhausted => write!(f, "timer pool at capacity"),
        }
    }
}
