use num_derive::{FromPrimitive, ToPrimitive};

/// Which signaling variant a controller speaks, selecting both the Q.931
/// message quirks (not this crate's concern) and which ROSE operation
/// table applies to a Facility component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SwitchType {
    Unknown = 0,
    Ni2 = 1,
    Dms100 = 2,
    Lucent5e = 3,
    Att4ess = 4,
    EuroIsdnE1 = 5,
    EuroIsdnT1 = 6,
    Ni1 = 7,
    Gr303Eoc = 8,
    Gr303Tmc = 9,
    Qsig = 10,
}

impl SwitchType {
    /// The operation table family this switchtype dispatches through.
    /// Several switchtypes share the ETSI table; NI2/DMS100/Lucent5E/ATT4ESS
    /// share the "other" (National ISDN / proprietary) table.
    pub fn family(self) -> SwitchFamily {
        match self {
            SwitchType::EuroIsdnE1 | SwitchType::EuroIsdnT1 => SwitchFamily::Etsi,
            SwitchType::Qsig => SwitchFamily::Qsig,
            SwitchType::Ni2
            | SwitchType::Dms100
            | SwitchType::Lucent5e
            | SwitchType::Att4ess
            | SwitchType::Ni1 => SwitchFamily::Other,
            SwitchType::Unknown | SwitchType::Gr303Eoc | SwitchType::Gr303Tmc => {
                SwitchFamily::None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchFamily {
    Etsi,
    Qsig,
    Other,
    None,
}
