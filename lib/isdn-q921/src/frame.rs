//! Q.921 frame header: the two address octets common to every frame plus
//! the U/S/I control field variants, bit-exact with `pri_q921.h`'s
//! little-endian bitfield layout (`ea1`/`c_r`/`sapi` in octet 1,
//! `ea2`/`tei` in octet 2).
//!
//! `zerocopy` doesn't model C bitfields, so each octet is decomposed into
//! whole-byte accessors instead of a derived struct, the way
//! `host-sp-messages` keeps wire layout manual wherever a derive can't
//! express it directly.

use crate::Error;

pub const SAPI_CALL_CTRL: u8 = 0;
pub const SAPI_LAYER2_MANAGEMENT: u8 = 63;

pub const TEI_PRI: u8 = 0;
pub const TEI_GROUP: u8 = 127;
pub const TEI_AUTO_FIRST: u8 = 64;
pub const TEI_AUTO_LAST: u8 = 126;

const FT_MASK: u8 = 0x3;
const FT_I: u8 = 0x0;
const FT_S: u8 = 0x1;
const FT_U: u8 = 0x3;

/// Command/response direction, independent of which role sent the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdResp {
    Command,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub sapi: u8,
    pub cr: CmdResp,
    pub tei: u8,
}

impl Address {
    pub fn decode(buf: &[u8]) -> Result<(Address, &[u8]), Error> {
        if buf.len() < 2 {
            return Err(Error::ShortFrame);
        }
        let (octet1, octet2) = (buf[0], buf[1]);
        if octet1 & 0x01 != 0 {
            return Err(Error::BadExtendedAddress);
        }
        if octet2 & 0x01 != 1 {
            return Err(Error::BadExtendedAddress);
        }
        let sapi = octet1 >> 2;
        let cr = if octet1 & 0x02 != 0 {
            CmdResp::Command
        } else {
            CmdResp::Response
        };
        // `cr` above only tells us the raw bit; callers translate it to
        // command/response using their own role (see `Address::is_command`).
        let tei = octet2 >> 1;
        Ok((Address { sapi, cr, tei }, &buf[2..]))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        let cr_bit = matches!(self.cr, CmdResp::Command) as u8;
        out.push((self.sapi << 2) | (cr_bit << 1));
        out.push((self.tei << 1) | 0x01);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UFrameKind {
    Sabme,
    Ua,
    Disc,
    Dm,
    Frmr,
    Ui,
}

impl UFrameKind {
    /// `(m3, m2)` modifier bits as laid out in the control octet, MSB-first.
    fn modifiers(self) -> (u8, u8) {
        match self {
            UFrameKind::Sabme => (0b011, 0b11),
            UFrameKind::Ua => (0b011, 0b00),
            UFrameKind::Disc => (0b010, 0b00),
            UFrameKind::Dm => (0b000, 0b11),
            UFrameKind::Frmr => (0b100, 0b01),
            UFrameKind::Ui => (0b000, 0b00),
        }
    }

    fn from_modifiers(m3: u8, m2: u8) -> Option<Self> {
        Some(match (m3, m2) {
            (0b011, 0b11) => UFrameKind::Sabme,
            (0b011, 0b00) => UFrameKind::Ua,
            (0b010, 0b00) => UFrameKind::Disc,
            (0b000, 0b11) => UFrameKind::Dm,
            (0b100, 0b01) => UFrameKind::Frmr,
            (0b000, 0b00) => UFrameKind::Ui,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SFrameKind {
    Rr,
    Rnr,
    Rej,
}

impl SFrameKind {
    fn ss(self) -> u8 {
        match self {
            SFrameKind::Rr => 0b00,
            SFrameKind::Rnr => 0b01,
            SFrameKind::Rej => 0b10,
        }
    }

    fn from_ss(ss: u8) -> Option<Self> {
        Some(match ss {
            0b00 => SFrameKind::Rr,
            0b01 => SFrameKind::Rnr,
            0b10 => SFrameKind::Rej,
            _ => return None,
        })
    }
}

/// A fully decoded control field (address already stripped) plus whatever
/// payload followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control<'a> {
    I {
        ns: u8,
        nr: u8,
        poll: bool,
        payload: &'a [u8],
    },
    S {
        kind: SFrameKind,
        nr: u8,
        poll_final: bool,
    },
    U {
        kind: UFrameKind,
        poll_final: bool,
        payload: &'a [u8],
    },
}

impl<'a> Control<'a> {
    pub fn decode(buf: &'a [u8]) -> Result<Self, Error> {
        let first = *buf.first().ok_or(Error::ShortFrame)?;
        match first & FT_MASK {
            FT_I => {
                if buf.len() < 2 {
                    return Err(Error::ShortFrame);
                }
                let ns = first >> 1;
                let nr = buf[1] >> 1;
                let poll = buf[1] & 0x01 != 0;
                Ok(Control::I {
                    ns,
                    nr,
                    poll,
                    payload: &buf[2..],
                })
            }
            FT_U => {
                let m2 = (first >> 2) & 0x3;
                let poll_final = first & 0x10 != 0;
                let m3 = first >> 5;
                let kind = UFrameKind::from_modifiers(m3, m2).ok_or(Error::UnknownUFrame)?;
                Ok(Control::U {
                    kind,
                    poll_final,
                    payload: &buf[1..],
                })
            }
            _ if first & FT_MASK == FT_S => {
                if buf.len() < 2 {
                    return Err(Error::ShortFrame);
                }
                let ss = (first >> 2) & 0x3;
                let kind = SFrameKind::from_ss(ss).ok_or(Error::UnknownSFrame)?;
                let nr = buf[1] >> 1;
                let poll_final = buf[1] & 0x01 != 0;
                Ok(Control::S {
                    kind,
                    nr,
                    poll_final,
                })
            }
            _ => Err(Error::UnknownFrameType),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Control::I {
                ns,
                nr,
                poll,
                payload,
            } => {
                out.push((*ns << 1) | FT_I);
                out.push((*nr << 1) | (*poll as u8));
                out.extend_from_slice(payload);
            }
            Control::S {
                kind,
                nr,
                poll_final,
            } => {
                out.push((kind.ss() << 2) | FT_S);
                out.push((*nr << 1) | (*poll_final as u8));
            }
            Control::U {
                kind,
                poll_final,
                payload,
            } => {
                let (m3, m2) = kind.modifiers();
                out.push((m3 << 5) | ((*poll_final as u8) << 4) | (m2 << 2) | FT_U);
                out.extend_from_slice(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrips() {
        let addr = Address {
            sapi: SAPI_CALL_CTRL,
            cr: CmdResp::Command,
            tei: 0,
        };
        let mut buf = Vec::new();
        addr.encode(&mut buf);
        assert_eq!(buf, vec![0x02, 0x01]);
        let (decoded, rest) = Address::decode(&buf).unwrap();
        assert_eq!(decoded, addr);
        assert!(rest.is_empty());
    }

    #[test]
    fn sabme_control_byte_matches_spec() {
        // C/R=1 command SABME with P=1: m3=011, p=1, m2=11, ft=11 => 0x7f
        let mut out = Vec::new();
        Control::U {
            kind: UFrameKind::Sabme,
            poll_final: true,
            payload: &[],
        }
        .encode(&mut out);
        assert_eq!(out, vec![0x7f]);
        let decoded = Control::decode(&out).unwrap();
        assert_eq!(
            decoded,
            Control::U {
                kind: UFrameKind::Sabme,
                poll_final: true,
                payload: &[]
            }
        );
    }

    #[test]
    fn ua_response_byte_matches_spec() {
        let mut out = Vec::new();
        Control::U {
            kind: UFrameKind::Ua,
            poll_final: true,
            payload: &[],
        }
        .encode(&mut out);
        assert_eq!(out, vec![0x73]);
    }

    #[test]
    fn i_frame_roundtrips_with_payload() {
        let mut out = Vec::new();
        Control::I {
            ns: 5,
            nr: 3,
            poll: false,
            payload: &[0xde, 0xad],
        }
        .encode(&mut out);
        let decoded = Control::decode(&out).unwrap();
        assert_eq!(
            decoded,
            Control::I {
                ns: 5,
                nr: 3,
                poll: false,
                payload: &[0xde, 0xad]
            }
        );
    }

    #[test]
    fn rr_rnr_rej_use_distinct_ss_bits() {
        for kind in [SFrameKind::Rr, SFrameKind::Rnr, SFrameKind::Rej] {
            let mut out = Vec::new();
            Control::S {
                kind,
                nr: 9,
                poll_final: true,
            }
            .encode(&mut out);
            assert_eq!(
                Control::decode(&out).unwrap(),
                Control::S {
                    kind,
                    nr: 9,
                    poll_final: true
                }
            );
        }
    }
}
