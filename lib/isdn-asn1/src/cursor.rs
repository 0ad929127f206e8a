//! A bounds-checked read cursor over a BER-encoded byte slice.
//!
//! Mirrors the `pos`/`end` pointer pair threaded through every
//! `asn1_dec_*` call in the original codec, but as a single slice that
//! carries its own bound.

use crate::length::Length;
use crate::{length, tag, Error};

#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
}

/// The body of a constructed value, once its length has been decoded.
pub enum Body<'a> {
    /// Definite length: a cursor scoped to exactly the component's content
    /// octets. Any octets left unconsumed when the caller is done are
    /// simply abandoned, matching the original's tolerance of unknown
    /// trailing fields inside a SEQUENCE.
    Definite(Cursor<'a>),
    /// Indefinite length: there is no known end, so the caller must keep
    /// decoding components from the *same* outer cursor until it sees the
    /// `00 00` terminator, then call `finish_indefinite`.
    Indefinite,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    pub fn peek_tag(&self) -> Result<u32, Error> {
        tag::decode(self.buf).map(|(t, _)| t).ok_or(Error::Truncated)
    }

    pub fn tag(&mut self) -> Result<u32, Error> {
        let (t, rest) = tag::decode(self.buf).ok_or(Error::Truncated)?;
        self.buf = rest;
        Ok(t)
    }

    pub fn expect_tag(&mut self, expected: u32) -> Result<(), Error> {
        let got = self.tag()?;
        if got != expected {
            return Err(Error::UnexpectedTag(got));
        }
        Ok(())
    }

    pub fn length(&mut self) -> Result<Length, Error> {
        let (len, rest) = length::decode(self.buf)?;
        self.buf = rest;
        Ok(len)
    }

    pub fn byte(&mut self) -> Result<u8, Error> {
        let (&b, rest) = self.buf.split_first().ok_or(Error::Truncated)?;
        self.buf = rest;
        Ok(b)
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() < n {
            return Err(Error::Truncated);
        }
        let (taken, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(taken)
    }

    /// True if the next two octets are the indefinite-length terminator
    /// (`00 00`), without consuming anything.
    pub fn is_indef_terminator(&self) -> bool {
        self.buf.first() == Some(&tag::INDEF_TERM)
    }

    /// Consume the `00 00` end-of-contents octets. Errors if they aren't
    /// there; this is the one place BER decoding can detect a dangling
    /// indefinite-length component.
    pub fn finish_indefinite(&mut self) -> Result<(), Error> {
        if self.buf.len() < tag::INDEF_TERM_LEN || self.buf[0] != 0 || self.buf[1] != 0 {
            return Err(Error::MissingTerminator);
        }
        self.buf = &self.buf[tag::INDEF_TERM_LEN..];
        Ok(())
    }

    /// Split off the body of a constructed value whose length has just
    /// been decoded. For definite length this advances `self` past the
    /// whole component and returns an inner cursor scoped to its content;
    /// for indefinite length `self` is left positioned at the first
    /// nested component and the caller drives decoding directly from it.
    pub fn enter(&mut self, len: Length) -> Result<Body<'a>, Error> {
        match len {
            Length::Definite(n) => {
                if self.buf.len() < n {
                    return Err(Error::Truncated);
                }
                let (body, rest) = self.buf.split_at(n);
                self.buf = rest;
                Ok(Body::Definite(Cursor::new(body)))
            }
            Length::Indefinite => Ok(Body::Indefinite),
        }
    }
}

/// Iterate over the top-level components inside a constructed value,
/// whatever its length form turned out to be. `f` is called once per
/// component with a cursor positioned at that component's tag; it must
/// consume exactly one component. For definite length the loop stops
/// when the body cursor is drained; for indefinite length it stops at
/// (and consumes) the `00 00` terminator.
pub fn for_each_component<'a>(
    cur: &mut Cursor<'a>,
    len: Length,
    mut f: impl FnMut(&mut Cursor<'a>) -> Result<(), Error>,
) -> Result<(), Error> {
    match cur.enter(len)? {
        Body::Definite(mut inner) => {
            while !inner.is_empty() {
                f(&mut inner)?;
            }
            Ok(())
        }
        Body::Indefinite => loop {
            if cur.is_indef_terminator() {
                cur.finish_indefinite()?;
                return Ok(());
            }
            f(cur)?;
        },
    }
}
