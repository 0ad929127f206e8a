use core::fmt;

/// Everything that can go wrong decoding or encoding a BER primitive.
///
/// The caller is expected to drop the current frame/component silently and
/// emit a diagnostic, not to propagate this out of the protocol stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Ran out of input before a tag/length/value was fully decoded.
    Truncated,
    /// A long-form length used the reserved `0x7f` count-of-octets encoding.
    ReservedLength,
    /// A decoded length value would not fit in `usize` on this platform.
    LengthOverflow,
    /// An OID encoded more than 10 sub-identifiers.
    OidTooLong,
    /// A sub-identifier's base-128 encoding overflowed `u32`.
    OidSubidentifierOverflow,
    /// A NULL value had nonzero length.
    NullHasContent,
    /// A string was longer than the destination buffer and the operation
    /// does not permit silent truncation.
    StringTooLong,
    /// The decoded tag didn't match what the caller expected at this
    /// position in the grammar.
    UnexpectedTag(u32),
    /// Not enough room remains in the output buffer to encode.
    OutOfSpace,
    /// An indefinite-length encoding was missing its `00 00` terminator.
    MissingTerminator,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "buffer ran out mid-component"),
            Error::ReservedLength => write!(f, "length used reserved 0x7f form"),
            Error::LengthOverflow => write!(f, "length value too large"),
            Error::OidTooLong => write!(f, "OID has more than 10 sub-identifiers"),
            Error::OidSubidentifierOverflow => write!(f, "OID sub-identifier overflow"),
            Error::NullHasContent => write!(f, "NULL with nonzero length"),
            Error::StringTooLong => write!(f, "string exceeds destination buffer"),
            Error::UnexpectedTag(tag) => write!(f, "unexpected tag {tag:#x}"),
            Error::OutOfSpace => write!(f, "output buffer exhausted"),
            Error::MissingTerminator => write!(f, "indefinite length missing 00 00 terminator"),
        }
    }
}
