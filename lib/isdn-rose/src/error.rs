use core::fmt;

use isdn_asn1::Error as Asn1Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A primitive failed to decode or encode.
    Asn1(Asn1Error),
    /// The component's outer tag wasn't one of invoke/result/error/reject.
    UnknownComponentType(u32),
    /// The operation-value CHOICE was neither an INTEGER nor an OID.
    BadOperationValue,
    /// No table entry matches the decoded operation for this switchtype;
    /// the component is structurally valid but semantically unsupported.
    UnknownOperation,
    /// A table entry exists but carries no argument codec (table-only),
    /// so invocation arguments can't be decoded.
    NoArgumentCodec,
    /// Decoded arguments didn't match the shape the codec expected.
    MalformedArguments,
}

impl From<Asn1Error> for Error {
    fn from(e: Asn1Error) -> Self {
        Error::Asn1(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Asn1(e) => write!(f, "ASN.1 error: {e}"),
            Error::UnknownComponentType(tag) => write!(f, "unknown ROSE component tag {tag:#x}"),
            Error::BadOperationValue => write!(f, "malformed operation-value CHOICE"),
            Error::UnknownOperation => write!(f, "no dispatch entry for this operation"),
            Error::NoArgumentCodec => write!(f, "operation has no argument codec"),
            Error::MalformedArguments => write!(f, "argument structure did not match codec"),
        }
    }
}
