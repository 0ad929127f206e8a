//! ROSE (Remote Operations Service Element) component and operation
//! codecs layered on [`isdn_asn1`]: the invoke/result/error/reject
//! envelope, the operation-value CHOICE, and per-switchtype argument
//! encodings for the QSIG, ETSI, and "Other" (NI2/DMS100/Lucent5E/
//! ATT4ESS/NI1) operation families, framed inside a Facility information
//! element.

pub mod component;
pub mod dispatch;
mod error;
pub mod facility;
pub mod ops;
pub mod party_number;
pub mod switch_type;
pub mod value;

pub use error::Error;
pub use switch_type::{SwitchFamily, SwitchType};
