//! Per-operation argument codecs, one module per operation family.

pub mod etsi_aoc;
pub mod etsi_diversion;
pub mod etsi_mwi;
pub mod other;
pub mod qsig_ct;
pub mod qsig_name;
