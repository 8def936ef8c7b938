//! Database access for repdir-sync

pub mod representatives;
pub mod runs;
