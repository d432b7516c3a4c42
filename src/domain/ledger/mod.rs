//! Recording ledger records

mod entry;

pub(crate) use entry::LedgerTrackId;
pub use entry::{elapsed_secs_rounded, LedgerEntry};
