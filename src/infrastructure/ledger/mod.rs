//! Recording ledger infrastructure module

mod jsonl;

pub use jsonl::JsonlLedger;
