//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod ledger;
pub mod recording;
pub mod track;

// Re-export common types
pub use config::{AppConfig, RecordSettings};
pub use error::*;
pub use ledger::LedgerEntry;
pub use recording::{AudioFormat, StopReason};
pub use track::{OutputLayout, TrackSnapshot};
