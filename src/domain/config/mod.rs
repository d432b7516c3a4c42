//! Configuration value objects

mod app_config;
mod record_settings;

pub use app_config::*;
pub use record_settings::{RecordSettings, LEDGER_FILE_NAME, MAX_OGG_QUALITY};
