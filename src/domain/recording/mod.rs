//! Recording value objects

mod format;
mod process_state;
mod stop_reason;

pub use format::{AudioFormat, DEFAULT_OGG_QUALITY};
pub use process_state::{InvalidStateTransition, ProcessLifecycle, ProcessState, Termination};
pub use stop_reason::StopReason;
