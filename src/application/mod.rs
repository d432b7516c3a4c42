//! Application layer - Use cases and port interfaces
//!
//! Contains the record loop, the capture session manager, the
//! finalization pipeline, and the trait definitions for external
//! system interactions.

pub mod capture;
pub mod finalize;
pub mod poller;
pub mod ports;
pub mod queue;

// Re-export use cases
pub use capture::{
    stop_reason_for, ActiveCapture, CaptureSessionManager, SessionSlot, StartError,
    StartedCapture,
};
pub use finalize::{
    is_valid_capture, FinalizationOutcome, FinalizationQueue, FinalizationTask,
    FinalizationWorker, FinalizeTimeouts, Finalizer, OutcomeCallback, MIN_USABLE_BYTES,
};
pub use poller::{PlaybackPoller, PollStatus, StatusCallback};
pub use queue::{task_queue, TaskDone, TaskQueue, TaskReceiver};
