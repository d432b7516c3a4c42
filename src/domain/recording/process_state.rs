//! Encoder process shutdown state machine

use std::fmt;
use thiserror::Error;

/// Lifecycle of a capture process once it has been handed to finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessState {
    #[default]
    Running,
    Signalled,
    Terminated,
}

impl ProcessState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Signalled => "signalled",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: ProcessState,
    pub action: String,
}

/// How a process reached the terminated state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited by itself, before or after the graceful-stop byte
    Exited,
    /// Had to be killed after the graceful window elapsed
    Killed,
}

/// Tracks the stop sequence of one capture process.
///
/// State machine:
///   RUNNING -> SIGNALLED (graceful-stop byte sent)
///   RUNNING -> TERMINATED (exited by itself)
///   SIGNALLED -> TERMINATED (exited, or killed after the graceful window)
#[derive(Debug, Default)]
pub struct ProcessLifecycle {
    state: ProcessState,
    signalled: bool,
    termination: Option<Termination>,
}

impl ProcessLifecycle {
    /// Create a lifecycle in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// How the process terminated, once it has
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Whether the graceful-stop byte was delivered at some point
    pub fn was_signalled(&self) -> bool {
        self.signalled
    }

    /// Transition from RUNNING to SIGNALLED
    pub fn signal(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != ProcessState::Running {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "send stop signal".to_string(),
            });
        }
        self.state = ProcessState::Signalled;
        self.signalled = true;
        Ok(())
    }

    /// Transition to TERMINATED
    pub fn terminate(&mut self, how: Termination) -> Result<(), InvalidStateTransition> {
        if self.state == ProcessState::Terminated {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "terminate".to_string(),
            });
        }
        self.state = ProcessState::Terminated;
        self.termination = Some(how);
        Ok(())
    }
}
