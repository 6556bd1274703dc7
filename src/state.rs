//! Session lifecycle state

use crate::protocol::LinkError;
use std::fmt;

/// Control loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    StoppingOnInterrupt,
    StoppingOnLinkFailure,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Starting => "starting",
            LoopState::Running => "running",
            LoopState::StoppingOnInterrupt => "stopping (interrupt)",
            LoopState::StoppingOnLinkFailure => "stopping (link failure)",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Counters collected over a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Frames written to the link
    pub frames_sent: u64,

    /// Non-empty acknowledgement lines received
    pub acks_received: u64,

    /// Sensitivity when the loop stopped
    pub final_sensitivity: f32,
}

/// Why the loop stopped
#[derive(Debug)]
pub enum StopReason {
    /// Operator interrupt or closed command channel
    Interrupted,

    /// The link rejected a write
    LinkFailure(LinkError),
}

/// Result of a session that made it to Running
#[derive(Debug)]
pub struct LoopOutcome {
    pub reason: StopReason,
    pub stats: SessionStats,

    /// Every state the loop passed through, in order, ending in `Stopped`
    pub states: Vec<LoopState>,
}

impl LoopOutcome {
    pub fn is_graceful(&self) -> bool {
        matches!(self.reason, StopReason::Interrupted)
    }

    pub fn final_state(&self) -> LoopState {
        self.states.last().copied().unwrap_or(LoopState::Starting)
    }
}
