//! Build states and progress reporting.
//!
//! States advance strictly forward through the working sequence;
//! Failed and Cancelled are reachable from any non-terminal state.
//! The pipeline emits one `StateStarted`/`StateCompleted` pair per
//! working state plus free-form `Status` lines in between, so a UI can
//! render both a coarse step counter and a live activity line.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Initializing,
    ValidatingSafety,
    PreparingDevice,
    CreatingPartitions,
    FormattingPartitions,
    MountingPartitions,
    DeployingPayload,
    ConfiguringBootloader,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
}

impl BuildState {
    /// All working states in execution order.
    pub const WORKING: [BuildState; 9] = [
        BuildState::Initializing,
        BuildState::ValidatingSafety,
        BuildState::PreparingDevice,
        BuildState::CreatingPartitions,
        BuildState::FormattingPartitions,
        BuildState::MountingPartitions,
        BuildState::DeployingPayload,
        BuildState::ConfiguringBootloader,
        BuildState::Finalizing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuildState::Initializing => "Initializing",
            BuildState::ValidatingSafety => "Validating safety",
            BuildState::PreparingDevice => "Preparing device",
            BuildState::CreatingPartitions => "Creating partitions",
            BuildState::FormattingPartitions => "Formatting partitions",
            BuildState::MountingPartitions => "Mounting partitions",
            BuildState::DeployingPayload => "Deploying payload",
            BuildState::ConfiguringBootloader => "Configuring bootloader",
            BuildState::Finalizing => "Finalizing",
            BuildState::Completed => "Completed",
            BuildState::Failed => "Failed",
            BuildState::Cancelled => "Cancelled",
        }
    }

    /// 1-based position in the working sequence; terminal states report
    /// the full step count.
    pub fn number(&self) -> usize {
        Self::WORKING
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(Self::total())
    }

    pub fn total() -> usize {
        Self::WORKING.len()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildState::Completed | BuildState::Failed | BuildState::Cancelled
        )
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One progress event emitted over the session channel.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    StateStarted {
        state: BuildState,
        step: usize,
        total: usize,
        percent: u8,
    },
    StateCompleted {
        state: BuildState,
    },
    /// Free-form activity line within the current state.
    Status(String),
    Completed,
    Failed(String),
    Cancelled,
}

impl ProgressUpdate {
    pub(crate) fn state_started(state: BuildState) -> Self {
        let step = state.number();
        let total = BuildState::total();
        ProgressUpdate::StateStarted {
            state,
            step,
            total,
            percent: ((step.saturating_sub(1)) * 100 / total) as u8,
        }
    }
}
