//! Rollback ledger: compensations recorded as destructive steps land.
//!
//! Each successful destructive operation pushes the compensation that
//! undoes it. On failure the ledger is drained LIFO and every
//! compensation is attempted; a failed compensation is recorded and
//! replay continues, so one stuck unmount cannot strand everything
//! behind it. The ledger drains exactly once per session.

use crate::progress::BuildState;
use std::fmt;
use std::path::PathBuf;
use usbforge_hal::{DiskOps, WipeOptions};

/// A single recorded undo operation. Plain data so completed rollbacks
/// can be logged verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Unmount { mount_point: PathBuf },
    WipeSignatures { device: PathBuf },
    WipePartitionTable { disk: PathBuf },
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::Unmount { mount_point } => {
                write!(f, "unmount {}", mount_point.display())
            }
            Compensation::WipeSignatures { device } => {
                write!(f, "wipe signatures on {}", device.display())
            }
            Compensation::WipePartitionTable { disk } => {
                write!(f, "wipe partition table on {}", disk.display())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RollbackAction {
    /// Build state that recorded this compensation.
    pub step: BuildState,
    pub op: Compensation,
}

/// Outcome of draining the ledger.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub executed: usize,
    pub skipped: usize,
    /// Compensations that failed, with diagnostics. Never aborts replay.
    pub failures: Vec<(Compensation, String)>,
}

impl ReplayReport {
    pub fn clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RollbackLedger {
    actions: Vec<RollbackAction>,
}

impl RollbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: BuildState, op: Compensation) {
        log::debug!("rollback ledger: recorded '{}' during {}", op, step);
        self.actions.push(RollbackAction { step, op });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drain the ledger newest-first, executing every compensation.
    pub fn replay_all(&mut self, hal: &dyn DiskOps) -> ReplayReport {
        self.replay_filtered(hal, |_| true)
    }

    /// Drain the ledger executing only unmount compensations. Used when
    /// the device state itself is intact and worth keeping, so wipes
    /// must not run.
    pub fn replay_unmounts_only(&mut self, hal: &dyn DiskOps) -> ReplayReport {
        self.replay_filtered(hal, |op| matches!(op, Compensation::Unmount { .. }))
    }

    fn replay_filtered(
        &mut self,
        hal: &dyn DiskOps,
        should_run: impl Fn(&Compensation) -> bool,
    ) -> ReplayReport {
        let mut report = ReplayReport::default();
        while let Some(action) = self.actions.pop() {
            if !should_run(&action.op) {
                report.skipped += 1;
                continue;
            }
            log::info!("rollback: {}", action.op);
            let result = match &action.op {
                Compensation::Unmount { mount_point } => hal.unmount(mount_point, false),
                Compensation::WipeSignatures { device } => {
                    hal.wipefs_all(device, &WipeOptions::new(false, true))
                }
                Compensation::WipePartitionTable { disk } => {
                    hal.wipefs_all(disk, &WipeOptions::new(false, true))
                }
            };
            match result {
                Ok(()) => report.executed += 1,
                Err(err) => {
                    log::warn!("rollback step '{}' failed: {}", action.op, err);
                    report.failures.push((action.op, err.to_string()));
                }
            }
        }
        report
    }
}
