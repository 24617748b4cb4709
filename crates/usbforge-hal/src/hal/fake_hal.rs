//! Fake HAL implementation for testing.
//!
//! Records every operation without executing it, so pipeline behavior
//! (ordering, rollback, safety gating) can be asserted in CI without
//! root privileges or real hardware. Individual operations can be made
//! to fail via [`FailureRule`]s.

use super::format_ops::{FormatOps, FormatOptions, FsKind};
use super::mount_ops::{MountOps, MountOptions};
use super::partition_ops::{PartedOp, PartedOptions, PartitionOps, WipeOptions};
use super::probe_ops::ProbeOps;
use super::system_ops::SystemOps;
use crate::{HalError, HalResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Operation records for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Wipefs {
        device: PathBuf,
    },
    Parted {
        disk: PathBuf,
        op: PartedOp,
    },
    Format {
        device: PathBuf,
        fs: FsKind,
        label: String,
    },
    Mount {
        device: PathBuf,
        target: PathBuf,
        fstype: Option<String>,
    },
    Unmount {
        target: PathBuf,
    },
    Sync,
    Partprobe {
        disk: PathBuf,
    },
    UdevSettle,
    LsblkMountpoints {
        disk: PathBuf,
    },
}

impl Operation {
    /// Whether this operation mutates the device.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::Wipefs { .. } | Operation::Parted { .. } | Operation::Format { .. }
        )
    }
}

/// Operation kinds a [`FailureRule`] can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Wipefs,
    Parted,
    Format,
    Mount,
    Unmount,
}

/// Makes every matching operation fail with the given diagnostic.
#[derive(Debug, Clone)]
pub struct FailureRule {
    pub kind: OpKind,
    /// Substring matched against the operation's device/target path.
    pub path_contains: String,
    pub message: String,
}

impl FailureRule {
    pub fn new(kind: OpKind, path_contains: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path_contains: path_contains.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeHalState {
    operations: Vec<Operation>,
    mounted_paths: HashSet<PathBuf>,
    failures: Vec<FailureRule>,
    existing_mountpoints: Vec<PathBuf>,
}

/// Fake HAL implementation that records operations without executing them.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded operations, in issue order.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations.len()
    }

    /// Number of recorded destructive operations (wipefs/parted/format).
    pub fn destructive_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| op.is_destructive())
            .count()
    }

    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Register a failure rule; every matching future call errors.
    pub fn fail_matching(&self, rule: FailureRule) {
        self.state.lock().unwrap().failures.push(rule);
    }

    /// Seed mount points reported by `lsblk_mountpoints` (simulates a
    /// device with partitions already mounted by the desktop).
    pub fn set_existing_mountpoints(&self, mountpoints: Vec<PathBuf>) {
        self.state.lock().unwrap().existing_mountpoints = mountpoints;
    }

    pub fn mounted_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        state.mounted_paths.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.operations.clear();
        state.mounted_paths.clear();
        state.failures.clear();
        state.existing_mountpoints.clear();
    }

    fn record(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }

    fn check_failure(&self, kind: OpKind, path: &Path) -> HalResult<()> {
        let state = self.state.lock().unwrap();
        for rule in &state.failures {
            if rule.kind == kind && path.to_string_lossy().contains(&rule.path_contains) {
                return Err(HalError::CommandFailed {
                    program: format!("{:?}", kind).to_lowercase(),
                    code: Some(1),
                    stderr: rule.message.clone(),
                });
            }
        }
        Ok(())
    }
}

impl PartitionOps for FakeHal {
    fn wipefs_all(&self, device: &Path, opts: &WipeOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: wipefs -a {}", device.display());
            return Ok(());
        }
        self.check_failure(OpKind::Wipefs, device)?;
        self.record(Operation::Wipefs {
            device: device.to_path_buf(),
        });
        Ok(())
    }

    fn parted(&self, disk: &Path, op: &PartedOp, opts: &PartedOptions) -> HalResult<String> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: parted {} {:?}", disk.display(), op);
            return Ok(String::new());
        }
        self.check_failure(OpKind::Parted, disk)?;
        self.record(Operation::Parted {
            disk: disk.to_path_buf(),
            op: op.clone(),
        });
        Ok(String::new())
    }
}

impl FormatOps for FakeHal {
    fn format(
        &self,
        device: &Path,
        fs: FsKind,
        label: &str,
        opts: &FormatOptions,
    ) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: mkfs ({}) {}", fs, device.display());
            return Ok(());
        }
        self.check_failure(OpKind::Format, device)?;
        self.record(Operation::Format {
            device: device.to_path_buf(),
            fs,
            label: label.to_string(),
        });
        Ok(())
    }
}

impl MountOps for FakeHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        _options: MountOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: mount {} -> {}",
                device.display(),
                target.display()
            );
            return Ok(());
        }
        self.check_failure(OpKind::Mount, device)?;
        self.record(Operation::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.map(String::from),
        });
        self.state
            .lock()
            .unwrap()
            .mounted_paths
            .insert(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: unmount {}", target.display());
            return Ok(());
        }
        self.check_failure(OpKind::Unmount, target)?;
        self.record(Operation::Unmount {
            target: target.to_path_buf(),
        });
        self.state.lock().unwrap().mounted_paths.remove(target);
        Ok(())
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        Ok(self.state.lock().unwrap().mounted_paths.contains(path))
    }
}

impl SystemOps for FakeHal {
    fn sync(&self) -> HalResult<()> {
        self.record(Operation::Sync);
        Ok(())
    }

    fn partprobe(&self, disk: &Path) -> HalResult<()> {
        self.record(Operation::Partprobe {
            disk: disk.to_path_buf(),
        });
        Ok(())
    }

    fn udev_settle(&self) -> HalResult<()> {
        self.record(Operation::UdevSettle);
        Ok(())
    }
}

impl ProbeOps for FakeHal {
    fn lsblk_mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>> {
        self.record(Operation::LsblkMountpoints {
            disk: disk.to_path_buf(),
        });
        Ok(self.state.lock().unwrap().existing_mountpoints.clone())
    }
}
