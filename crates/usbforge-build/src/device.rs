//! Target device description supplied by the caller.
//!
//! The pipeline never discovers devices itself; whoever submits a build
//! fills this in (typically from a prior lsblk/udev scan).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDevice {
    /// Whole-disk device node, e.g. `/dev/sdb`.
    pub path: PathBuf,
    pub size_bytes: u64,
    pub removable: bool,
    pub system_disk: bool,
    pub write_protected: bool,
}

impl TargetDevice {
    pub fn size_mib(&self) -> u64 {
        self.size_bytes / (1024 * 1024)
    }
}

#[cfg(test)]
pub(crate) fn fake_device(size_mib: u64) -> TargetDevice {
    TargetDevice {
        path: PathBuf::from("/dev/fake"),
        size_bytes: size_mib * 1024 * 1024,
        removable: true,
        system_disk: false,
        write_protected: false,
    }
}
