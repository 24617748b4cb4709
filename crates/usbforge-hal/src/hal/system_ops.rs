//! Whole-system side effects: write flushing and partition-table re-reads.

use crate::HalResult;
use std::path::Path;

pub trait SystemOps {
    /// Flush pending writes to all block devices.
    fn sync(&self) -> HalResult<()>;

    /// Ask the kernel to re-read a disk's partition table.
    fn partprobe(&self, disk: &Path) -> HalResult<()>;

    /// Wait for udev to finish processing queued device events.
    fn udev_settle(&self) -> HalResult<()>;
}
