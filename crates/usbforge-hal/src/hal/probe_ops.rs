//! Read-only device probing.

use crate::HalResult;
use std::path::{Path, PathBuf};

pub trait ProbeOps {
    /// Mount points currently active for the disk or any of its partitions.
    fn lsblk_mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>>;
}
