//! Mount operations.

use crate::HalResult;
use std::path::Path;

/// Mount options and flags.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Additional mount options as a comma-separated string (e.g. "ro,noexec").
    pub options: Option<String>,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

pub trait MountOps {
    /// Mount a device to a target path.
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
        dry_run: bool,
    ) -> HalResult<()>;

    /// Unmount a filesystem by mount point.
    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()>;

    /// Check whether a path is currently a mount point.
    fn is_mounted(&self, path: &Path) -> HalResult<bool>;
}
