//! HAL trait definitions and implementations.
//!
//! Operation traits are split by concern and combined into [`DiskOps`],
//! the single surface the build pipeline consumes. Both the real
//! [`linux_hal::LinuxHal`] and the recording [`fake_hal::FakeHal`]
//! implement it.

pub mod fake_hal;
pub mod format_ops;
pub mod linux_hal;
pub mod mount_ops;
pub mod partition_ops;
pub mod probe_ops;
pub mod system_ops;

use format_ops::FormatOps;
use mount_ops::MountOps;
use partition_ops::PartitionOps;
use probe_ops::ProbeOps;
use system_ops::SystemOps;

/// Complete disk-operation capability consumed by the pipeline.
pub trait DiskOps:
    PartitionOps + FormatOps + MountOps + SystemOps + ProbeOps + Send + Sync
{
}

impl<T> DiskOps for T where
    T: PartitionOps + FormatOps + MountOps + SystemOps + ProbeOps + Send + Sync
{
}
