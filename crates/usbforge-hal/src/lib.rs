//! usbforge hardware abstraction layer.
//!
//! Narrow capability traits for the destructive disk operations the
//! build pipeline performs, with a real Linux backend and a recording
//! fake for CI-safe tests. The pipeline never shells out on its own;
//! everything goes through [`DiskOps`].

pub mod error;
pub mod hal;
pub mod path;

pub use error::{HalError, HalResult};
pub use hal::fake_hal::{FailureRule, FakeHal, OpKind, Operation};
pub use hal::format_ops::{FormatOps, FormatOptions, FsKind};
pub use hal::linux_hal::LinuxHal;
pub use hal::mount_ops::{MountOps, MountOptions};
pub use hal::partition_ops::{PartedOp, PartedOptions, PartitionOps, TableKind, WipeOptions};
pub use hal::probe_ops::ProbeOps;
pub use hal::system_ops::SystemOps;
pub use hal::DiskOps;
