//! Partition planner: turns recipe partition specs into concrete MiB
//! extents on a specific device.
//!
//! Layout rules: partitions are placed in recipe order starting at the
//! first-usable offset (1 MiB for GPT alignment), fixed sizes are taken
//! verbatim, and a single `Remaining` partition absorbs everything up
//! to a small reserved trailer kept free for the backup GPT.

use crate::recipe::{PartitionSize, PartitionSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use usbforge_error::BuildError;
use usbforge_hal::{path::partition_path, FsKind};

/// First usable MiB on the device.
pub const DEFAULT_START_OFFSET_MIB: u64 = 1;

/// MiB kept free at the end of the device for the backup partition
/// table.
pub const RESERVED_TRAILER_MIB: u64 = 5;

/// Minimum extent the planner will emit for any partition.
const MIN_PARTITION_MIB: u64 = 1;

/// A planned partition with resolved extents. Partition numbers are
/// 1-based in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcretePartition {
    pub number: u32,
    pub name: String,
    pub label: String,
    pub start_mib: u64,
    pub end_mib: u64,
    pub fs: FsKind,
    pub bootable: bool,
}

impl ConcretePartition {
    pub fn size_mib(&self) -> u64 {
        self.end_mib - self.start_mib
    }

    /// Device node for this partition on the given whole disk.
    pub fn device_path(&self, disk: &Path) -> PathBuf {
        partition_path(disk, self.number)
    }
}

/// Plan concrete extents for `specs` on a device of `device_size_bytes`.
///
/// Fails with `Configuration` for malformed spec lists and with
/// `InsufficientSpace` when the device cannot hold the fixed sizes plus
/// at least [`MIN_PARTITION_MIB`] for a remaining-space partition.
pub fn plan(
    specs: &[PartitionSpec],
    device_size_bytes: u64,
    start_offset_mib: u64,
) -> Result<Vec<ConcretePartition>, BuildError> {
    if specs.is_empty() {
        return Err(BuildError::Configuration(
            "partition plan requested with no partition specs".to_string(),
        ));
    }
    let remaining_count = specs
        .iter()
        .filter(|s| s.size == PartitionSize::Remaining)
        .count();
    if remaining_count > 1 {
        return Err(BuildError::Configuration(format!(
            "{} partitions request remaining space; at most one is allowed",
            remaining_count
        )));
    }

    let device_mib = device_size_bytes / (1024 * 1024);
    let usable_end_mib = device_mib.saturating_sub(RESERVED_TRAILER_MIB);

    let fixed_total: u64 = specs
        .iter()
        .filter_map(|s| match s.size {
            PartitionSize::Mib(mib) => Some(mib),
            PartitionSize::Remaining => None,
        })
        .sum();
    let min_remaining = if remaining_count == 1 {
        MIN_PARTITION_MIB
    } else {
        0
    };
    let required = start_offset_mib + fixed_total + min_remaining + RESERVED_TRAILER_MIB;
    if required > device_mib {
        return Err(BuildError::InsufficientSpace {
            required_mib: required,
            available_mib: device_mib,
        });
    }

    let mut plan = Vec::with_capacity(specs.len());
    let mut cursor = start_offset_mib;
    for (idx, spec) in specs.iter().enumerate() {
        let end = match spec.size {
            PartitionSize::Mib(mib) => {
                if mib < MIN_PARTITION_MIB {
                    return Err(BuildError::Configuration(format!(
                        "partition '{}' requests {} MiB; minimum is {} MiB",
                        spec.name, mib, MIN_PARTITION_MIB
                    )));
                }
                cursor + mib
            }
            PartitionSize::Remaining => {
                // Fixed partitions after the remaining one still need
                // their room carved out of the tail.
                let later_fixed: u64 = specs[idx + 1..]
                    .iter()
                    .filter_map(|s| match s.size {
                        PartitionSize::Mib(mib) => Some(mib),
                        PartitionSize::Remaining => None,
                    })
                    .sum();
                usable_end_mib - later_fixed
            }
        };
        if end > usable_end_mib {
            return Err(BuildError::InsufficientSpace {
                required_mib: end + RESERVED_TRAILER_MIB,
                available_mib: device_mib,
            });
        }
        plan.push(ConcretePartition {
            number: (idx + 1) as u32,
            name: spec.name.clone(),
            label: spec.effective_label().to_string(),
            start_mib: cursor,
            end_mib: end,
            fs: spec.fs,
            bootable: spec.bootable,
        });
        cursor = end;
    }

    Ok(plan)
}
