//! Partitioning operations (wipefs / parted).

use crate::HalResult;
use std::fmt;
use std::path::Path;

/// Partition table kinds supported by the deployment recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TableKind {
    Gpt,
    Mbr,
}

impl TableKind {
    /// Label name as understood by `parted mklabel`.
    pub fn parted_label(&self) -> &'static str {
        match self {
            TableKind::Gpt => "gpt",
            TableKind::Mbr => "msdos",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Gpt => write!(f, "GPT"),
            TableKind::Mbr => write!(f, "MBR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WipeOptions {
    pub dry_run: bool,
    pub confirmed: bool,
}

impl WipeOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}

#[derive(Debug, Clone)]
pub struct PartedOptions {
    pub dry_run: bool,
    pub confirmed: bool,
}

impl PartedOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}

/// A single high-level partition operation executed via `parted -s`.
///
/// Kept as plain data so planned operations and recorded rollback
/// compensations can both be logged and replayed deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartedOp {
    MkLabel {
        kind: TableKind,
    },
    MkPart {
        fs_type: String,
        start_mib: u64,
        /// `None` means "to 100% of the device".
        end_mib: Option<u64>,
    },
    SetBoot {
        part_num: u32,
        on: bool,
    },
}

pub trait PartitionOps {
    /// Clear all filesystem/partition-table signatures on a device node.
    /// Passing a whole-disk node wipes the partition table; passing a
    /// partition node wipes only that partition's signature.
    fn wipefs_all(&self, device: &Path, opts: &WipeOptions) -> HalResult<()>;

    /// Execute a single `parted` operation against the given disk.
    fn parted(&self, disk: &Path, op: &PartedOp, opts: &PartedOptions) -> HalResult<String>;
}
