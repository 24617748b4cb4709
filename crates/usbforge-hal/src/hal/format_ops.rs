//! Filesystem formatting operations.

use crate::HalResult;
use std::fmt;
use std::path::Path;

/// Filesystem kinds a recipe may request for a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FsKind {
    Fat32,
    Ntfs,
    ExFat,
    Ext4,
    HfsPlus,
}

impl FsKind {
    /// Filesystem type name as given to `parted mkpart`.
    pub fn parted_name(&self) -> &'static str {
        match self {
            FsKind::Fat32 => "fat32",
            FsKind::Ntfs => "ntfs",
            FsKind::ExFat => "ntfs", // parted has no exfat fs-type; ntfs hint is conventional
            FsKind::Ext4 => "ext4",
            FsKind::HfsPlus => "hfs+",
        }
    }

    /// Type name for `mount -t`, where a mount hint makes sense.
    pub fn mount_fstype(&self) -> Option<&'static str> {
        match self {
            FsKind::Fat32 => Some("vfat"),
            FsKind::Ntfs => Some("ntfs"),
            FsKind::ExFat => Some("exfat"),
            FsKind::Ext4 => Some("ext4"),
            FsKind::HfsPlus => Some("hfsplus"),
        }
    }
}

impl fmt::Display for FsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsKind::Fat32 => "FAT32",
            FsKind::Ntfs => "NTFS",
            FsKind::ExFat => "exFAT",
            FsKind::Ext4 => "ext4",
            FsKind::HfsPlus => "HFS+",
        };
        write!(f, "{}", name)
    }
}

/// Options for formatting operations.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// If true, log the operation but don't execute it.
    pub dry_run: bool,
    /// If true, the caller has confirmed the destructive operation.
    pub confirmed: bool,
    /// Additional arguments to pass to the mkfs command.
    pub extra_args: Vec<String>,
}

impl FormatOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self {
            dry_run,
            confirmed,
            extra_args: Vec::new(),
        }
    }
}

pub trait FormatOps {
    /// Format a partition device node with the requested filesystem,
    /// applying the given volume label.
    fn format(&self, device: &Path, fs: FsKind, label: &str, opts: &FormatOptions)
        -> HalResult<()>;
}
