//! Payload deployment strategies, one per deployment type.
//!
//! A strategy owns the two payload-facing states: staging files onto
//! the mounted partitions and configuring the boot path. Everything a
//! strategy touches goes through the mounted filesystem; strategies
//! never issue device-level operations, so a strategy failure can
//! always be cleaned up with unmounts alone.

mod custom;
mod linux_auto;
mod macos_oclp;
mod multiboot;
mod windows;

pub use custom::CustomPayloadStrategy;
pub use linux_auto::LinuxAutomatedStrategy;
pub use macos_oclp::MacOsOclpStrategy;
pub use multiboot::MultibootStrategy;
pub use windows::WindowsUnattendedStrategy;

use crate::planner::ConcretePartition;
use crate::profile::HardwareProfile;
use crate::recipe::{DeploymentRecipe, DeploymentType};
use crate::session::BuildSession;
use crate::sources::SourceFileSet;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use usbforge_error::BuildError;
use walkdir::WalkDir;

/// Read-only inputs a strategy works from.
pub struct DeployContext<'a> {
    pub recipe: &'a DeploymentRecipe,
    pub sources: &'a SourceFileSet,
    pub profile: Option<&'a HardwareProfile>,
    pub layout: &'a [ConcretePartition],
    /// Partition name -> active mount point, snapshotted at deploy time.
    pub mounts: BTreeMap<String, PathBuf>,
}

impl<'a> DeployContext<'a> {
    /// Mount point for a named partition; missing mounts are a fatal
    /// payload error since the mount state guarantees them.
    pub fn mount_for(&self, partition_name: &str) -> Result<&Path, BuildError> {
        self.mounts
            .get(partition_name)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                BuildError::PayloadDeployment(format!(
                    "partition '{}' is not mounted",
                    partition_name
                ))
            })
    }

    /// Source path for a required key.
    pub fn required_source(&self, key: &str) -> Result<&Path, BuildError> {
        self.sources.get(key).ok_or_else(|| {
            BuildError::PayloadDeployment(format!("required source '{}' missing", key))
        })
    }
}

pub trait PayloadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stage payload files onto the mounted partitions.
    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError>;

    /// Make the device bootable and verify the boot path.
    fn configure_bootloader(
        &self,
        ctx: &DeployContext,
        session: &mut BuildSession,
    ) -> Result<(), BuildError>;
}

/// Strategy dispatch by deployment type.
pub fn strategy_for(deployment_type: DeploymentType) -> Box<dyn PayloadStrategy> {
    match deployment_type {
        DeploymentType::MacOsOclp => Box::new(MacOsOclpStrategy),
        DeploymentType::WindowsUnattended => Box::new(WindowsUnattendedStrategy),
        DeploymentType::LinuxAutomated => Box::new(LinuxAutomatedStrategy),
        DeploymentType::Multiboot => Box::new(MultibootStrategy),
        DeploymentType::Custom => Box::new(CustomPayloadStrategy),
    }
}

/// Copy a source file or directory tree under `dst_dir`, returning the
/// number of files copied. Directory sources are copied recursively
/// with their top-level name preserved.
pub(crate) fn stage(src: &Path, dst_dir: &Path) -> Result<usize, BuildError> {
    if src.is_dir() {
        let name = src
            .file_name()
            .ok_or_else(|| payload_err(src, "source has no file name"))?;
        copy_tree(src, &dst_dir.join(name))
    } else {
        let name = src
            .file_name()
            .ok_or_else(|| payload_err(src, "source has no file name"))?;
        copy_file(src, &dst_dir.join(name))?;
        Ok(1)
    }
}

/// Recursively copy the contents of `src` into `dst`.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<usize, BuildError> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| payload_err(src, &e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| payload_err(entry.path(), &e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| payload_err(&target, &e.to_string()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| payload_err(parent, &e.to_string()))?;
            }
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub(crate) fn copy_file(src: &Path, dst: &Path) -> Result<(), BuildError> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| payload_err(src, &format!("copy to {}: {}", dst.display(), e)))
}

pub(crate) fn write_text(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| payload_err(parent, &e.to_string()))?;
    }
    fs::write(path, contents).map_err(|e| payload_err(path, &e.to_string()))
}

fn payload_err(path: &Path, detail: &str) -> BuildError {
    BuildError::PayloadDeployment(format!("{}: {}", path.display(), detail))
}

/// Stage an optional source if supplied; absence is a warning, not a
/// failure.
pub(crate) fn stage_optional(
    ctx: &DeployContext,
    session: &mut BuildSession,
    key: &str,
    partition_name: &str,
) -> Result<(), BuildError> {
    match ctx.sources.get(key) {
        Some(src) => {
            let dst = ctx.mount_for(partition_name)?;
            let copied = stage(src, dst)?;
            session.log_info(format!(
                "staged optional '{}' onto {} ({} files)",
                key, partition_name, copied
            ));
            Ok(())
        }
        None => {
            session.log_warn(format!("optional source '{}' not supplied, skipping", key));
            Ok(())
        }
    }
}
