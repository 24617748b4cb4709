//! macOS installer with the OpenCore Legacy Patcher boot path.
//!
//! The EFI partition must end up with a complete OpenCore layout;
//! verification failure here is fatal since the stick cannot boot
//! without it.

use super::{copy_tree, stage, stage_optional, DeployContext, PayloadStrategy};
use crate::session::BuildSession;
use std::path::Path;
use usbforge_error::BuildError;
use walkdir::WalkDir;

pub const EFI_PARTITION: &str = "EFI";
pub const INSTALLER_PARTITION: &str = "macOS Installer";
pub const TOOLS_PARTITION: &str = "OCLP Tools";

pub struct MacOsOclpStrategy;

impl PayloadStrategy for MacOsOclpStrategy {
    fn name(&self) -> &'static str {
        "macos-oclp"
    }

    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError> {
        let installer = ctx.required_source("macos_installer")?;
        let dst = ctx.mount_for(INSTALLER_PARTITION)?;
        session.log_info(format!(
            "staging macOS installer from {}",
            installer.display()
        ));
        let copied = stage(installer, dst)?;
        session.log_info(format!("installer staged ({} files)", copied));

        stage_optional(ctx, session, "oclp_app", TOOLS_PARTITION)?;
        Ok(())
    }

    fn configure_bootloader(
        &self,
        ctx: &DeployContext,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        let efi_src = ctx.required_source("opencore_efi")?;
        let efi_mount = ctx.mount_for(EFI_PARTITION)?;

        // Accept either a directory containing EFI/ or the EFI tree
        // contents themselves.
        if efi_src.join("EFI").is_dir() {
            copy_tree(efi_src, efi_mount)?;
        } else {
            copy_tree(efi_src, &efi_mount.join("EFI"))?;
        }
        session.log_info("OpenCore EFI staged, verifying boot layout");

        verify_opencore_layout(efi_mount)?;
        session.log_info("OpenCore boot layout verified");
        Ok(())
    }
}

/// Check the staged EFI partition for a bootable OpenCore layout:
/// a fallback bootloader, an OpenCore config, and at least one EFI
/// binary beyond the config under EFI/OC.
fn verify_opencore_layout(efi_mount: &Path) -> Result<(), BuildError> {
    let mut missing = Vec::new();

    let bootx64 = efi_mount.join("EFI/BOOT/BOOTx64.efi");
    if !bootx64.is_file() {
        missing.push("EFI/BOOT/BOOTx64.efi".to_string());
    }
    let config = efi_mount.join("EFI/OC/config.plist");
    if !config.is_file() {
        missing.push("EFI/OC/config.plist".to_string());
    }

    let oc_dir = efi_mount.join("EFI/OC");
    let efi_binaries = WalkDir::new(&oc_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("efi"))
                .unwrap_or(false)
        })
        .count();
    if efi_binaries == 0 {
        missing.push("an OpenCore .efi binary under EFI/OC".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BuildError::PayloadDeployment(format!(
            "EFI partition is not bootable, missing: {}",
            missing.join(", ")
        )))
    }
}
