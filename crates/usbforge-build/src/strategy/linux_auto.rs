//! Linux automated-install media with a preseed/kickstart answer file.

use super::{stage, stage_optional, write_text, DeployContext, PayloadStrategy};
use crate::session::BuildSession;
use usbforge_error::BuildError;

pub const EFI_PARTITION: &str = "EFI";
pub const INSTALL_PARTITION: &str = "Linux Install";
pub const DATA_PARTITION: &str = "Data";

pub struct LinuxAutomatedStrategy;

impl PayloadStrategy for LinuxAutomatedStrategy {
    fn name(&self) -> &'static str {
        "linux-automated"
    }

    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError> {
        let image = ctx.required_source("linux_image")?;
        let install = ctx.mount_for(INSTALL_PARTITION)?;
        session.log_info(format!("staging Linux image from {}", image.display()));
        let copied = stage(image, install)?;
        session.log_info(format!("Linux image staged ({} files)", copied));

        let preseed = ctx.required_source("preseed")?;
        super::copy_file(preseed, &install.join("preseed.cfg"))?;
        session.log_info("preseed.cfg placed at volume root");

        stage_optional(ctx, session, "extra_packages", DATA_PARTITION)?;
        Ok(())
    }

    fn configure_bootloader(
        &self,
        ctx: &DeployContext,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        let efi = ctx.mount_for(EFI_PARTITION)?;
        let image_name = ctx
            .required_source("linux_image")?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "linux.iso".to_string());
        let mut cfg = String::from("set timeout=5\n");
        cfg.push_str("menuentry \"Automated Linux install\" {\n");
        cfg.push_str("    search --no-floppy --label Linux-Install --set=root\n");
        cfg.push_str(&format!("    loopback loop /{}\n", image_name));
        cfg.push_str(
            "    linux (loop)/casper/vmlinuz boot=casper automatic-ubiquity file=/cdrom/preseed.cfg\n",
        );
        cfg.push_str("    initrd (loop)/casper/initrd\n");
        cfg.push_str("}\n");
        write_text(&efi.join("boot/grub/grub.cfg"), &cfg)?;
        session.log_info("GRUB configuration written to EFI partition");
        Ok(())
    }
}
