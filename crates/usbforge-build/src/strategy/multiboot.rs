//! Multi-boot media: shared bootloader plus up to two OS payloads.
//!
//! OS images are optional; the generated boot menu only lists the ones
//! actually supplied.

use super::{stage, stage_optional, write_text, DeployContext, PayloadStrategy};
use crate::session::BuildSession;
use usbforge_error::BuildError;

pub const BOOT_PARTITION: &str = "BOOT";
pub const OS1_PARTITION: &str = "OS1";
pub const OS2_PARTITION: &str = "OS2";

pub struct MultibootStrategy;

impl PayloadStrategy for MultibootStrategy {
    fn name(&self) -> &'static str {
        "multiboot"
    }

    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError> {
        stage_optional(ctx, session, "os1_image", OS1_PARTITION)?;
        stage_optional(ctx, session, "os2_image", OS2_PARTITION)?;
        if !ctx.sources.contains("os1_image") && !ctx.sources.contains("os2_image") {
            session.log_warn("no OS images supplied; building bootloader-only media");
        }
        Ok(())
    }

    fn configure_bootloader(
        &self,
        ctx: &DeployContext,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        let bootloader = ctx.required_source("bootloader")?;
        let boot = ctx.mount_for(BOOT_PARTITION)?;
        let copied = stage(bootloader, boot)?;
        session.log_info(format!("bootloader staged ({} files)", copied));

        let mut menu = String::from("set timeout=10\n");
        let mut entries = 0;
        for (key, partition, title) in [
            ("os1_image", OS1_PARTITION, "Operating system 1"),
            ("os2_image", OS2_PARTITION, "Operating system 2"),
        ] {
            if let Some(src) = ctx.sources.get(key) {
                let image = src
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| key.to_string());
                menu.push_str(&format!("menuentry \"{}\" {{\n", title));
                menu.push_str(&format!("    search --no-floppy --label {} --set=root\n", partition));
                menu.push_str(&format!("    chainloader /{}\n", image));
                menu.push_str("}\n");
                entries += 1;
            }
        }
        write_text(&boot.join("grub/grub.cfg"), &menu)?;
        session.log_info(format!("boot menu written ({} entries)", entries));
        Ok(())
    }
}
