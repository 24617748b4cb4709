//! Windows unattended-install media.

use super::{stage, stage_optional, write_text, DeployContext, PayloadStrategy};
use crate::session::BuildSession;
use usbforge_error::BuildError;

pub const SYSTEM_PARTITION: &str = "System Reserved";
pub const WINDOWS_PARTITION: &str = "Windows";
pub const DRIVERS_PARTITION: &str = "Drivers";

pub struct WindowsUnattendedStrategy;

impl PayloadStrategy for WindowsUnattendedStrategy {
    fn name(&self) -> &'static str {
        "windows-unattended"
    }

    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError> {
        let image = ctx.required_source("windows_image")?;
        let windows = ctx.mount_for(WINDOWS_PARTITION)?;
        session.log_info(format!("staging Windows image from {}", image.display()));
        let copied = stage(image, windows)?;
        session.log_info(format!("Windows image staged ({} files)", copied));

        // The answer file must sit at the volume root for setup to
        // pick it up automatically.
        let answer = ctx.required_source("autounattend")?;
        super::copy_file(answer, &windows.join("autounattend.xml"))?;
        session.log_info("autounattend.xml placed at volume root");

        stage_optional(ctx, session, "driver_pack", DRIVERS_PARTITION)?;
        stage_optional(ctx, session, "software_bundle", DRIVERS_PARTITION)?;
        Ok(())
    }

    fn configure_bootloader(
        &self,
        ctx: &DeployContext,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        let system = ctx.mount_for(SYSTEM_PARTITION)?;
        // Windows setup rebuilds the BCD store itself; the system
        // partition only carries a marker describing the source layout.
        let profile_line = ctx
            .profile
            .map(|p| format!("target_profile={}\n", p.identity()))
            .unwrap_or_default();
        write_text(
            &system.join("usbforge-boot.cfg"),
            &format!(
                "payload_partition={}\nanswer_file=autounattend.xml\n{}",
                WINDOWS_PARTITION, profile_line
            ),
        )?;
        session.log_info("boot configuration written to system partition");
        Ok(())
    }
}
