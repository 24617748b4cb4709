//! Arbitrary payload plus a caller-supplied bootloader.

use super::{stage, DeployContext, PayloadStrategy};
use crate::session::BuildSession;
use usbforge_error::BuildError;

pub const BOOT_PARTITION: &str = "BOOT";
pub const PAYLOAD_PARTITION: &str = "PAYLOAD";

pub struct CustomPayloadStrategy;

impl PayloadStrategy for CustomPayloadStrategy {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn deploy(&self, ctx: &DeployContext, session: &mut BuildSession) -> Result<(), BuildError> {
        let payload = ctx.required_source("payload")?;
        let dst = ctx.mount_for(PAYLOAD_PARTITION)?;
        session.log_info(format!("staging payload from {}", payload.display()));
        let copied = stage(payload, dst)?;
        session.log_info(format!("payload staged ({} files)", copied));
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
        Ok(())
    }
}
