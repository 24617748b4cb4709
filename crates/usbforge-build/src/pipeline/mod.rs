//! The build state machine.
//!
//! States advance strictly forward; any error or an observed
//! cancellation diverts into rollback and a terminal state. All device
//! access goes through the injected [`DiskOps`] so the whole machine
//! runs against the recording fake in tests.

use crate::device::TargetDevice;
use crate::ledger::Compensation;
use crate::manifest::{manifest_partition, BuildManifest};
use crate::planner::{self, DEFAULT_START_OFFSET_MIB};
use crate::profile::HardwareProfile;
use crate::progress::{BuildState, ProgressUpdate};
use crate::recipe::DeploymentRecipe;
use crate::safety::{RiskLevel, SafetyValidator};
use crate::session::BuildSession;
use crate::sources::SourceFileSet;
use crate::strategy::{strategy_for, DeployContext};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use usbforge_error::BuildError;
use usbforge_hal::{
    DiskOps, FormatOptions, HalError, MountOptions, PartedOp, PartedOptions, WipeOptions,
};

#[cfg(test)]
mod tests;

/// Why a build run ended short of completion.
#[derive(Debug)]
pub struct FailureReport {
    /// State the pipeline was in when the error surfaced.
    pub state: BuildState,
    pub error: BuildError,
    /// Last log lines before the failure.
    pub log_tail: Vec<String>,
    /// Compensations that could not be replayed during rollback.
    pub rollback_failures: Vec<String>,
}

#[derive(Debug)]
pub enum BuildOutcome {
    Completed {
        /// Absent on dry runs, which stage no files.
        manifest: Option<BuildManifest>,
    },
    Failed(FailureReport),
    Cancelled {
        log_tail: Vec<String>,
    },
}

/// Inputs for one build run.
pub struct BuildInput<'a> {
    pub device: &'a TargetDevice,
    pub recipe: &'a DeploymentRecipe,
    pub sources: &'a SourceFileSet,
    pub profile: Option<&'a HardwareProfile>,
}

pub struct BuildPipeline {
    hal: Arc<dyn DiskOps>,
    validator: Arc<dyn SafetyValidator>,
    dry_run: bool,
    confirmed: bool,
}

impl BuildPipeline {
    pub fn new(hal: Arc<dyn DiskOps>, validator: Arc<dyn SafetyValidator>) -> Self {
        Self {
            hal,
            validator,
            dry_run: false,
            confirmed: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Arm destructive operations. Without this a non-dry run stops
    /// before touching the device.
    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Drive the state machine to a terminal state. Never panics and
    /// never leaves the ledger populated.
    pub fn run(&self, input: &BuildInput, session: &mut BuildSession) -> BuildOutcome {
        let result = self.execute(input, session);
        self.conclude(result, session)
    }

    /// Map the execution result to a terminal state, draining the
    /// ledger on the error paths.
    fn conclude(
        &self,
        result: Result<Option<BuildManifest>, BuildError>,
        session: &mut BuildSession,
    ) -> BuildOutcome {
        match result {
            Ok(manifest) => {
                session.enter_terminal(BuildState::Completed);
                session.send_progress(ProgressUpdate::Completed);
                BuildOutcome::Completed { manifest }
            }
            Err(BuildError::Cancelled) => {
                let failed_state = session.state();
                session.log_warn(format!(
                    "cancellation observed during {}, rolling back",
                    failed_state
                ));
                let report = session.ledger.replay_all(self.hal.as_ref());
                for (op, diag) in &report.failures {
                    session.log_warn(format!("rollback step '{}' failed: {}", op, diag));
                }
                session.mounts.clear();
                session.enter_terminal(BuildState::Cancelled);
                session.send_progress(ProgressUpdate::Cancelled);
                BuildOutcome::Cancelled {
                    log_tail: session.log.tail(20),
                }
            }
            Err(error) => {
                let failed_state = session.state();
                session.log_error(format!("build failed during {}: {}", failed_state, error));
                let report = if error.preserves_device_state() {
                    session.log_info("payload failure: unmounting only, device layout kept");
                    session.ledger.replay_unmounts_only(self.hal.as_ref())
                } else {
                    session.ledger.replay_all(self.hal.as_ref())
                };
                let rollback_failures: Vec<String> = report
                    .failures
                    .iter()
                    .map(|(op, diag)| format!("{}: {}", op, diag))
                    .collect();
                for line in &rollback_failures {
                    session.log_warn(format!("rollback step failed: {}", line));
                }
                session.mounts.clear();
                session.enter_terminal(BuildState::Failed);
                session.send_progress(ProgressUpdate::Failed(error.to_string()));
                BuildOutcome::Failed(FailureReport {
                    state: failed_state,
                    error,
                    log_tail: session.log.tail(20),
                    rollback_failures,
                })
            }
        }
    }

    fn execute(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<Option<BuildManifest>, BuildError> {
        self.initialize(input, session)?;
        session.check_cancel()?;
        self.validate_safety(input, session)?;
        session.check_cancel()?;
        self.prepare_device(input, session)?;
        session.check_cancel()?;
        self.create_partitions(input, session)?;
        session.check_cancel()?;
        self.format_partitions(input, session)?;
        session.check_cancel()?;
        self.mount_partitions(input, session)?;
        session.check_cancel()?;
        self.deploy_payload(input, session)?;
        session.check_cancel()?;
        self.configure_bootloader(input, session)?;
        session.check_cancel()?;
        self.finalize(input, session)
    }

    fn initialize(&self, input: &BuildInput, session: &mut BuildSession) -> Result<(), BuildError> {
        session.enter_state(BuildState::Initializing);
        input.recipe.validate()?;
        if !self.dry_run && !self.confirmed {
            return Err(BuildError::Configuration(
                "destructive run requested without confirmation".to_string(),
            ));
        }
        session.log_info(format!(
            "building '{}' ({}) onto {} ({} MiB{})",
            input.recipe.name,
            input.recipe.deployment_type,
            input.device.path.display(),
            input.device.size_mib(),
            if self.dry_run { ", dry run" } else { "" }
        ));
        session.complete_state();
        Ok(())
    }

    fn validate_safety(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::ValidatingSafety);

        let assessment = self.validator.assess_device(input.device);
        for factor in &assessment.factors {
            session.log_warn(format!("risk factor: {}", factor));
        }
        if !assessment.risk.permits_build() {
            return Err(BuildError::SafetyBlocked {
                risk: assessment.risk.to_string(),
                factors: assessment.factors,
            });
        }

        let mut blocked = Vec::new();
        for check in self
            .validator
            .check_prerequisites()
            .into_iter()
            .chain(self.validator.check_source_files(input.recipe, input.sources))
        {
            match check.risk {
                RiskLevel::Blocked | RiskLevel::Dangerous => {
                    blocked.push(format!("{}: {}", check.name, check.message))
                }
                RiskLevel::Moderate => session.log_warn(check.message),
                RiskLevel::Safe => {}
            }
        }
        // Capacity gate needs both the recipe and the device, so it
        // lives here rather than in the validator.
        let fixed = input.recipe.fixed_size_mib();
        if fixed > input.device.size_mib() {
            blocked.push(format!(
                "recipe needs {} MiB of fixed partitions, device offers {} MiB",
                fixed,
                input.device.size_mib()
            ));
        }
        if !blocked.is_empty() {
            return Err(BuildError::SafetyBlocked {
                risk: RiskLevel::Blocked.to_string(),
                factors: blocked,
            });
        }

        session.log_info(format!("safety verdict: {}", assessment.risk));
        session.complete_state();
        Ok(())
    }

    fn prepare_device(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::PreparingDevice);
        let disk = &input.device.path;

        let mountpoints = self
            .hal
            .lsblk_mountpoints(disk)
            .map_err(|e| self.dev_err(session, e))?;
        for mp in &mountpoints {
            session.log_info(format!("unmounting pre-existing mount {}", mp.display()));
            self.hal
                .unmount(mp, self.dry_run)
                .map_err(|e| self.dev_err(session, e))?;
        }

        self.hal
            .wipefs_all(disk, &self.wipe_opts())
            .map_err(|e| self.dev_err(session, e))?;
        if !self.dry_run {
            session.ledger.push(
                BuildState::PreparingDevice,
                Compensation::WipeSignatures { device: disk.clone() },
            );
        }
        session.log_info("device signatures cleared");
        session.complete_state();
        Ok(())
    }

    fn create_partitions(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::CreatingPartitions);
        let disk = &input.device.path;

        let layout = planner::plan(
            &input.recipe.partitions,
            input.device.size_bytes,
            DEFAULT_START_OFFSET_MIB,
        )?;
        for p in &layout {
            session.log_info(format!(
                "partition {}: {} ({}, {} MiB)",
                p.number,
                p.name,
                p.fs,
                p.size_mib()
            ));
        }

        let opts = self.parted_opts();
        self.hal
            .parted(disk, &PartedOp::MkLabel { kind: input.recipe.scheme }, &opts)
            .map_err(|e| self.dev_err(session, e))?;
        if !self.dry_run {
            session.ledger.push(
                BuildState::CreatingPartitions,
                Compensation::WipePartitionTable { disk: disk.clone() },
            );
        }

        for p in &layout {
            self.hal
                .parted(
                    disk,
                    &PartedOp::MkPart {
                        fs_type: p.fs.parted_name().to_string(),
                        start_mib: p.start_mib,
                        end_mib: Some(p.end_mib),
                    },
                    &opts,
                )
                .map_err(|e| self.dev_err(session, e))?;
        }
        for p in layout.iter().filter(|p| p.bootable) {
            self.hal
                .parted(
                    disk,
                    &PartedOp::SetBoot {
                        part_num: p.number,
                        on: true,
                    },
                    &opts,
                )
                .map_err(|e| self.dev_err(session, e))?;
        }

        self.hal
            .partprobe(disk)
            .map_err(|e| self.dev_err(session, e))?;
        self.hal
            .udev_settle()
            .map_err(|e| self.dev_err(session, e))?;

        session.layout = layout;
        session.complete_state();
        Ok(())
    }

    fn format_partitions(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::FormattingPartitions);
        let disk = &input.device.path;
        let opts = self.format_opts();

        let layout = session.layout.clone();
        for p in &layout {
            let part_dev = p.device_path(disk);
            session.log_info(format!("formatting {} as {}", part_dev.display(), p.fs));
            self.hal
                .format(&part_dev, p.fs, &p.label, &opts)
                .map_err(|e| self.dev_err(session, e))?;
            if !self.dry_run {
                session.ledger.push(
                    BuildState::FormattingPartitions,
                    Compensation::WipeSignatures { device: part_dev },
                );
            }
        }
        session.complete_state();
        Ok(())
    }

    fn mount_partitions(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::MountingPartitions);
        let disk = &input.device.path;

        let layout = session.layout.clone();
        for p in &layout {
            let part_dev = p.device_path(disk);
            let target = session.work_dir.join(format!("p{}", p.number));
            if !self.dry_run {
                fs::create_dir_all(&target).map_err(|e| {
                    BuildError::DeviceOperation {
                        state: session.state().name().to_string(),
                        diagnostic: format!("mount point {}: {}", target.display(), e),
                    }
                })?;
            }
            self.hal
                .mount_device(
                    &part_dev,
                    &target,
                    p.fs.mount_fstype(),
                    MountOptions::new(),
                    self.dry_run,
                )
                .map_err(|e| self.dev_err(session, e))?;
            if !self.dry_run {
                session.mounts.insert(p.name.clone(), target.clone());
                session.ledger.push(
                    BuildState::MountingPartitions,
                    Compensation::Unmount {
                        mount_point: target,
                    },
                );
            }
        }
        session.log_info(format!("{} partitions mounted", layout.len()));
        session.complete_state();
        Ok(())
    }

    fn deploy_payload(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::DeployingPayload);
        if self.dry_run {
            session.log_info("dry run: payload staging skipped");
            session.complete_state();
            return Ok(());
        }
        let strategy = strategy_for(input.recipe.deployment_type);
        session.log_info(format!("deploying via '{}' strategy", strategy.name()));
        let layout = session.layout.clone();
        let ctx = DeployContext {
            recipe: input.recipe,
            sources: input.sources,
            profile: input.profile,
            layout: &layout,
            mounts: session.mounts.clone(),
        };
        strategy.deploy(&ctx, session)?;
        session.complete_state();
        Ok(())
    }

    fn configure_bootloader(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<(), BuildError> {
        session.enter_state(BuildState::ConfiguringBootloader);
        if self.dry_run {
            session.log_info("dry run: bootloader configuration skipped");
            session.complete_state();
            return Ok(());
        }
        let strategy = strategy_for(input.recipe.deployment_type);
        let layout = session.layout.clone();
        let ctx = DeployContext {
            recipe: input.recipe,
            sources: input.sources,
            profile: input.profile,
            layout: &layout,
            mounts: session.mounts.clone(),
        };
        strategy.configure_bootloader(&ctx, session)?;
        session.complete_state();
        Ok(())
    }

    fn finalize(
        &self,
        input: &BuildInput,
        session: &mut BuildSession,
    ) -> Result<Option<BuildManifest>, BuildError> {
        session.enter_state(BuildState::Finalizing);

        let manifest = if self.dry_run {
            None
        } else {
            let manifest = BuildManifest::new(
                input.recipe,
                input.profile,
                &input.device.path,
                &session.layout,
                session.state().name(),
            );
            match manifest_partition(&session.layout, &session.mounts) {
                Some((part, mount)) => {
                    let path = manifest.write_to(mount)?;
                    session.log_info(format!(
                        "manifest written to partition '{}' at {}",
                        part.name,
                        path.display()
                    ));
                }
                None => session.log_warn("no mounted partition for the manifest, skipping"),
            }
            Some(manifest)
        };

        let mounts: Vec<(String, PathBuf)> = session
            .mounts
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, mount) in mounts.iter().rev() {
            session.log_info(format!("unmounting '{}'", name));
            self.hal
                .unmount(mount, self.dry_run)
                .map_err(|e| self.dev_err(session, e))?;
        }
        session.mounts.clear();

        self.hal.sync().map_err(|e| self.dev_err(session, e))?;
        // Successful build: recorded compensations are obsolete.
        let _ = std::mem::take(&mut session.ledger);
        session.log_info("build complete");
        session.complete_state();
        Ok(manifest)
    }

    fn wipe_opts(&self) -> WipeOptions {
        WipeOptions::new(self.dry_run, self.confirmed)
    }

    fn parted_opts(&self) -> PartedOptions {
        PartedOptions::new(self.dry_run, self.confirmed)
    }

    fn format_opts(&self) -> FormatOptions {
        FormatOptions::new(self.dry_run, self.confirmed)
    }

    fn dev_err(&self, session: &BuildSession, err: HalError) -> BuildError {
        BuildError::DeviceOperation {
            state: session.state().name().to_string(),
            diagnostic: err.to_string(),
        }
    }
}
