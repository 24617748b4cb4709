use super::*;
use crate::device::fake_device;
use crate::safety::StandardSafetyValidator;
use crate::session::BuildSession;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use usbforge_hal::{FailureRule, FakeHal, OpKind, Operation};

struct Harness {
    hal: FakeHal,
    work: TempDir,
    cancel: Arc<AtomicBool>,
}

impl Harness {
    fn new() -> Self {
        Self {
            hal: FakeHal::new(),
            work: TempDir::new().unwrap(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn pipeline(&self, dry_run: bool, confirmed: bool) -> BuildPipeline {
        let validator = StandardSafetyValidator {
            assume_sources_exist: true,
        };
        BuildPipeline::new(Arc::new(self.hal.clone()), Arc::new(validator))
            .dry_run(dry_run)
            .confirmed(confirmed)
    }

    fn session(&self) -> BuildSession {
        BuildSession::new(self.cancel.clone(), None, self.work.path().to_path_buf())
    }
}

/// Custom-payload inputs with real source files so the happy path can
/// stage them onto the (real, temp-dir) mount points.
fn custom_sources(dir: &Path) -> SourceFileSet {
    std::fs::write(dir.join("bootx64.efi"), "boot").unwrap();
    std::fs::create_dir_all(dir.join("payload")).unwrap();
    std::fs::write(dir.join("payload/app.bin"), "app").unwrap();
    SourceFileSet::new()
        .with("bootloader", dir.join("bootx64.efi"))
        .with("payload", dir.join("payload"))
}

#[test]
fn happy_path_runs_states_in_order_and_completes() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    let manifest = match outcome {
        BuildOutcome::Completed { manifest } => manifest.expect("real run writes a manifest"),
        other => panic!("expected Completed, got {other:?}"),
    };
    assert_eq!(manifest.partitions.len(), 2);
    assert_eq!(manifest.outcome, "Finalizing");
    assert_eq!(session.state(), BuildState::Completed);
    assert!(session.mounts.is_empty());
    assert!(session.ledger.is_empty());

    // Device operations land in state order.
    let ops = h.hal.operations();
    let mklabel_at = ops
        .iter()
        .position(|op| matches!(op, Operation::Parted { op: PartedOp::MkLabel { .. }, .. }))
        .unwrap();
    let wipefs_at = ops
        .iter()
        .position(|op| matches!(op, Operation::Wipefs { .. }))
        .unwrap();
    let format_at = ops
        .iter()
        .position(|op| matches!(op, Operation::Format { .. }))
        .unwrap();
    let mount_at = ops
        .iter()
        .position(|op| matches!(op, Operation::Mount { .. }))
        .unwrap();
    assert!(wipefs_at < mklabel_at);
    assert!(mklabel_at < format_at);
    assert!(format_at < mount_at);
    assert!(matches!(ops.last(), Some(Operation::Sync)));

    // Both partitions unmounted at the end.
    let unmounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Unmount { .. }))
        .count();
    assert_eq!(unmounts, 2);

    // Manifest file landed on the first mounted partition.
    assert!(h.work.path().join("p1/usbforge-manifest.json").exists());
    assert!(h.work.path().join("p2/payload/app.bin").exists());
    assert!(h.work.path().join("p1/bootx64.efi").exists());
}

#[test]
fn system_disk_is_refused_before_any_device_operation() {
    let h = Harness::new();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = SourceFileSet::new()
        .with("bootloader", "/tmp/boot.efi")
        .with("payload", "/tmp/payload");
    let mut device = fake_device(8000);
    device.system_disk = true;
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::ValidatingSafety);
            assert!(matches!(report.error, BuildError::SafetyBlocked { .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.hal.operation_count(), 0);
}

#[test]
fn non_removable_device_is_refused() {
    let h = Harness::new();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = SourceFileSet::new()
        .with("bootloader", "/tmp/boot.efi")
        .with("payload", "/tmp/payload");
    let mut device = fake_device(8000);
    device.removable = false;
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => match report.error {
            BuildError::SafetyBlocked { risk, .. } => assert_eq!(risk, "dangerous"),
            other => panic!("expected SafetyBlocked, got {other:?}"),
        },
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.hal.destructive_count(), 0);
}

#[test]
fn missing_required_source_blocks_the_build() {
    let h = Harness::new();
    let recipe = DeploymentRecipe::custom_payload();
    // "payload" is required but absent.
    let sources = SourceFileSet::new().with("bootloader", "/tmp/boot.efi");
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => match report.error {
            BuildError::SafetyBlocked { factors, .. } => {
                assert!(factors.iter().any(|f| f.contains("payload")))
            }
            other => panic!("expected SafetyBlocked, got {other:?}"),
        },
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.hal.operation_count(), 0);
}

#[test]
fn format_failure_rolls_back_in_reverse_order() {
    let h = Harness::new();
    // Second partition's mkfs fails.
    h.hal.fail_matching(FailureRule::new(
        OpKind::Format,
        "fake2",
        "mkfs: device busy",
    ));
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::FormattingPartitions);
            assert!(matches!(report.error, BuildError::DeviceOperation { .. }));
            assert!(report.rollback_failures.is_empty());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(session.ledger.is_empty());

    // Rollback wiped the formatted partition, then the table, then the
    // whole-disk signatures, newest first.
    let wipes: Vec<_> = h
        .hal
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Wipefs { device } => Some(device),
            _ => None,
        })
        .collect();
    // Initial prepare wipe + three compensations.
    assert_eq!(wipes.len(), 4);
    assert!(wipes[1].to_string_lossy().contains("fake1"));
}

#[test]
fn mount_failure_still_unmounts_partitions_mounted_earlier() {
    let h = Harness::new();
    // Second partition's mount fails; the first must stay tracked.
    h.hal.fail_matching(FailureRule::new(
        OpKind::Mount,
        "fake2",
        "mount: no medium found",
    ));
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::MountingPartitions);
            assert!(matches!(report.error, BuildError::DeviceOperation { .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(session.ledger.is_empty());
    assert!(session.mounts.is_empty());

    let ops = h.hal.operations();
    // Only the first partition ever mounted, and rollback unmounted
    // exactly that mount point.
    let mounts: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::Mount { target, .. } => Some(target.clone()),
            _ => None,
        })
        .collect();
    let unmounts: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::Unmount { target } => Some(target.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(mounts.len(), 1);
    assert_eq!(unmounts, mounts);

    // LIFO replay: the unmount runs before any compensation wipe.
    let unmount_at = ops
        .iter()
        .position(|op| matches!(op, Operation::Unmount { .. }))
        .unwrap();
    let wipe_positions: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Operation::Wipefs { .. }))
        .map(|(i, _)| i)
        .collect();
    // Prepare-device wipe plus four compensations (two format
    // signatures, the partition table, the whole-disk signatures).
    assert_eq!(wipe_positions.len(), 5);
    assert!(wipe_positions[1..].iter().all(|&i| i > unmount_at));
}

#[test]
fn payload_failure_keeps_partitions_and_unmounts_only() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    // Bootloader exists, payload path does not: deploy fails on copy.
    std::fs::write(srcdir.path().join("bootx64.efi"), "boot").unwrap();
    let sources = SourceFileSet::new()
        .with("bootloader", srcdir.path().join("bootx64.efi"))
        .with("payload", srcdir.path().join("missing"));
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::DeployingPayload);
            assert!(matches!(report.error, BuildError::PayloadDeployment(_)));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(session.ledger.is_empty());

    let ops = h.hal.operations();
    // Only the prepare-device wipe; no destructive rollback.
    let wipes = ops
        .iter()
        .filter(|op| matches!(op, Operation::Wipefs { .. }))
        .count();
    assert_eq!(wipes, 1);
    // Both mounts cleaned up.
    let unmounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Unmount { .. }))
        .count();
    assert_eq!(unmounts, 2);
}

#[test]
fn bootloader_failure_keeps_device_layout_and_unmounts() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    // Payload stages fine; the bootloader file is gone by the time the
    // boot path is configured.
    std::fs::create_dir_all(srcdir.path().join("payload")).unwrap();
    std::fs::write(srcdir.path().join("payload/app.bin"), "app").unwrap();
    let sources = SourceFileSet::new()
        .with("bootloader", srcdir.path().join("missing.efi"))
        .with("payload", srcdir.path().join("payload"));
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::ConfiguringBootloader);
            assert!(matches!(report.error, BuildError::PayloadDeployment(_)));
            assert!(report.error.preserves_device_state());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(session.ledger.is_empty());
    assert!(session.mounts.is_empty());

    let ops = h.hal.operations();
    // Partitioning survives: only the prepare-device wipe ran.
    let wipes = ops
        .iter()
        .filter(|op| matches!(op, Operation::Wipefs { .. }))
        .count();
    assert_eq!(wipes, 1);
    let unmounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Unmount { .. }))
        .count();
    assert_eq!(unmounts, 2);
    // The staged payload stays on the partition.
    assert!(h.work.path().join("p2/payload/app.bin").exists());
}

#[test]
fn pre_set_cancel_flag_stops_before_device_access() {
    let h = Harness::new();
    h.cancel.store(true, Ordering::SeqCst);
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    assert!(matches!(outcome, BuildOutcome::Cancelled { .. }));
    assert_eq!(session.state(), BuildState::Cancelled);
    assert_eq!(h.hal.destructive_count(), 0);
}

#[test]
fn dry_run_touches_nothing_destructive() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::macos_oclp();
    let sources = SourceFileSet::new()
        .with("macos_installer", srcdir.path().join("installer"))
        .with("opencore_efi", srcdir.path().join("efi"));
    let device = fake_device(32_000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(true, false).run(&input, &mut session);
    match outcome {
        BuildOutcome::Completed { manifest } => assert!(manifest.is_none()),
        other => panic!("expected Completed, got {other:?}"),
    }
    assert_eq!(h.hal.destructive_count(), 0);
    assert!(!h
        .hal
        .operations()
        .iter()
        .any(|op| matches!(op, Operation::Mount { .. })));
}

#[test]
fn unconfirmed_destructive_run_is_refused_up_front() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, false).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::Initializing);
            assert!(matches!(report.error, BuildError::Configuration(_)));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.hal.operation_count(), 0);
}

#[test]
fn fixed_sizes_beyond_capacity_are_blocked_at_safety() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::multiboot();
    let sources = custom_sources(srcdir.path());
    // Multiboot needs well over 1 GiB of fixed partitions.
    let device = fake_device(1000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::ValidatingSafety);
            assert!(matches!(report.error, BuildError::SafetyBlocked { .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.hal.operation_count(), 0);
}

#[test]
fn insufficient_space_fails_before_formatting() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    // 512 MiB of fixed partitions fit, but offset + trailer + the
    // minimum remaining-space extent do not.
    let device = fake_device(517);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let outcome = h.pipeline(false, true).run(&input, &mut session);
    match outcome {
        BuildOutcome::Failed(report) => {
            assert_eq!(report.state, BuildState::CreatingPartitions);
            assert!(matches!(report.error, BuildError::InsufficientSpace { .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    // The prepare-device wipe is compensated during rollback.
    assert!(session.ledger.is_empty());
    assert!(!h
        .hal
        .operations()
        .iter()
        .any(|op| matches!(op, Operation::Format { .. })));
}

/// Delegating HAL that flips the cancel flag once partitions start
/// mounting, so cancellation lands at the boundary before
/// DeployingPayload.
#[derive(Clone)]
struct CancelOnMount {
    inner: FakeHal,
    cancel: Arc<AtomicBool>,
}

impl usbforge_hal::PartitionOps for CancelOnMount {
    fn wipefs_all(
        &self,
        device: &std::path::Path,
        opts: &usbforge_hal::WipeOptions,
    ) -> usbforge_hal::HalResult<()> {
        self.inner.wipefs_all(device, opts)
    }

    fn parted(
        &self,
        disk: &std::path::Path,
        op: &PartedOp,
        opts: &usbforge_hal::PartedOptions,
    ) -> usbforge_hal::HalResult<String> {
        self.inner.parted(disk, op, opts)
    }
}

impl usbforge_hal::FormatOps for CancelOnMount {
    fn format(
        &self,
        device: &std::path::Path,
        fs: usbforge_hal::FsKind,
        label: &str,
        opts: &usbforge_hal::FormatOptions,
    ) -> usbforge_hal::HalResult<()> {
        self.inner.format(device, fs, label, opts)
    }
}

impl usbforge_hal::MountOps for CancelOnMount {
    fn mount_device(
        &self,
        device: &std::path::Path,
        target: &std::path::Path,
        fstype: Option<&str>,
        options: usbforge_hal::MountOptions,
        dry_run: bool,
    ) -> usbforge_hal::HalResult<()> {
        self.cancel.store(true, Ordering::SeqCst);
        self.inner.mount_device(device, target, fstype, options, dry_run)
    }

    fn unmount(&self, target: &std::path::Path, dry_run: bool) -> usbforge_hal::HalResult<()> {
        self.inner.unmount(target, dry_run)
    }

    fn is_mounted(&self, path: &std::path::Path) -> usbforge_hal::HalResult<bool> {
        self.inner.is_mounted(path)
    }
}

impl usbforge_hal::SystemOps for CancelOnMount {
    fn sync(&self) -> usbforge_hal::HalResult<()> {
        self.inner.sync()
    }

    fn partprobe(&self, disk: &std::path::Path) -> usbforge_hal::HalResult<()> {
        self.inner.partprobe(disk)
    }

    fn udev_settle(&self) -> usbforge_hal::HalResult<()> {
        self.inner.udev_settle()
    }
}

impl usbforge_hal::ProbeOps for CancelOnMount {
    fn lsblk_mountpoints(
        &self,
        disk: &std::path::Path,
    ) -> usbforge_hal::HalResult<Vec<std::path::PathBuf>> {
        self.inner.lsblk_mountpoints(disk)
    }
}

#[test]
fn cancellation_after_mounting_rolls_back_and_clears_mounts() {
    let h = Harness::new();
    let hal = CancelOnMount {
        inner: h.hal.clone(),
        cancel: h.cancel.clone(),
    };
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();

    let validator = StandardSafetyValidator {
        assume_sources_exist: true,
    };
    let pipeline = BuildPipeline::new(Arc::new(hal), Arc::new(validator)).confirmed(true);
    let outcome = pipeline.run(&input, &mut session);
    assert!(matches!(outcome, BuildOutcome::Cancelled { .. }));
    assert_eq!(session.state(), BuildState::Cancelled);
    assert!(session.ledger.is_empty());
    assert!(session.mounts.is_empty());

    // Every mount got a matching unmount during rollback.
    let ops = h.hal.operations();
    let mounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Mount { .. }))
        .count();
    let unmounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Unmount { .. }))
        .count();
    assert_eq!(mounts, 2);
    assert_eq!(unmounts, 2);
    // No payload was staged.
    assert!(!h.work.path().join("p2/payload").exists());
}

#[test]
fn cancel_during_payload_staging_unmounts_before_reporting_cancelled() {
    let h = Harness::new();
    let srcdir = TempDir::new().unwrap();
    let recipe = DeploymentRecipe::custom_payload();
    let sources = custom_sources(srcdir.path());
    let device = fake_device(8000);
    let input = BuildInput {
        device: &device,
        recipe: &recipe,
        sources: &sources,
        profile: None,
    };
    let mut session = h.session();
    let pipeline = h.pipeline(false, true);

    pipeline.initialize(&input, &mut session).unwrap();
    pipeline.validate_safety(&input, &mut session).unwrap();
    pipeline.prepare_device(&input, &mut session).unwrap();
    pipeline.create_partitions(&input, &mut session).unwrap();
    pipeline.format_partitions(&input, &mut session).unwrap();
    pipeline.mount_partitions(&input, &mut session).unwrap();
    pipeline.deploy_payload(&input, &mut session).unwrap();

    // Cancellation arrives while files are staging; the flag is only
    // observed at the next state boundary.
    h.cancel.store(true, Ordering::SeqCst);
    let outcome = pipeline.conclude(session.check_cancel().map(|()| None), &mut session);

    assert!(matches!(outcome, BuildOutcome::Cancelled { .. }));
    assert_eq!(session.state(), BuildState::Cancelled);
    assert!(session.ledger.is_empty());
    assert!(session.mounts.is_empty());

    // Every mounted partition was unmounted before Cancelled surfaced.
    let ops = h.hal.operations();
    let mounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Mount { .. }))
        .count();
    let unmounts = ops
        .iter()
        .filter(|op| matches!(op, Operation::Unmount { .. }))
        .count();
    assert_eq!(mounts, 2);
    assert_eq!(unmounts, 2);
    // Cancellation does not delete files already staged.
    assert!(h.work.path().join("p2/payload/app.bin").exists());
}

#[test]
fn repeat_builds_produce_identical_manifests_except_timestamp() {
    let recipe = DeploymentRecipe::custom_payload();
    let device = fake_device(8000);

    let build_once = || {
        let h = Harness::new();
        let srcdir = TempDir::new().unwrap();
        let sources = custom_sources(srcdir.path());
        let input = BuildInput {
            device: &device,
            recipe: &recipe,
            sources: &sources,
            profile: None,
        };
        let mut session = h.session();
        match h.pipeline(false, true).run(&input, &mut session) {
            BuildOutcome::Completed { manifest } => manifest.unwrap(),
            other => panic!("expected Completed, got {other:?}"),
        }
    };

    let a = build_once();
    let b = build_once();
    assert_eq!(a.recipe_name, b.recipe_name);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(a.deployment_type, b.deployment_type);
    assert_eq!(a.device, b.device);
    assert_eq!(
        serde_json::to_value(&a.partitions.iter().map(|p| &p.name).collect::<Vec<_>>()).unwrap(),
        serde_json::to_value(&b.partitions.iter().map(|p| &p.name).collect::<Vec<_>>()).unwrap()
    );
}
