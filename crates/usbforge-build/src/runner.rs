//! Background execution: one build per worker thread with a progress
//! channel and a cancel handle.

use crate::device::TargetDevice;
use crate::pipeline::{BuildInput, BuildOutcome, BuildPipeline, FailureReport};
use crate::profile::HardwareProfile;
use crate::progress::{BuildState, ProgressUpdate};
use crate::recipe::DeploymentRecipe;
use crate::safety::{SafetyValidator, StandardSafetyValidator};
use crate::session::BuildSession;
use crate::sources::SourceFileSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use usbforge_error::BuildError;
use usbforge_hal::DiskOps;

/// Progress events buffered before a slow consumer starts dropping
/// them.
const PROGRESS_CHANNEL_DEPTH: usize = 256;

/// Everything needed to run one build.
pub struct BuildRequest {
    pub device: TargetDevice,
    pub recipe: DeploymentRecipe,
    pub sources: SourceFileSet,
    pub profile: Option<HardwareProfile>,
    pub dry_run: bool,
    pub confirmed: bool,
}

/// Handle to a running build.
pub struct SessionHandle {
    cancel: Arc<AtomicBool>,
    progress_rx: Receiver<ProgressUpdate>,
    join: JoinHandle<BuildOutcome>,
}

impl SessionHandle {
    /// Request cooperative cancellation. The in-flight operation runs
    /// to completion; the build stops at the next state boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn progress(&self) -> &Receiver<ProgressUpdate> {
        &self.progress_rx
    }

    /// Block until the build reaches a terminal state.
    pub fn await_outcome(self) -> BuildOutcome {
        match self.join.join() {
            Ok(outcome) => outcome,
            Err(_) => BuildOutcome::Failed(FailureReport {
                state: BuildState::Failed,
                error: BuildError::Configuration("build worker panicked".to_string()),
                log_tail: Vec::new(),
                rollback_failures: Vec::new(),
            }),
        }
    }
}

/// Spawns builds onto worker threads.
pub struct PipelineRunner {
    hal: Arc<dyn DiskOps>,
    validator: Arc<dyn SafetyValidator>,
}

impl PipelineRunner {
    pub fn new(hal: Arc<dyn DiskOps>) -> Self {
        Self {
            hal,
            validator: Arc::new(StandardSafetyValidator::new()),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SafetyValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Start a build in the background. The returned handle is the only
    /// way to cancel or observe it.
    pub fn submit(&self, request: BuildRequest) -> std::io::Result<SessionHandle> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (progress_tx, progress_rx) = mpsc::sync_channel(PROGRESS_CHANNEL_DEPTH);

        let pipeline = BuildPipeline::new(Arc::clone(&self.hal), Arc::clone(&self.validator))
            .dry_run(request.dry_run)
            .confirmed(request.confirmed);
        let thread_cancel = Arc::clone(&cancel);

        let join = thread::Builder::new()
            .name("usbforge-build".to_string())
            .spawn(move || {
                let work_dir = match tempfile::Builder::new().prefix("usbforge-").tempdir() {
                    Ok(dir) => dir,
                    Err(e) => {
                        return BuildOutcome::Failed(FailureReport {
                            state: BuildState::Initializing,
                            error: BuildError::Configuration(format!(
                                "cannot create work directory: {}",
                                e
                            )),
                            log_tail: Vec::new(),
                            rollback_failures: Vec::new(),
                        })
                    }
                };
                let mut session = BuildSession::new(
                    thread_cancel,
                    Some(progress_tx),
                    work_dir.path().to_path_buf(),
                );
                let input = BuildInput {
                    device: &request.device,
                    recipe: &request.recipe,
                    sources: &request.sources,
                    profile: request.profile.as_ref(),
                };
                pipeline.run(&input, &mut session)
            })?;

        Ok(SessionHandle {
            cancel,
            progress_rx,
            join,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake_device;
    use crate::safety::StandardSafetyValidator;
    use std::fs;
    use tempfile::TempDir;
    use usbforge_hal::FakeHal;

    fn runner(hal: &FakeHal) -> PipelineRunner {
        PipelineRunner::new(Arc::new(hal.clone())).with_validator(Arc::new(
            StandardSafetyValidator {
                assume_sources_exist: true,
            },
        ))
    }

    fn custom_request(srcdir: &TempDir, dry_run: bool) -> BuildRequest {
        fs::write(srcdir.path().join("bootx64.efi"), "boot").unwrap();
        fs::create_dir_all(srcdir.path().join("payload")).unwrap();
        fs::write(srcdir.path().join("payload/app.bin"), "app").unwrap();
        BuildRequest {
            device: fake_device(8000),
            recipe: DeploymentRecipe::custom_payload(),
            sources: SourceFileSet::new()
                .with("bootloader", srcdir.path().join("bootx64.efi"))
                .with("payload", srcdir.path().join("payload")),
            profile: None,
            dry_run,
            confirmed: !dry_run,
        }
    }

    #[test]
    fn submitted_build_completes_and_streams_progress() {
        let hal = FakeHal::new();
        let srcdir = TempDir::new().unwrap();
        let handle = runner(&hal).submit(custom_request(&srcdir, false)).unwrap();

        let outcome = handle.await_outcome();
        assert!(matches!(
            outcome,
            BuildOutcome::Completed { manifest: Some(_) }
        ));
    }

    #[test]
    fn progress_channel_reports_every_working_state() {
        let hal = FakeHal::new();
        let srcdir = TempDir::new().unwrap();
        let handle = runner(&hal).submit(custom_request(&srcdir, false)).unwrap();

        let mut started = Vec::new();
        // Drain until the worker hangs up.
        while let Ok(update) = handle.progress().recv() {
            if let ProgressUpdate::StateStarted { state, .. } = update {
                started.push(state);
            }
        }
        assert_eq!(started, BuildState::WORKING.to_vec());
        assert!(matches!(
            handle.await_outcome(),
            BuildOutcome::Completed { .. }
        ));
    }

    #[test]
    fn cancelled_build_reports_cancelled() {
        let hal = FakeHal::new();
        let srcdir = TempDir::new().unwrap();
        let handle = runner(&hal).submit(custom_request(&srcdir, false)).unwrap();
        handle.cancel();
        // Cancellation may land at any boundary, or lose the race with
        // a fast build; both are valid terminal states.
        match handle.await_outcome() {
            BuildOutcome::Cancelled { .. } | BuildOutcome::Completed { .. } => {}
            other => panic!("expected terminal outcome, got {other:?}"),
        }
    }

    #[test]
    fn dry_run_request_completes_without_manifest() {
        let hal = FakeHal::new();
        let srcdir = TempDir::new().unwrap();
        let handle = runner(&hal).submit(custom_request(&srcdir, true)).unwrap();
        match handle.await_outcome() {
            BuildOutcome::Completed { manifest } => assert!(manifest.is_none()),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(hal.destructive_count(), 0);
    }
}
