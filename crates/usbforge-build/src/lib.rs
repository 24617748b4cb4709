//! usbforge build core.
//!
//! Takes a validated deployment recipe plus a target device and drives
//! it through safety-gated, partially-reversible build steps: device
//! preparation, partitioning, formatting, mounting, payload staging,
//! bootloader configuration and finalization, with rollback-on-failure
//! semantics throughout.

pub mod device;
pub mod ledger;
pub mod manifest;
pub mod pipeline;
pub mod planner;
pub mod profile;
pub mod progress;
pub mod recipe;
pub mod runner;
pub mod safety;
pub mod session;
pub mod sources;
pub mod strategy;

pub use device::TargetDevice;
pub use pipeline::{BuildInput, BuildOutcome, BuildPipeline, FailureReport};
pub use profile::{HardwareProfile, Platform};
pub use progress::{BuildState, ProgressUpdate};
pub use recipe::{DeploymentRecipe, DeploymentType, PartitionSize, PartitionSpec};
pub use runner::{BuildRequest, PipelineRunner, SessionHandle};
pub use safety::{RiskLevel, SafetyAssessment, SafetyValidator, StandardSafetyValidator};
pub use sources::SourceFileSet;
