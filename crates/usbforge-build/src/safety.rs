//! Safety gate: device risk classification and pre-build checks.
//!
//! The pipeline consumes the [`SafetyValidator`] trait; a build never
//! issues a destructive operation unless the verdict here is Safe or
//! Moderate. Blocked and Dangerous are unconditional hard stops with
//! no override anywhere in the API.

use crate::device::TargetDevice;
use crate::recipe::DeploymentRecipe;
use crate::sources::SourceFileSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Moderate,
    Dangerous,
    Blocked,
}

impl RiskLevel {
    /// Whether the pipeline may proceed to destructive steps.
    pub fn permits_build(&self) -> bool {
        matches!(self, RiskLevel::Safe | RiskLevel::Moderate)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Dangerous => "dangerous",
            RiskLevel::Blocked => "blocked",
        };
        write!(f, "{}", name)
    }
}

/// Risk classification for a target device.
#[derive(Debug, Clone)]
pub struct SafetyAssessment {
    pub risk: RiskLevel,
    pub factors: Vec<String>,
}

impl SafetyAssessment {
    pub fn safe() -> Self {
        Self {
            risk: RiskLevel::Safe,
            factors: Vec::new(),
        }
    }
}

/// A named prerequisite or source-file check result.
#[derive(Debug, Clone)]
pub struct SafetyCheck {
    pub name: String,
    pub risk: RiskLevel,
    pub message: String,
}

impl SafetyCheck {
    pub fn new(name: &str, risk: RiskLevel, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            risk,
            message: message.into(),
        }
    }
}

/// Validation surface the pipeline consumes before destructive steps.
pub trait SafetyValidator: Send + Sync {
    fn assess_device(&self, device: &TargetDevice) -> SafetyAssessment;

    fn check_prerequisites(&self) -> Vec<SafetyCheck>;

    fn check_source_files(
        &self,
        recipe: &DeploymentRecipe,
        sources: &SourceFileSet,
    ) -> Vec<SafetyCheck>;
}

/// Default validator with the stock classification rules.
#[derive(Debug, Clone, Default)]
pub struct StandardSafetyValidator {
    /// Skip filesystem existence probes for source paths (tests).
    pub assume_sources_exist: bool,
}

impl StandardSafetyValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SafetyValidator for StandardSafetyValidator {
    fn assess_device(&self, device: &TargetDevice) -> SafetyAssessment {
        let mut factors = Vec::new();
        let mut risk = RiskLevel::Safe;

        let mut raise = |level: RiskLevel, factors: &mut Vec<String>, factor: String| {
            factors.push(factor);
            if level > risk {
                risk = level;
            }
        };

        if device.system_disk {
            raise(
                RiskLevel::Blocked,
                &mut factors,
                format!("{} is the system disk", device.path.display()),
            );
        }
        if device.write_protected {
            raise(
                RiskLevel::Blocked,
                &mut factors,
                "device is write-protected".to_string(),
            );
        }
        if device.size_bytes == 0 {
            raise(
                RiskLevel::Blocked,
                &mut factors,
                "device reports zero capacity".to_string(),
            );
        }
        if !device.removable {
            raise(
                RiskLevel::Dangerous,
                &mut factors,
                "device is not removable media".to_string(),
            );
        }
        // Anything above typical USB stick capacity is suspicious enough
        // to warrant an operator double-take, but not a stop.
        const LARGE_DEVICE_BYTES: u64 = 2 * 1024 * 1024 * 1024 * 1024;
        if device.size_bytes > LARGE_DEVICE_BYTES {
            raise(
                RiskLevel::Moderate,
                &mut factors,
                format!(
                    "unusually large target ({} GiB)",
                    device.size_bytes / (1024 * 1024 * 1024)
                ),
            );
        }

        SafetyAssessment { risk, factors }
    }

    fn check_prerequisites(&self) -> Vec<SafetyCheck> {
        let mut checks = Vec::new();

        if nix::unistd::Uid::effective().is_root() {
            checks.push(SafetyCheck::new(
                "privileges",
                RiskLevel::Safe,
                "running with root privileges",
            ));
        } else {
            checks.push(SafetyCheck::new(
                "privileges",
                RiskLevel::Moderate,
                "not running as root; destructive operations may fail",
            ));
        }

        checks
    }

    fn check_source_files(
        &self,
        recipe: &DeploymentRecipe,
        sources: &SourceFileSet,
    ) -> Vec<SafetyCheck> {
        let mut checks = Vec::new();

        for key in &recipe.required_files {
            match sources.get(key) {
                None => checks.push(SafetyCheck::new(
                    key,
                    RiskLevel::Blocked,
                    format!("required source file '{}' not supplied", key),
                )),
                Some(path) if !self.assume_sources_exist && !path.exists() => {
                    checks.push(SafetyCheck::new(
                        key,
                        RiskLevel::Blocked,
                        format!("source path {} does not exist", path.display()),
                    ))
                }
                Some(_) => checks.push(SafetyCheck::new(key, RiskLevel::Safe, "present")),
            }
        }

        for key in &recipe.optional_files {
            if !sources.contains(key) {
                checks.push(SafetyCheck::new(
                    key,
                    RiskLevel::Moderate,
                    format!("optional source file '{}' not supplied", key),
                ));
            }
        }

        checks
    }
}
