//! Build manifest written to the finished device.
//!
//! A single JSON file recording what the build produced, placed on a
//! tools/utilities partition when the recipe has one so the payload
//! volumes stay pristine.

use crate::planner::ConcretePartition;
use crate::profile::HardwareProfile;
use crate::recipe::DeploymentRecipe;
use crate::session::now_unix_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use usbforge_error::BuildError;

pub const MANIFEST_FILE_NAME: &str = "usbforge-manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPartition {
    pub number: u32,
    pub name: String,
    pub label: String,
    pub fs: String,
    pub size_mib: u64,
    pub bootable: bool,
}

impl From<&ConcretePartition> for ManifestPartition {
    fn from(p: &ConcretePartition) -> Self {
        Self {
            number: p.number,
            name: p.name.clone(),
            label: p.label.clone(),
            fs: p.fs.to_string(),
            size_mib: p.size_mib(),
            bootable: p.bootable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub tool_version: String,
    pub created_unix_ms: u64,
    pub recipe_name: String,
    pub deployment_type: String,
    pub target_profile: Option<String>,
    pub device: PathBuf,
    pub partitions: Vec<ManifestPartition>,
    /// Pipeline state when the manifest was written; `Finalizing` on a
    /// normal run, since the manifest lands before the final unmounts.
    pub outcome: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BuildManifest {
    pub fn new(
        recipe: &DeploymentRecipe,
        profile: Option<&HardwareProfile>,
        device: &Path,
        layout: &[ConcretePartition],
        outcome: &str,
    ) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            created_unix_ms: now_unix_ms(),
            recipe_name: recipe.name.clone(),
            deployment_type: recipe.deployment_type.to_string(),
            target_profile: profile.map(|p| p.identity()),
            device: device.to_path_buf(),
            partitions: layout.iter().map(ManifestPartition::from).collect(),
            outcome: outcome.to_string(),
            metadata: recipe.metadata.clone(),
        }
    }

    /// Serialize into `dir`, returning the written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, BuildError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::PayloadDeployment(format!("manifest encode: {}", e)))?;
        fs::write(&path, json).map_err(|e| {
            BuildError::PayloadDeployment(format!("manifest write to {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

/// Pick the partition the manifest lands on: a tools/utilities volume
/// when present, otherwise the first mounted partition.
pub fn manifest_partition<'a>(
    layout: &'a [ConcretePartition],
    mounts: &'a BTreeMap<String, PathBuf>,
) -> Option<(&'a ConcretePartition, &'a PathBuf)> {
    let mounted = |p: &&ConcretePartition| mounts.contains_key(&p.name);
    let preferred = layout.iter().filter(mounted).find(|p| {
        let lower = p.name.to_lowercase();
        lower.contains("tools") || lower.contains("utilities")
    });
    let chosen = preferred.or_else(|| layout.iter().find(mounted))?;
    let mount = mounts.get(&chosen.name)?;
    Some((chosen, mount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{plan, DEFAULT_START_OFFSET_MIB};
    use tempfile::TempDir;

    fn layout_for(recipe: &DeploymentRecipe) -> Vec<ConcretePartition> {
        plan(
            &recipe.partitions,
            32_000 * 1024 * 1024,
            DEFAULT_START_OFFSET_MIB,
        )
        .unwrap()
    }

    #[test]
    fn prefers_tools_partition() {
        let recipe = DeploymentRecipe::macos_oclp();
        let layout = layout_for(&recipe);
        let mut mounts = BTreeMap::new();
        for p in &layout {
            mounts.insert(p.name.clone(), PathBuf::from(format!("/mnt/{}", p.number)));
        }
        let (part, mount) = manifest_partition(&layout, &mounts).unwrap();
        assert!(part.name.contains("Tools"));
        assert_eq!(mount, &PathBuf::from(format!("/mnt/{}", part.number)));
    }

    #[test]
    fn falls_back_to_first_mounted() {
        let recipe = DeploymentRecipe::custom_payload();
        let layout = layout_for(&recipe);
        let mut mounts = BTreeMap::new();
        // Only the payload partition mounted.
        mounts.insert(layout[1].name.clone(), PathBuf::from("/mnt/payload"));
        let (part, _) = manifest_partition(&layout, &mounts).unwrap();
        assert_eq!(part.number, 2);
    }

    #[test]
    fn no_mounts_means_no_manifest_target() {
        let recipe = DeploymentRecipe::custom_payload();
        let layout = layout_for(&recipe);
        assert!(manifest_partition(&layout, &BTreeMap::new()).is_none());
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let recipe = DeploymentRecipe::windows_unattended();
        let layout = layout_for(&recipe);
        let manifest =
            BuildManifest::new(&recipe, None, Path::new("/dev/sdz"), &layout, "Finalizing");

        let dir = TempDir::new().unwrap();
        let path = manifest.write_to(dir.path()).unwrap();
        let loaded: BuildManifest =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.recipe_name, recipe.name);
        assert_eq!(loaded.partitions.len(), layout.len());
        assert_eq!(loaded.device, PathBuf::from("/dev/sdz"));
        assert_eq!(loaded.outcome, "Finalizing");
    }
}
