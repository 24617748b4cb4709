//! Deployment recipes: immutable templates describing what goes on the
//! target device.
//!
//! Built-in recipes cover the five supported deployment types; custom
//! recipes load from JSON files with the same schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use usbforge_error::BuildError;
use usbforge_hal::{FsKind, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentType {
    MacOsOclp,
    WindowsUnattended,
    LinuxAutomated,
    Multiboot,
    Custom,
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentType::MacOsOclp => "macOS/OCLP",
            DeploymentType::WindowsUnattended => "Windows unattended",
            DeploymentType::LinuxAutomated => "Linux automated",
            DeploymentType::Multiboot => "Multi-boot",
            DeploymentType::Custom => "Custom payload",
        };
        write!(f, "{}", name)
    }
}

/// Requested partition size. At most one `Remaining` per recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSize {
    Mib(u64),
    Remaining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub name: String,
    /// Volume label; defaults to the name when omitted.
    #[serde(default)]
    pub label: Option<String>,
    pub size: PartitionSize,
    pub fs: FsKind,
    #[serde(default)]
    pub bootable: bool,
}

impl PartitionSpec {
    pub fn new(name: &str, size: PartitionSize, fs: FsKind) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            size,
            fs,
            bootable: false,
        }
    }

    pub fn bootable(mut self) -> Self {
        self.bootable = true;
        self
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecipe {
    pub name: String,
    pub description: String,
    pub deployment_type: DeploymentType,
    pub scheme: TableKind,
    pub partitions: Vec<PartitionSpec>,
    pub required_files: Vec<String>,
    #[serde(default)]
    pub optional_files: Vec<String>,
    #[serde(default)]
    pub verification_steps: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DeploymentRecipe {
    /// Check recipe invariants. Called before any device I/O.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.partitions.is_empty() {
            return Err(BuildError::Configuration(format!(
                "recipe '{}' defines no partitions",
                self.name
            )));
        }
        let remaining = self
            .partitions
            .iter()
            .filter(|p| p.size == PartitionSize::Remaining)
            .count();
        if remaining > 1 {
            return Err(BuildError::Configuration(format!(
                "recipe '{}' requests remaining-space for {} partitions; at most one is allowed",
                self.name, remaining
            )));
        }
        Ok(())
    }

    /// Sum of all fixed partition sizes in MiB.
    pub fn fixed_size_mib(&self) -> u64 {
        self.partitions
            .iter()
            .filter_map(|p| match p.size {
                PartitionSize::Mib(mib) => Some(mib),
                PartitionSize::Remaining => None,
            })
            .sum()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let recipe: Self = serde_json::from_str(&content)?;
        recipe
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(recipe)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn macos_oclp() -> Self {
        Self {
            name: "macOS with OpenCore Legacy Patcher".to_string(),
            description: "Bootable macOS installer with OCLP for legacy Mac hardware".to_string(),
            deployment_type: DeploymentType::MacOsOclp,
            scheme: TableKind::Gpt,
            partitions: vec![
                PartitionSpec::new("EFI", PartitionSize::Mib(200), FsKind::Fat32).bootable(),
                PartitionSpec::new("macOS Installer", PartitionSize::Remaining, FsKind::HfsPlus)
                    .labeled("Install macOS"),
                PartitionSpec::new("OCLP Tools", PartitionSize::Mib(1024), FsKind::Fat32)
                    .labeled("OCLP-Tools"),
            ],
            required_files: vec!["macos_installer".to_string(), "opencore_efi".to_string()],
            optional_files: vec!["oclp_app".to_string()],
            verification_steps: vec![
                "verify_efi_boot".to_string(),
                "verify_oclp_installation".to_string(),
            ],
            metadata: BTreeMap::new(),
        }
    }

    pub fn windows_unattended() -> Self {
        Self {
            name: "Windows Unattended Installation".to_string(),
            description: "Windows installer with automated setup and driver injection".to_string(),
            deployment_type: DeploymentType::WindowsUnattended,
            scheme: TableKind::Gpt,
            partitions: vec![
                PartitionSpec::new("System Reserved", PartitionSize::Mib(100), FsKind::Fat32)
                    .bootable(),
                PartitionSpec::new("Windows", PartitionSize::Remaining, FsKind::Ntfs),
                PartitionSpec::new("Drivers", PartitionSize::Mib(2048), FsKind::Fat32),
            ],
            required_files: vec!["windows_image".to_string(), "autounattend".to_string()],
            optional_files: vec!["driver_pack".to_string(), "software_bundle".to_string()],
            verification_steps: vec!["verify_boot_files".to_string()],
            metadata: BTreeMap::new(),
        }
    }

    pub fn linux_automated() -> Self {
        Self {
            name: "Linux Automated Installation".to_string(),
            description: "Automated Linux installer with preseed configuration".to_string(),
            deployment_type: DeploymentType::LinuxAutomated,
            scheme: TableKind::Gpt,
            partitions: vec![
                PartitionSpec::new("EFI", PartitionSize::Mib(200), FsKind::Fat32).bootable(),
                PartitionSpec::new("Linux Install", PartitionSize::Remaining, FsKind::Ext4)
                    .labeled("Linux-Install"),
                PartitionSpec::new("Data", PartitionSize::Mib(2048), FsKind::Ext4),
            ],
            required_files: vec!["linux_image".to_string(), "preseed".to_string()],
            optional_files: vec!["extra_packages".to_string()],
            verification_steps: vec!["verify_boot_files".to_string()],
            metadata: BTreeMap::new(),
        }
    }

    pub fn multiboot() -> Self {
        Self {
            name: "Multi-Boot Deployment".to_string(),
            description: "Multiple OS installers behind a shared boot menu".to_string(),
            deployment_type: DeploymentType::Multiboot,
            scheme: TableKind::Gpt,
            partitions: vec![
                PartitionSpec::new("BOOT", PartitionSize::Mib(512), FsKind::Fat32).bootable(),
                PartitionSpec::new("OS1", PartitionSize::Mib(8192), FsKind::Ntfs),
                PartitionSpec::new("OS2", PartitionSize::Mib(8192), FsKind::Ext4),
                PartitionSpec::new("Shared", PartitionSize::Remaining, FsKind::ExFat)
                    .labeled("SHARED"),
            ],
            required_files: vec!["bootloader".to_string()],
            optional_files: vec!["os1_image".to_string(), "os2_image".to_string()],
            verification_steps: vec!["verify_boot_menu".to_string()],
            metadata: BTreeMap::new(),
        }
    }

    pub fn custom_payload() -> Self {
        Self {
            name: "Custom Payload Deployment".to_string(),
            description: "Flexible bootable payload deployment".to_string(),
            deployment_type: DeploymentType::Custom,
            scheme: TableKind::Gpt,
            partitions: vec![
                PartitionSpec::new("BOOT", PartitionSize::Mib(512), FsKind::Fat32).bootable(),
                PartitionSpec::new("PAYLOAD", PartitionSize::Remaining, FsKind::ExFat),
            ],
            required_files: vec!["bootloader".to_string(), "payload".to_string()],
            optional_files: Vec::new(),
            verification_steps: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// All built-in recipes, one per deployment type.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::macos_oclp(),
            Self::windows_unattended(),
            Self::linux_automated(),
            Self::multiboot(),
            Self::custom_payload(),
        ]
    }
}
