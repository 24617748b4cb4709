//! Hardware profile handed in by the external matcher.
//!
//! Used for manifest metadata and strategy hints only; the pipeline
//! never computes match scores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Mac,
    Windows,
    Linux,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub name: String,
    pub platform: Platform,
    /// Vendor model identifier, e.g. `iMacPro1,1`.
    pub model: String,
    pub architecture: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub driver_packages: Vec<String>,
}

impl HardwareProfile {
    /// Short identity string recorded in the build manifest.
    pub fn identity(&self) -> String {
        format!("{} ({})", self.name, self.model)
    }

    pub fn generic_x64() -> Self {
        Self {
            name: "Generic x64 PC".to_string(),
            platform: Platform::Windows,
            model: "generic_x64".to_string(),
            architecture: "x86_64".to_string(),
            year: None,
            driver_packages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_includes_model() {
        let p = HardwareProfile::generic_x64();
        assert_eq!(p.identity(), "Generic x64 PC (generic_x64)");
    }
}
