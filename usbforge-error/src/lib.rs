//! Error taxonomy shared across the usbforge workspace.
//!
//! Every variant here is a terminal classification the pipeline reports
//! to callers; transient diagnostics stay inside the HAL layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    /// Bad recipe or request, detected before any device I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Fixed-size partitions alone exceed device capacity. Pre-I/O.
    #[error("insufficient space: fixed partitions need {required_mib} MiB, device offers {available_mib} MiB")]
    InsufficientSpace {
        required_mib: u64,
        available_mib: u64,
    },

    /// The safety gate refused the target. Never overridable, never retried.
    #[error("safety gate refused the target device ({risk}): {}", .factors.join("; "))]
    SafetyBlocked { risk: String, factors: Vec<String> },

    /// A destructive platform operation failed. Fatal; triggers full rollback.
    #[error("device operation failed during {state}: {diagnostic}")]
    DeviceOperation { state: String, diagnostic: String },

    /// File staging failed. The device keeps its partitions and formats;
    /// only mounts are cleaned up.
    #[error("payload deployment failed: {0}")]
    PayloadDeployment(String),

    /// Cooperative cancellation observed at a state boundary.
    #[error("build cancelled by operator")]
    Cancelled,
}

impl BuildError {
    /// Whether rollback may wipe what the build created on the device.
    /// Payload failures deliberately leave partitioning intact.
    pub fn preserves_device_state(&self) -> bool {
        matches!(self, BuildError::PayloadDeployment(_))
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
