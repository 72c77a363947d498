//! Host platform utility functions

use std::path::PathBuf;
use thiserror::Error;

/// Environment variable pointing at the root of the arm software install.
///
/// The `params` and `sessions` directories are resolved relative to this
/// path.
pub const SW_ROOT_ENV_VAR: &str = "ARM_SW_ROOT";

/// Errors associated with host information.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (ARM_SW_ROOT) is not set")]
    SwRootNotSet,
}

/// Get the root directory of the arm software install.
pub fn get_arm_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}

/// Get a one line description of the host platform.
pub fn get_host_description() -> String {
    format!(
        "{} {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::consts::FAMILY
    )
}
