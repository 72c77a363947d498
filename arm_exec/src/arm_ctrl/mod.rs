//! Arm control module

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_position;
mod calc_torque;
mod params;
mod reset;
mod safety_box;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use reset::*;
pub use safety_box::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("A torque command needs pose/Jacobian data but none is available")]
    NoPoseJacData,

    #[error("Recieved a command that is not valid in {mode:?} mode: {cmd:?}")]
    CmdModeMismatch {
        mode: arm_if::eqpt::arm::ControlMode,
        cmd: arm_if::tc::arm_ctrl::ArmCmd,
    },
}

/// Possible errors that can occur when initialising ArmCtrl.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlInitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("Parameters are invalid: {0}")]
    InvalidParams(#[from] ParamsError),
}
