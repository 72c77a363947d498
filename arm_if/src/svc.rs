//! # Arm service interfaces
//!
//! Traits implemented by the equipment services the control software talks
//! to. The executable is generic over these so that the same control loop
//! runs against the simulated arm and against real hardware clients.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use thiserror::Error;

use crate::eqpt::arm::{EePose, JointObs, PoseJacResponse, NUM_JOINTS};

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Errors returned by the arm equipment services.
#[derive(Debug, Error)]
pub enum SvcError {
    #[error("The service is not connected")]
    NotConnected,

    #[error("The service rejected the request: {0}")]
    InvalidRequest(String),

    #[error("The service returned an error: {0}")]
    ResponseError(String),
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Provides joint and end-effector observations.
pub trait ObservationProvider {
    /// Get the current observation of the arm.
    fn get_observation(&mut self) -> Result<JointObs, SvcError>;
}

/// Provides raw pose/Jacobian payloads for the configured arm.
pub trait PoseJacProvider {
    /// Get the current pose/Jacobian payload for the given arm.
    fn get_pose_jac(&mut self, arm_id: &str) -> Result<PoseJacResponse, SvcError>;
}

/// Solves inverse kinematics for end-effector pose targets.
pub trait IkProvider {
    /// Solve for the joint angles reaching `target`, seeded with the current
    /// joint angles. An infeasible target is an [`SvcError`], the caller
    /// decides whether to treat it as fatal.
    fn solve_ik(
        &mut self,
        target: &EePose,
        seed_angles_rad: &[f64; NUM_JOINTS],
    ) -> Result<[f64; NUM_JOINTS], SvcError>;
}

/// Dispatches demands to the arm actuators.
pub trait ActionDispatcher {
    /// Send joint torque demands, replacing any previously commanded torques.
    fn send_torques(&mut self, torques_nm: &[f64; NUM_JOINTS]) -> Result<(), SvcError>;

    /// Send joint angle demands.
    fn send_angles(&mut self, angles_rad: &[f64; NUM_JOINTS]) -> Result<(), SvcError>;
}

/// The full set of services the control loop needs.
///
/// Blanket-implemented for anything providing all four interfaces.
pub trait ArmServices:
    ObservationProvider + PoseJacProvider + IkProvider + ActionDispatcher
{
}

impl<T> ArmServices for T where
    T: ObservationProvider + PoseJacProvider + IkProvider + ActionDispatcher
{
}
