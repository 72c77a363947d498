//! # Arm control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::eqpt::arm::NUM_JOINTS;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be executed by arm control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmCmd {
    /// A raw joint torque command.
    ///
    /// The torques are scaled and safety-shaped by arm control before they
    /// are dispatched to the actuators. Only valid in torque control mode.
    Torque {
        /// Desired torque for each joint.
        ///
        /// Units: newton metres
        torques_nm: [f64; NUM_JOINTS],
    },

    /// An end-effector position displacement command.
    ///
    /// The displacement is scaled, added to the current end-effector
    /// position and clamped into the end-effector safety box. The resulting
    /// target is reached through inverse kinematics. Only valid in position
    /// control mode.
    PositionDelta {
        /// Desired displacement of the end-effector in the base frame.
        ///
        /// Units: metres
        delta_m: [f64; 3],
    },

    /// Drive the arm back to its neutral joint configuration.
    ///
    /// Arm control runs its internal angle controller until all joints are
    /// within the convergence thresholds or the cycle budget runs out.
    Reset,

    /// Stop the arm by commanding zero torque on all joints.
    Stop,
}
