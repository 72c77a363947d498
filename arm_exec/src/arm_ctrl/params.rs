//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

use arm_if::eqpt::arm::{ControlMode, NUM_JOINTS};

use super::SafetyBox;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- GENERAL ----
    /// The control mode the session runs in. Fixed for the whole session.
    pub control_mode: ControlMode,

    /// The identifier of the arm the pose/Jacobian provider is queried for.
    pub arm_id: String,

    /// The names of the links monitored by the safety boundary, in the order
    /// the pose/Jacobian provider reports them.
    pub link_names: Vec<String>,

    // ---- SAFETY BOUNDARY ----
    /// Whether the safety boundary is evaluated at all. When false no
    /// pose/Jacobian data is requested and torques pass through unshaped
    /// (clamping still applies).
    pub use_safety_box: bool,

    /// Sharpness of the restoring force growth with penetration depth.
    ///
    /// Units: 1/meters
    pub safety_force_temperature: f64,

    /// Scale applied to the exponential restoring force.
    ///
    /// Units: newtons
    pub safety_force_magnitude: f64,

    /// The safety box used during normal operation.
    pub safety_box: SafetyBox,

    /// The safety box used while a reset is in progress. Wider than the
    /// normal box so the way back to neutral is never fought.
    pub reset_safety_box: SafetyBox,

    /// The box the end-effector position target is clamped into in position
    /// control mode.
    pub ee_safety_box: SafetyBox,

    // ---- TORQUE LIMITS ----
    /// Lowest joint torque commandable during normal operation.
    ///
    /// Units: newton metres
    pub joint_torque_low_nm: [f64; NUM_JOINTS],

    /// Highest joint torque commandable during normal operation.
    ///
    /// Units: newton metres
    pub joint_torque_high_nm: [f64; NUM_JOINTS],

    /// Lowest joint torque commandable while a reset is in progress.
    ///
    /// Units: newton metres
    pub reset_torque_low_nm: [f64; NUM_JOINTS],

    /// Highest joint torque commandable while a reset is in progress.
    ///
    /// Units: newton metres
    pub reset_torque_high_nm: [f64; NUM_JOINTS],

    // ---- ACTION SCALING ----
    /// Scale applied to torque commands before shaping.
    pub torque_action_scale: f64,

    /// Scale applied to end-effector displacement commands.
    pub position_action_scale: f64,

    // ---- RESET ----
    /// The neutral joint configuration a reset drives the arm towards.
    ///
    /// Units: radians
    pub reset_target_angles_rad: [f64; NUM_JOINTS],

    /// A joint is converged once its circular distance to the neutral angle
    /// falls below this threshold.
    ///
    /// Units: radians
    pub reset_angle_threshold_rad: f64,

    /// All joint velocity magnitudes must fall strictly below this threshold
    /// for the reset to be complete.
    ///
    /// Units: radians/second
    pub reset_velocity_threshold_rads: f64,

    /// Maximum number of control cycles a reset may run before it is
    /// abandoned.
    pub reset_max_cycles: u32,

    /// Proportional gains of the reset angle controller.
    pub reset_pd_kp: [f64; NUM_JOINTS],

    /// Derivative gains of the reset angle controller.
    pub reset_pd_kd: [f64; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors found when validating a loaded parameter set.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Safety box \"{0}\" has low > high on axis {1}")]
    InvalidSafetyBox(&'static str, usize),

    #[error("Torque bounds \"{0}\" have low > high for joint {1}")]
    InvalidTorqueBounds(&'static str, usize),

    #[error("No link names are configured but the safety box is enabled")]
    NoLinkNames,

    #[error("{0} must be positive, got {1}")]
    NonPositive(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Validate the loaded parameters.
    ///
    /// Boxes must have low <= high on every axis, torque bounds must be
    /// ordered, and the reset thresholds must be positive. Called once at
    /// init so the control loop never has to re-check them.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for &(name, sb) in [
            ("safety_box", &self.safety_box),
            ("reset_safety_box", &self.reset_safety_box),
            ("ee_safety_box", &self.ee_safety_box),
        ]
        .iter()
        {
            if let Some(axis) = sb.invalid_axis() {
                return Err(ParamsError::InvalidSafetyBox(name, axis));
            }
        }

        for &(name, low, high) in [
            (
                "joint_torque",
                &self.joint_torque_low_nm,
                &self.joint_torque_high_nm,
            ),
            (
                "reset_torque",
                &self.reset_torque_low_nm,
                &self.reset_torque_high_nm,
            ),
        ]
        .iter()
        {
            for j in 0..NUM_JOINTS {
                if low[j] > high[j] {
                    return Err(ParamsError::InvalidTorqueBounds(name, j));
                }
            }
        }

        if self.use_safety_box && self.link_names.is_empty() {
            return Err(ParamsError::NoLinkNames);
        }

        for &(name, val) in [
            ("safety_force_temperature", self.safety_force_temperature),
            ("safety_force_magnitude", self.safety_force_magnitude),
            (
                "reset_angle_threshold_rad",
                self.reset_angle_threshold_rad,
            ),
            (
                "reset_velocity_threshold_rads",
                self.reset_velocity_threshold_rads,
            ),
        ]
        .iter()
        {
            if val <= 0.0 {
                return Err(ParamsError::NonPositive(name, val));
            }
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::Torque,
            arm_id: "right".into(),
            link_names: vec![
                "right_l2".into(),
                "right_l3".into(),
                "right_l4".into(),
                "right_l5".into(),
                "right_l6".into(),
                "right_hand".into(),
            ],
            use_safety_box: true,
            safety_force_temperature: 5.0,
            safety_force_magnitude: 2.0,
            safety_box: SafetyBox {
                low_m: [0.1, -0.5, 0.0],
                high_m: [0.7, 0.5, 0.7],
            },
            reset_safety_box: SafetyBox {
                low_m: [0.0, -0.6, -0.1],
                high_m: [0.8, 0.6, 0.8],
            },
            ee_safety_box: SafetyBox {
                low_m: [0.2, -0.2, 0.03],
                high_m: [0.6, 0.2, 0.5],
            },
            joint_torque_low_nm: [-8.0, -9.0, -7.0, -6.0, -5.0, -4.0, -2.0],
            joint_torque_high_nm: [8.0, 9.0, 7.0, 6.0, 5.0, 4.0, 2.0],
            reset_torque_low_nm: [-5.0, -5.0, -4.0, -3.0, -2.0, -2.0, -1.0],
            reset_torque_high_nm: [5.0, 5.0, 4.0, 3.0, 2.0, 2.0, 1.0],
            torque_action_scale: 1.0,
            position_action_scale: 0.1,
            reset_target_angles_rad: [0.0, 5.1032, 0.0, 2.18, 0.0, 0.57, 3.3161],
            reset_angle_threshold_rad: 0.15,
            reset_velocity_threshold_rads: 0.002,
            reset_max_cycles: 200,
            reset_pd_kp: [8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0],
            reset_pd_kd: [2.0, 1.8, 1.5, 1.2, 1.0, 0.8, 0.5],
        }
    }
}
