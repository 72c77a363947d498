//! Reset angle controller and convergence check

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use arm_if::eqpt::arm::NUM_JOINTS;
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-joint PD controller driving the arm to a target joint configuration.
///
/// All angles are treated as circular, the controller always takes the
/// shortest way round to the target.
#[derive(Debug, Clone, Default)]
pub struct AnglePd {
    /// Proportional gain for each joint.
    kp: [f64; NUM_JOINTS],

    /// Derivative gain for each joint.
    kd: [f64; NUM_JOINTS],

    /// The target joint configuration.
    ///
    /// Units: radians
    target_rad: [f64; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AnglePd {
    /// Create a new controller with the given gains and target.
    pub fn new(
        kp: [f64; NUM_JOINTS],
        kd: [f64; NUM_JOINTS],
        target_rad: [f64; NUM_JOINTS],
    ) -> Self {
        Self {
            kp,
            kd,
            target_rad,
        }
    }

    /// The target joint configuration this controller drives towards.
    pub fn target_rad(&self) -> &[f64; NUM_JOINTS] {
        &self.target_rad
    }

    /// Compute the joint torques pulling the arm towards the target.
    ///
    /// The proportional term acts on the signed circular angle error, the
    /// derivative term damps the current joint velocity.
    pub fn compute(
        &self,
        angles_rad: &[f64; NUM_JOINTS],
        velocities_rads: &[f64; NUM_JOINTS],
    ) -> [f64; NUM_JOINTS] {
        let mut torques_nm = [0f64; NUM_JOINTS];

        for j in 0..NUM_JOINTS {
            let error_rad = get_ang_dist_2pi(angles_rad[j], self.target_rad[j]);
            torques_nm[j] = self.kp[j] * error_rad - self.kd[j] * velocities_rads[j];
        }

        torques_nm
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// True once the arm has settled at the target configuration.
///
/// Every joint must be within `angle_threshold_rad` of its target (circular
/// distance) and every joint velocity magnitude must be strictly below
/// `velocity_threshold_rads`. A joint sitting at exactly the velocity
/// threshold is still moving.
pub fn reset_complete(
    angles_rad: &[f64; NUM_JOINTS],
    velocities_rads: &[f64; NUM_JOINTS],
    target_rad: &[f64; NUM_JOINTS],
    angle_threshold_rad: f64,
    velocity_threshold_rads: f64,
) -> bool {
    let angles_ok = (0..NUM_JOINTS)
        .all(|j| get_ang_dist_2pi(angles_rad[j], target_rad[j]).abs() < angle_threshold_rad);

    let velocities_ok = (0..NUM_JOINTS).all(|j| velocities_rads[j].abs() < velocity_threshold_rads);

    angles_ok && velocities_ok
}
