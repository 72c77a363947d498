//! # Arm equipment interface
//!
//! Data types exchanged with the arm equipment services: joint observations,
//! demands, and the pose/Jacobian payloads used by the safety shaping.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// The number of joints in the arm.
pub const NUM_JOINTS: usize = 7;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// The control mode the software runs in, fixed for a whole session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Actions are joint torque demands.
    Torque,

    /// Actions are end-effector position displacements, converted to joint
    /// angle demands through inverse kinematics.
    Position,
}

/// A demand to be executed by the arm equipment.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmDems {
    /// Nothing to execute this cycle.
    None,

    /// Joint torque demands.
    ///
    /// Units: newton metres
    Torques([f64; NUM_JOINTS]),

    /// An end-effector pose target, to be converted to joint angles by the
    /// inverse kinematics provider before dispatch.
    EePoseTarget(EePose),
}

/// Possible errors when decoding a [`PoseJacResponse`].
#[derive(Debug, Error)]
pub enum PoseJacDecodeError {
    #[error("Expected {expected} pose scalars ({num_links} links), found {found}")]
    PoseLengthMismatch {
        num_links: usize,
        expected: usize,
        found: usize,
    },

    #[error("Expected {expected} Jacobian scalars ({num_links} links), found {found}")]
    JacobianLengthMismatch {
        num_links: usize,
        expected: usize,
        found: usize,
    },
}

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// The pose of the end-effector.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EePose {
    /// Position of the end-effector in the base frame.
    ///
    /// Units: metres
    pub pos_m: [f64; 3],

    /// Orientation of the end-effector in the base frame.
    ///
    /// Units: radians
    pub orient_rad: [f64; 3],
}

/// A single observation of the arm's joints and end-effector.
///
/// Providers shall wrap joint angles into [0, 2pi) before reporting them.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointObs {
    /// Joint angles, wrapped into [0, 2pi).
    ///
    /// Units: radians
    pub angles_rad: [f64; NUM_JOINTS],

    /// Joint angular velocities.
    ///
    /// Units: radians/second
    pub velocities_rads: [f64; NUM_JOINTS],

    /// Joint torques as sensed at the actuators.
    ///
    /// Units: newton metres
    pub torques_nm: [f64; NUM_JOINTS],

    /// The current end-effector pose.
    pub ee_pose: EePose,
}

/// The raw pose/Jacobian payload as returned by the provider.
///
/// Both arrays are flat and ordered by link: for each link in declaration
/// order `poses` carries 3 position scalars, and `jacobians` carries 21
/// scalars forming 3 consecutive rows of 7 (the positional Jacobian of that
/// link with respect to the joints).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseJacResponse {
    pub poses: Vec<f64>,
    pub jacobians: Vec<f64>,
}

/// The pose and positional Jacobian of a single link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPoseJac {
    /// The name of the link this entry belongs to.
    pub link_name: String,

    /// Position of the link in the base frame.
    ///
    /// Units: metres
    pub pos_m: [f64; 3],

    /// Positional Jacobian of the link, one row per Cartesian axis.
    pub jacobian: [[f64; NUM_JOINTS]; 3],
}

/// Decoded pose/Jacobian data for all configured links.
///
/// Entries are stored in link declaration order and are looked up by link
/// name, never by position in the underlying payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseJacMap {
    entries: Vec<LinkPoseJac>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for ArmDems {
    fn default() -> Self {
        ArmDems::None
    }
}

impl PoseJacResponse {
    /// Decode this response into a [`PoseJacMap`] for the given links.
    ///
    /// The cursor walks 3 pose scalars and 21 Jacobian scalars per link, in
    /// link declaration order. If either array does not hold exactly the
    /// amount of data implied by `link_names` the response is rejected.
    pub fn unpack(&self, link_names: &[String]) -> Result<PoseJacMap, PoseJacDecodeError> {
        let num_links = link_names.len();

        let expected_poses = num_links * 3;
        if self.poses.len() != expected_poses {
            return Err(PoseJacDecodeError::PoseLengthMismatch {
                num_links,
                expected: expected_poses,
                found: self.poses.len(),
            });
        }

        let expected_jacs = num_links * 3 * NUM_JOINTS;
        if self.jacobians.len() != expected_jacs {
            return Err(PoseJacDecodeError::JacobianLengthMismatch {
                num_links,
                expected: expected_jacs,
                found: self.jacobians.len(),
            });
        }

        let mut entries = Vec::with_capacity(num_links);
        let mut pose_cursor = 0;
        let mut jac_cursor = 0;

        for link_name in link_names {
            let mut pos_m = [0f64; 3];
            pos_m.copy_from_slice(&self.poses[pose_cursor..pose_cursor + 3]);
            pose_cursor += 3;

            let mut jacobian = [[0f64; NUM_JOINTS]; 3];
            for row in jacobian.iter_mut() {
                row.copy_from_slice(&self.jacobians[jac_cursor..jac_cursor + NUM_JOINTS]);
                jac_cursor += NUM_JOINTS;
            }

            entries.push(LinkPoseJac {
                link_name: link_name.clone(),
                pos_m,
                jacobian,
            });
        }

        Ok(PoseJacMap { entries })
    }
}

impl PoseJacMap {
    /// Build a map directly from entries, in the given order.
    pub fn new(entries: Vec<LinkPoseJac>) -> Self {
        Self { entries }
    }

    /// Get the entry for the named link.
    pub fn get(&self, link_name: &str) -> Option<&LinkPoseJac> {
        self.entries.iter().find(|e| e.link_name == link_name)
    }

    /// Iterate over the entries in link declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &LinkPoseJac> {
        self.entries.iter()
    }

    /// The number of links in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map holds no links.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
