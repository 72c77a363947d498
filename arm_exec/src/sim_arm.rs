//! # Simulated arm
//!
//! Provides all four arm equipment services from a simple simulated arm so
//! the executable can run with no hardware attached. The simulation is a
//! planar chain in the x-z plane of the base frame: joint angles accumulate
//! along the chain and each segment contributes its length along the
//! accumulated direction. It is not a model of any real arm, it exists to
//! give the control loop believable geometry, Jacobians and dynamics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{SMatrix, Vector3};

// Internal
use arm_if::{
    eqpt::arm::{EePose, JointObs, PoseJacResponse, NUM_JOINTS},
    svc::{ActionDispatcher, IkProvider, ObservationProvider, PoseJacProvider, SvcError},
};
use util::maths::wrap_to_2pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Integration step used when applying torques.
///
/// Units: seconds
const SIM_DT_S: f64 = 0.05;

/// Viscous damping applied to every joint.
const SIM_DAMPING: f64 = 2.0;

/// Step size of the single-step Jacobian-transpose IK solution.
const IK_GAIN: f64 = 0.2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simulated planar arm implementing the equipment service traits.
pub struct SimArm {
    /// The arm identifier requests must match.
    arm_id: String,

    /// The links reported by the pose/Jacobian service, mapped onto the
    /// last frames of the chain.
    link_names: Vec<String>,

    /// Length of each segment of the chain.
    ///
    /// Units: metres
    seg_len_m: [f64; NUM_JOINTS],

    angles_rad: [f64; NUM_JOINTS],
    velocities_rads: [f64; NUM_JOINTS],
    torques_nm: [f64; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimArm {
    /// Create a simulated arm reporting the given links.
    pub fn new(arm_id: &str, link_names: &[String]) -> Self {
        Self {
            arm_id: arm_id.to_string(),
            link_names: link_names.to_vec(),
            seg_len_m: [0.3, 0.15, 0.15, 0.15, 0.1, 0.1, 0.05],
            angles_rad: [0.0; NUM_JOINTS],
            velocities_rads: [0.0; NUM_JOINTS],
            torques_nm: [0.0; NUM_JOINTS],
        }
    }

    /// Place the arm at the given joint configuration with zero velocity.
    pub fn teleport(&mut self, angles_rad: &[f64; NUM_JOINTS]) {
        for j in 0..NUM_JOINTS {
            self.angles_rad[j] = wrap_to_2pi(angles_rad[j]);
        }
        self.velocities_rads = [0.0; NUM_JOINTS];
    }

    /// Position of the frame after segment `frame`, in the base frame.
    fn frame_pos_m(&self, frame: usize) -> Vector3<f64> {
        let mut pos = Vector3::zeros();
        let mut heading_rad = 0.0;

        for i in 0..=frame {
            heading_rad += self.angles_rad[i];
            pos += self.seg_len_m[i] * Vector3::new(heading_rad.cos(), 0.0, heading_rad.sin());
        }

        pos
    }

    /// Positional Jacobian of the frame after segment `frame`.
    ///
    /// Column j is the derivative of the frame position with respect to
    /// joint j, zero for joints beyond the frame.
    fn frame_jacobian(&self, frame: usize) -> SMatrix<f64, 3, NUM_JOINTS> {
        let mut jac = SMatrix::<f64, 3, NUM_JOINTS>::zeros();

        // Accumulated headings of every segment up to the frame
        let mut headings_rad = [0.0; NUM_JOINTS];
        let mut heading_rad = 0.0;
        for i in 0..=frame {
            heading_rad += self.angles_rad[i];
            headings_rad[i] = heading_rad;
        }

        for j in 0..=frame {
            let mut dx = 0.0;
            let mut dz = 0.0;
            // Joint j swings every segment from j to the frame
            for i in j..=frame {
                dx -= self.seg_len_m[i] * headings_rad[i].sin();
                dz += self.seg_len_m[i] * headings_rad[i].cos();
            }
            jac[(0, j)] = dx;
            jac[(2, j)] = dz;
        }

        jac
    }

    /// The current end-effector pose, tip of the chain.
    fn ee_pose(&self) -> EePose {
        let tip = self.frame_pos_m(NUM_JOINTS - 1);
        let total_rad: f64 = self.angles_rad.iter().sum();

        EePose {
            pos_m: [tip[0], tip[1], tip[2]],
            orient_rad: [0.0, wrap_to_2pi(total_rad), 0.0],
        }
    }
}

impl ObservationProvider for SimArm {
    fn get_observation(&mut self) -> Result<JointObs, SvcError> {
        Ok(JointObs {
            angles_rad: self.angles_rad,
            velocities_rads: self.velocities_rads,
            torques_nm: self.torques_nm,
            ee_pose: self.ee_pose(),
        })
    }
}

impl PoseJacProvider for SimArm {
    fn get_pose_jac(&mut self, arm_id: &str) -> Result<PoseJacResponse, SvcError> {
        if arm_id != self.arm_id {
            return Err(SvcError::InvalidRequest(format!(
                "Unknown arm \"{}\", the simulated arm is \"{}\"",
                arm_id, self.arm_id
            )));
        }

        let num_links = self.link_names.len();
        if num_links > NUM_JOINTS {
            return Err(SvcError::InvalidRequest(format!(
                "{} links requested but the chain only has {} frames",
                num_links, NUM_JOINTS
            )));
        }

        // The configured links map onto the outermost frames of the chain
        let frame_offset = NUM_JOINTS - num_links;

        let mut poses = Vec::with_capacity(num_links * 3);
        let mut jacobians = Vec::with_capacity(num_links * 3 * NUM_JOINTS);

        for l in 0..num_links {
            let frame = frame_offset + l;

            let pos = self.frame_pos_m(frame);
            poses.extend_from_slice(&[pos[0], pos[1], pos[2]]);

            let jac = self.frame_jacobian(frame);
            for r in 0..3 {
                for c in 0..NUM_JOINTS {
                    jacobians.push(jac[(r, c)]);
                }
            }
        }

        Ok(PoseJacResponse { poses, jacobians })
    }
}

impl IkProvider for SimArm {
    /// Single-step Jacobian-transpose IK.
    ///
    /// Good enough for the small clamped displacements the control loop
    /// sends, a real arm would run a proper solver here.
    fn solve_ik(
        &mut self,
        target: &EePose,
        seed_angles_rad: &[f64; NUM_JOINTS],
    ) -> Result<[f64; NUM_JOINTS], SvcError> {
        // Evaluate the chain at the seed rather than the current state
        let saved = self.angles_rad;
        self.angles_rad = *seed_angles_rad;

        let tip = self.frame_pos_m(NUM_JOINTS - 1);
        let jac = self.frame_jacobian(NUM_JOINTS - 1);

        self.angles_rad = saved;

        let error_m = Vector3::new(
            target.pos_m[0] - tip[0],
            target.pos_m[1] - tip[1],
            target.pos_m[2] - tip[2],
        );

        let delta = jac.transpose() * error_m * IK_GAIN;

        let mut angles_rad = [0.0; NUM_JOINTS];
        for j in 0..NUM_JOINTS {
            angles_rad[j] = wrap_to_2pi(seed_angles_rad[j] + delta[j]);
        }

        Ok(angles_rad)
    }
}

impl ActionDispatcher for SimArm {
    /// Integrate one step of torque-driven dynamics with unit inertia.
    fn send_torques(&mut self, torques_nm: &[f64; NUM_JOINTS]) -> Result<(), SvcError> {
        self.torques_nm = *torques_nm;

        for j in 0..NUM_JOINTS {
            let accel = torques_nm[j] - SIM_DAMPING * self.velocities_rads[j];
            self.velocities_rads[j] += accel * SIM_DT_S;
            self.angles_rad[j] = wrap_to_2pi(self.angles_rad[j] + self.velocities_rads[j] * SIM_DT_S);
        }

        Ok(())
    }

    /// Position actuators move to the demanded angles within one cycle.
    fn send_angles(&mut self, angles_rad: &[f64; NUM_JOINTS]) -> Result<(), SvcError> {
        for j in 0..NUM_JOINTS {
            self.angles_rad[j] = wrap_to_2pi(angles_rad[j]);
        }
        self.velocities_rads = [0.0; NUM_JOINTS];
        self.torques_nm = [0.0; NUM_JOINTS];

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::{ArmCtrl, Params, SafetyBox};
    use crate::arm_driver::ArmDriver;
    use arm_if::tc::arm_ctrl::ArmCmd;
    use util::maths::get_ang_dist_2pi;
    use util::rate::Rate;

    const TAU: f64 = std::f64::consts::TAU;

    fn sim_with_default_links() -> (SimArm, Params) {
        let params = Params::default();
        let sim = SimArm::new(&params.arm_id, &params.link_names);
        (sim, params)
    }

    #[test]
    fn test_observation_angles_wrapped() {
        let (mut sim, _) = sim_with_default_links();

        sim.send_angles(&[-0.5, TAU + 1.0, 12.0, -7.0, 0.0, 3.0, -0.001])
            .unwrap();

        let obs = sim.get_observation().unwrap();
        for a in obs.angles_rad.iter() {
            assert!((0.0..TAU).contains(a), "angle {} not wrapped", a);
        }
        assert!((obs.angles_rad[0] - (TAU - 0.5)).abs() < 1e-12);
        assert!((obs.angles_rad[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_torques_move_the_arm() {
        let (mut sim, _) = sim_with_default_links();

        let mut torques = [0.0; NUM_JOINTS];
        torques[0] = 1.0;
        sim.send_torques(&torques).unwrap();

        let obs = sim.get_observation().unwrap();
        assert!(obs.velocities_rads[0] > 0.0);
        assert!(obs.angles_rad[0] > 0.0);
        assert_eq!(obs.velocities_rads[1], 0.0);
        assert_eq!(obs.torques_nm[0], 1.0);

        // Damping bleeds velocity off once the torque is removed
        let v_before = obs.velocities_rads[0];
        sim.send_torques(&[0.0; NUM_JOINTS]).unwrap();
        let obs = sim.get_observation().unwrap();
        assert!(obs.velocities_rads[0] < v_before);
    }

    #[test]
    fn test_pose_jac_response_shape() {
        let (mut sim, params) = sim_with_default_links();

        let response = sim.get_pose_jac("right").unwrap();
        let num_links = params.link_names.len();
        assert_eq!(response.poses.len(), num_links * 3);
        assert_eq!(response.jacobians.len(), num_links * 3 * NUM_JOINTS);

        // Decodes against the same link names it was built for
        let map = response.unpack(&params.link_names).unwrap();
        assert_eq!(map.len(), num_links);

        // The outermost link is the chain tip
        let tip = sim.frame_pos_m(NUM_JOINTS - 1);
        let hand = map.get("right_hand").unwrap();
        assert!((hand.pos_m[0] - tip[0]).abs() < 1e-12);
        assert!((hand.pos_m[2] - tip[2]).abs() < 1e-12);
    }

    #[test]
    fn test_pose_jac_arm_id_checked() {
        let (mut sim, _) = sim_with_default_links();

        assert!(matches!(
            sim.get_pose_jac("left"),
            Err(SvcError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_ik_step_reduces_error() {
        let (mut sim, _) = sim_with_default_links();

        // A gently curled configuration away from singularities
        let seed = [0.3, 0.2, 0.2, 0.1, 0.1, 0.1, 0.0];
        sim.teleport(&seed);

        let tip = sim.frame_pos_m(NUM_JOINTS - 1);
        let target = EePose {
            pos_m: [tip[0] - 0.03, 0.0, tip[2] + 0.03],
            orient_rad: [0.0; 3],
        };

        let solution = sim.solve_ik(&target, &seed).unwrap();

        sim.teleport(&solution);
        let new_tip = sim.frame_pos_m(NUM_JOINTS - 1);

        let err_before = util::maths::norm(&[tip[0], tip[2]], &[target.pos_m[0], target.pos_m[2]])
            .unwrap();
        let err_after =
            util::maths::norm(&[new_tip[0], new_tip[2]], &[target.pos_m[0], target.pos_m[2]])
                .unwrap();

        assert!(err_after < err_before);
    }

    /// End-to-end reset against the simulated dynamics.
    #[test]
    fn test_driver_reset_converges_on_sim() {
        // Boxes wide enough that the planar chain never leaves them, gains
        // and thresholds relaxed for the crude unit-inertia dynamics
        let mut params = Params::default();
        let wide = SafetyBox {
            low_m: [-2.0, -2.0, -2.0],
            high_m: [2.0, 2.0, 2.0],
        };
        params.safety_box = wide.clone();
        params.reset_safety_box = wide;
        params.reset_target_angles_rad = [0.5, 0.3, 0.2, 0.2, 0.1, 0.1, 0.0];
        params.reset_pd_kp = [2.0; NUM_JOINTS];
        params.reset_pd_kd = [1.0; NUM_JOINTS];
        params.reset_torque_low_nm = [-5.0; NUM_JOINTS];
        params.reset_torque_high_nm = [5.0; NUM_JOINTS];
        params.reset_angle_threshold_rad = 0.1;
        params.reset_velocity_threshold_rads = 0.05;
        params.reset_max_cycles = 2000;

        let target = params.reset_target_angles_rad;

        let mut sim = SimArm::new(&params.arm_id, &params.link_names);
        let mut start = target;
        for a in start.iter_mut() {
            *a += 0.4;
        }
        sim.teleport(&start);

        let mut driver = ArmDriver::new(
            ArmCtrl::from_params(params),
            Rate::new(100_000.0).unwrap(),
        );

        let mut out = driver.step(&mut sim, Some(ArmCmd::Reset)).unwrap();
        let mut cycles = 1;
        while !out.report.reset_complete && cycles < 2000 {
            out = driver.step(&mut sim, None).unwrap();
            cycles += 1;
        }

        assert!(
            out.report.reset_complete,
            "reset did not converge in {} cycles",
            cycles
        );

        let obs = sim.get_observation().unwrap();
        for j in 0..NUM_JOINTS {
            assert!(get_ang_dist_2pi(obs.angles_rad[j], target[j]).abs() < 0.1);
        }
    }
}
