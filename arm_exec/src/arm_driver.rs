//! # Arm driver
//!
//! The driver runs one observe/compute/act cycle of the control loop against
//! the arm equipment services. Each step acquires an observation, refreshes
//! the pose/Jacobian cache if the safety boundary will need it, runs arm
//! control once and dispatches whatever demands came out. At most one
//! demand reaches the arm per step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use thiserror::Error;

// Internal
use crate::arm_ctrl::{ArmCtrl, ArmCtrlError, InputData, StatusReport};
use crate::pose_jac::{PoseJacCache, PoseJacCacheError};
use arm_if::{
    eqpt::arm::{ArmDems, NUM_JOINTS},
    svc::{ArmServices, SvcError},
    tc::arm_ctrl::ArmCmd,
};
use util::{archive::Archived, module::State, rate::Rate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives the arm control module against a set of equipment services.
pub struct ArmDriver {
    ctrl: ArmCtrl,
    cache: PoseJacCache,
    rate: Rate,
}

/// The outcome of a single driver step.
pub struct StepOutput {
    /// The demands arm control produced this step.
    pub dems: ArmDems,

    /// The status report arm control produced this step.
    pub report: StatusReport,

    /// The joint angles dispatched after solving IK, if the pose target
    /// path ran this step.
    pub dispatched_angles_rad: Option<[f64; NUM_JOINTS]>,

    /// True if demands were dispatched to the arm this step.
    pub dispatched: bool,

    /// True if the driver already slept on the cycle rate, which it does
    /// after every torque dispatch.
    pub slept: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raising from a driver step.
///
/// A step that fails dispatches nothing, the failure happens before any
/// demand reaches the arm.
#[derive(Debug, Error)]
pub enum ArmDriverError {
    #[error("Failed to get an observation from the arm: {0}")]
    GetObsError(SvcError),

    #[error("Failed to refresh the pose/Jacobian cache: {0}")]
    PoseJacError(PoseJacCacheError),

    #[error("Arm control processing failed: {0}")]
    CtrlError(ArmCtrlError),

    #[error("Failed to solve IK for the pose target: {0}")]
    IkError(SvcError),

    #[error("Failed to dispatch demands to the arm: {0}")]
    DispatchError(SvcError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmDriver {
    /// Create a driver around an initialised control module.
    pub fn new(ctrl: ArmCtrl, rate: Rate) -> Self {
        let cache = PoseJacCache::new(&ctrl.params.arm_id, &ctrl.params.link_names);

        Self { ctrl, cache, rate }
    }

    /// The control module being driven.
    pub fn ctrl(&self) -> &ArmCtrl {
        &self.ctrl
    }

    /// Run one observe/compute/act cycle.
    ///
    /// Torque demands are followed by a sleep on the cycle rate so torque
    /// streaming is paced for the actuators, pose targets are handed to the
    /// IK provider and dispatched as joint angles without pacing.
    pub fn step<S: ArmServices>(
        &mut self,
        svc: &mut S,
        cmd: Option<ArmCmd>,
    ) -> Result<StepOutput, ArmDriverError> {
        // ---- OBSERVE ----

        let obs = svc.get_observation().map_err(ArmDriverError::GetObsError)?;

        // ---- REFRESH POSE/JAC ----

        if self.ctrl.needs_pose_jac(cmd.as_ref()) {
            self.cache
                .refresh(svc)
                .map_err(ArmDriverError::PoseJacError)?;
        }

        // ---- COMPUTE ----

        let input_data = InputData {
            cmd,
            obs,
            pose_jac: self.cache.get().cloned(),
        };

        let (dems, report) = self
            .ctrl
            .proc(&input_data)
            .map_err(ArmDriverError::CtrlError)?;

        // ---- ACT ----

        let mut output = StepOutput {
            dems,
            report,
            dispatched_angles_rad: None,
            dispatched: false,
            slept: false,
        };

        match dems {
            ArmDems::None => (),
            ArmDems::Torques(torques_nm) => {
                svc.send_torques(&torques_nm)
                    .map_err(ArmDriverError::DispatchError)?;
                output.dispatched = true;

                self.rate.sleep();
                output.slept = true;
            }
            ArmDems::EePoseTarget(pose) => {
                let angles_rad = svc
                    .solve_ik(&pose, &obs.angles_rad)
                    .map_err(ArmDriverError::IkError)?;

                svc.send_angles(&angles_rad)
                    .map_err(ArmDriverError::DispatchError)?;

                output.dispatched_angles_rad = Some(angles_rad);
                output.dispatched = true;
            }
        }

        Ok(output)
    }

    /// Abandon any in-progress activity, used when entering safe mode.
    pub fn make_safe(&mut self) {
        self.ctrl.make_safe();
    }

    /// Write the per-cycle archives, logging rather than failing on error.
    pub fn write_archives(&mut self) {
        if let Err(e) = self.ctrl.write() {
            warn!("Failed to write arm_ctrl archives: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::Params;
    use arm_if::eqpt::arm::{ControlMode, EePose, JointObs, PoseJacResponse};
    use arm_if::svc::{ActionDispatcher, IkProvider, ObservationProvider, PoseJacProvider};

    /// Scriptable stand-in for the full set of equipment services.
    struct MockArm {
        obs: JointObs,
        response: PoseJacResponse,
        ik_result: [f64; NUM_JOINTS],

        obs_fails: bool,
        pose_jac_fails: bool,
        ik_fails: bool,

        num_obs_calls: usize,
        num_pose_jac_calls: usize,
        num_ik_calls: usize,
        num_torque_dispatches: usize,
        num_angle_dispatches: usize,

        last_torques_nm: Option<[f64; NUM_JOINTS]>,
        last_angles_rad: Option<[f64; NUM_JOINTS]>,
        last_ik_target: Option<EePose>,
    }

    impl MockArm {
        /// An arm with all configured links inside the safety boxes.
        fn new(params: &Params) -> Self {
            let mut poses = vec![];
            let mut jacobians = vec![];
            for _ in &params.link_names {
                poses.extend_from_slice(&[0.4, 0.0, 0.35]);
                jacobians.extend_from_slice(&[0.0; 3 * NUM_JOINTS]);
            }

            Self {
                obs: JointObs::default(),
                response: PoseJacResponse { poses, jacobians },
                ik_result: [0.5; NUM_JOINTS],
                obs_fails: false,
                pose_jac_fails: false,
                ik_fails: false,
                num_obs_calls: 0,
                num_pose_jac_calls: 0,
                num_ik_calls: 0,
                num_torque_dispatches: 0,
                num_angle_dispatches: 0,
                last_torques_nm: None,
                last_angles_rad: None,
                last_ik_target: None,
            }
        }
    }

    impl ObservationProvider for MockArm {
        fn get_observation(&mut self) -> Result<JointObs, SvcError> {
            self.num_obs_calls += 1;
            if self.obs_fails {
                Err(SvcError::NotConnected)
            } else {
                Ok(self.obs)
            }
        }
    }

    impl PoseJacProvider for MockArm {
        fn get_pose_jac(&mut self, _arm_id: &str) -> Result<PoseJacResponse, SvcError> {
            self.num_pose_jac_calls += 1;
            if self.pose_jac_fails {
                Err(SvcError::ResponseError("mock failure".into()))
            } else {
                Ok(self.response.clone())
            }
        }
    }

    impl IkProvider for MockArm {
        fn solve_ik(
            &mut self,
            target: &EePose,
            _seed_angles_rad: &[f64; NUM_JOINTS],
        ) -> Result<[f64; NUM_JOINTS], SvcError> {
            self.num_ik_calls += 1;
            self.last_ik_target = Some(*target);
            if self.ik_fails {
                Err(SvcError::InvalidRequest("infeasible target".into()))
            } else {
                Ok(self.ik_result)
            }
        }
    }

    impl ActionDispatcher for MockArm {
        fn send_torques(&mut self, torques_nm: &[f64; NUM_JOINTS]) -> Result<(), SvcError> {
            self.num_torque_dispatches += 1;
            self.last_torques_nm = Some(*torques_nm);
            Ok(())
        }

        fn send_angles(&mut self, angles_rad: &[f64; NUM_JOINTS]) -> Result<(), SvcError> {
            self.num_angle_dispatches += 1;
            self.last_angles_rad = Some(*angles_rad);
            Ok(())
        }
    }

    /// A rate fast enough that test sleeps are negligible.
    fn test_rate() -> Rate {
        Rate::new(100_000.0).unwrap()
    }

    fn driver_with(params: Params) -> ArmDriver {
        ArmDriver::new(ArmCtrl::from_params(params), test_rate())
    }

    #[test]
    fn test_torque_step_dispatches_once() {
        let params = Params::default();
        let mut arm = MockArm::new(&params);
        let mut driver = driver_with(params);

        let out = driver
            .step(
                &mut arm,
                Some(ArmCmd::Torque {
                    torques_nm: [1.0; NUM_JOINTS],
                }),
            )
            .unwrap();

        assert_eq!(arm.num_obs_calls, 1);
        assert_eq!(arm.num_pose_jac_calls, 1);
        assert_eq!(arm.num_torque_dispatches, 1);
        assert_eq!(arm.num_angle_dispatches, 0);

        assert!(out.dispatched);
        assert!(out.slept);
        assert_eq!(arm.last_torques_nm, Some([1.0; NUM_JOINTS]));
    }

    #[test]
    fn test_obs_failure_aborts_step() {
        let params = Params::default();
        let mut arm = MockArm::new(&params);
        arm.obs_fails = true;
        let mut driver = driver_with(params);

        let result = driver.step(
            &mut arm,
            Some(ArmCmd::Torque {
                torques_nm: [1.0; NUM_JOINTS],
            }),
        );

        assert!(matches!(result, Err(ArmDriverError::GetObsError(_))));
        assert_eq!(arm.num_pose_jac_calls, 0);
        assert_eq!(arm.num_torque_dispatches, 0);
    }

    #[test]
    fn test_pose_jac_failure_aborts_step() {
        let params = Params::default();
        let mut arm = MockArm::new(&params);
        arm.pose_jac_fails = true;
        let mut driver = driver_with(params);

        let result = driver.step(
            &mut arm,
            Some(ArmCmd::Torque {
                torques_nm: [1.0; NUM_JOINTS],
            }),
        );

        assert!(matches!(result, Err(ArmDriverError::PoseJacError(_))));
        assert_eq!(arm.num_torque_dispatches, 0);

        // Once the provider recovers the step goes through
        arm.pose_jac_fails = false;
        let out = driver
            .step(
                &mut arm,
                Some(ArmCmd::Torque {
                    torques_nm: [1.0; NUM_JOINTS],
                }),
            )
            .unwrap();
        assert!(out.dispatched);
    }

    #[test]
    fn test_position_step_solves_ik() {
        let mut params = Params::default();
        params.control_mode = ControlMode::Position;
        let ee_low = params.ee_safety_box.low_m;

        let mut arm = MockArm::new(&params);
        arm.obs.ee_pose.pos_m = [0.4, 0.0, 0.2];
        arm.ik_result = [0.25; NUM_JOINTS];

        let mut driver = driver_with(params);

        let out = driver
            .step(
                &mut arm,
                Some(ArmCmd::PositionDelta {
                    delta_m: [0.0, 0.0, -10.0],
                }),
            )
            .unwrap();

        // No pose/Jacobian data is needed on the position path
        assert_eq!(arm.num_pose_jac_calls, 0);

        // The IK target was clamped to the bottom of the end-effector box
        let target = arm.last_ik_target.unwrap();
        assert_eq!(target.pos_m[2], ee_low[2]);

        assert_eq!(arm.num_ik_calls, 1);
        assert_eq!(arm.num_angle_dispatches, 1);
        assert_eq!(arm.num_torque_dispatches, 0);

        assert_eq!(out.dispatched_angles_rad, Some([0.25; NUM_JOINTS]));
        assert!(out.dispatched);
        assert!(!out.slept);
    }

    #[test]
    fn test_ik_failure_aborts_dispatch() {
        let mut params = Params::default();
        params.control_mode = ControlMode::Position;

        let mut arm = MockArm::new(&params);
        arm.obs.ee_pose.pos_m = [0.4, 0.0, 0.2];
        arm.ik_fails = true;

        let mut driver = driver_with(params);

        let result = driver.step(
            &mut arm,
            Some(ArmCmd::PositionDelta {
                delta_m: [0.01, 0.0, 0.0],
            }),
        );

        assert!(matches!(result, Err(ArmDriverError::IkError(_))));
        assert_eq!(arm.num_angle_dispatches, 0);
    }

    #[test]
    fn test_reset_completes_immediately_when_settled() {
        let params = Params::default();
        let mut arm = MockArm::new(&params);
        arm.obs.angles_rad = params.reset_target_angles_rad;

        let mut driver = driver_with(params);

        let out = driver.step(&mut arm, Some(ArmCmd::Reset)).unwrap();

        assert_eq!(out.dems, ArmDems::None);
        assert!(out.report.reset_complete);
        assert!(!out.dispatched);
        assert_eq!(arm.num_torque_dispatches, 0);
    }

    #[test]
    fn test_reset_bounded_by_cycle_budget() {
        let mut params = Params::default();
        params.reset_max_cycles = 2;

        let mut arm = MockArm::new(&params);
        // The mock arm never moves, so the reset can never converge
        arm.obs.angles_rad = [1.0; NUM_JOINTS];

        let mut driver = driver_with(params);

        let out = driver.step(&mut arm, Some(ArmCmd::Reset)).unwrap();
        assert!(out.dispatched);
        let out = driver.step(&mut arm, None).unwrap();
        assert!(out.dispatched);

        // Budget exhausted, the reset ends without converging
        let out = driver.step(&mut arm, None).unwrap();
        assert_eq!(out.dems, ArmDems::None);
        assert!(!out.dispatched);
        assert!(!out.report.reset_complete);

        assert_eq!(arm.num_torque_dispatches, 2);
    }

    #[test]
    fn test_idle_step_touches_nothing() {
        let params = Params::default();
        let mut arm = MockArm::new(&params);
        let mut driver = driver_with(params);

        let out = driver.step(&mut arm, None).unwrap();

        assert_eq!(out.dems, ArmDems::None);
        assert!(!out.dispatched);
        assert!(!out.slept);
        assert_eq!(arm.num_obs_calls, 1);
        assert_eq!(arm.num_pose_jac_calls, 0);
        assert_eq!(arm.num_torque_dispatches, 0);
        assert_eq!(arm.num_angle_dispatches, 0);
    }

    #[test]
    fn test_boundary_disabled_skips_refresh() {
        let mut params = Params::default();
        params.use_safety_box = false;

        let mut arm = MockArm::new(&params);
        let mut driver = driver_with(params);

        let out = driver
            .step(
                &mut arm,
                Some(ArmCmd::Torque {
                    torques_nm: [1.0; NUM_JOINTS],
                }),
            )
            .unwrap();

        assert_eq!(arm.num_pose_jac_calls, 0);
        assert!(out.dispatched);
        assert_eq!(arm.last_torques_nm, Some([1.0; NUM_JOINTS]));
    }
}
