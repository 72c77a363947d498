//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;

// Internal
use super::{reset_complete, AnglePd, ArmCtrlError, ArmCtrlInitError, Params};
use arm_if::{
    eqpt::arm::{ArmDems, ControlMode, PoseJacMap, JointObs, NUM_JOINTS},
    tc::arm_ctrl::ArmCmd,
};
use util::{
    archive::{Archived, Archiver},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
#[derive(Default)]
pub struct ArmCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// True while a reset to neutral is being executed.
    pub(crate) in_reset: bool,

    /// Number of PD cycles the current reset has driven so far.
    pub(crate) reset_cycles: u32,

    /// The controller pulling the arm to neutral during a reset.
    reset_pd: AnglePd,

    /// The demands produced on the last cycle.
    pub(crate) last_dems: ArmDems,
    arch_dems: Archiver,
}

/// Input data to Arm Control.
#[derive(Default)]
pub struct InputData {
    /// The arm command to be executed, or `None` if there is no new command
    /// on this cycle.
    pub cmd: Option<ArmCmd>,

    /// The joint observation acquired at the start of this cycle.
    pub obs: JointObs,

    /// Pose/Jacobian data for the monitored links, if fresh data is
    /// available this cycle.
    pub pose_jac: Option<PoseJacMap>,
}

/// Status report for ArmCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Flags for each joint whose torque demand hit the active bounds.
    pub torque_clamped: [bool; NUM_JOINTS],

    /// Flags for each axis on which the end-effector target was clamped.
    pub ee_pos_clamped: [bool; 3],

    /// Number of monitored links outside the active safety box.
    pub num_links_out_of_box: usize,

    /// Largest distance of any monitored link to the active box surface.
    ///
    /// Units: metres
    pub max_dist_outside_box_m: f64,

    /// True if the safety correction replaced the commanded torques.
    pub safety_correction_active: bool,

    /// True on the cycle a reset finished by converging.
    pub reset_complete: bool,
}

/// Flat per-cycle record of the status report for archiving.
///
/// Kept to scalar fields only since the CSV writer cannot serialise the
/// per-joint flag arrays, those are archived as counts.
#[derive(Serialize)]
struct ReportRecord {
    in_reset: bool,
    reset_cycles: u32,
    reset_complete: bool,
    correction_active: bool,
    links_out_of_box: usize,
    max_dist_outside_box_m: f64,
    num_torques_clamped: usize,
    num_ee_axes_clamped: usize,
}

/// Flat per-cycle record of the output demands for archiving.
#[derive(Serialize)]
struct DemsRecord {
    dem_type: &'static str,
    j0_nm: f64,
    j1_nm: f64,
    j2_nm: f64,
    j3_nm: f64,
    j4_nm: f64,
    j5_nm: f64,
    j6_nm: f64,
    ee_x_m: f64,
    ee_y_m: f64,
    ee_z_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ArmCtrl {
    type InitData = &'static str;
    type InitError = ArmCtrlInitError;

    type InputData = InputData;
    type OutputData = ArmDems;
    type StatusReport = StatusReport;
    type ProcError = ArmCtrlError;

    /// Initialise the ArmCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        // Load and validate the parameters
        self.params = util::params::load(init_data)?;
        self.params.validate()?;

        self.reset_pd = AnglePd::new(
            self.params.reset_pd_kp,
            self.params.reset_pd_kd,
            self.params.reset_target_angles_rad,
        );

        // Create the arch folder for arm_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("arm_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(session, "arm_ctrl/status_report.csv").unwrap();
        self.arch_dems = Archiver::from_path(session, "arm_ctrl/dems.csv").unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Arm Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let dems: ArmDems;

        if let Some(ref cmd) = input_data.cmd {
            dems = self.proc_cmd(cmd, input_data)?;
        } else if self.in_reset {
            dems = self.proc_reset(input_data)?;
        } else {
            // Nothing commanded and nothing in progress
            dems = ArmDems::None;
        }

        trace!("ArmCtrl output: {:?}", dems);

        // Update the output in self
        self.last_dems = dems;

        Ok((dems, self.report))
    }
}

impl Archived for ArmCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let report = ReportRecord {
            in_reset: self.in_reset,
            reset_cycles: self.reset_cycles,
            reset_complete: self.report.reset_complete,
            correction_active: self.report.safety_correction_active,
            links_out_of_box: self.report.num_links_out_of_box,
            max_dist_outside_box_m: self.report.max_dist_outside_box_m,
            num_torques_clamped: self.report.torque_clamped.iter().filter(|c| **c).count(),
            num_ee_axes_clamped: self.report.ee_pos_clamped.iter().filter(|c| **c).count(),
        };

        self.arch_report.serialise(report)?;
        self.arch_dems.serialise(DemsRecord::from(&self.last_dems))?;

        Ok(())
    }
}

impl ArmCtrl {
    /// Create a control module directly from a parameter set.
    ///
    /// Used by tests and benchmarks, the executable initialises through
    /// [`State::init`] instead so parameters come from the session's file.
    pub fn from_params(params: Params) -> Self {
        let reset_pd = AnglePd::new(
            params.reset_pd_kp,
            params.reset_pd_kd,
            params.reset_target_angles_rad,
        );

        Self {
            params,
            reset_pd,
            ..Default::default()
        }
    }

    /// True if processing this cycle's command will evaluate the safety
    /// boundary and therefore needs fresh pose/Jacobian data.
    pub fn needs_pose_jac(&self, cmd: Option<&ArmCmd>) -> bool {
        if !self.params.use_safety_box {
            return false;
        }

        match cmd {
            Some(ArmCmd::Torque { .. }) | Some(ArmCmd::Stop) | Some(ArmCmd::Reset) => true,
            Some(ArmCmd::PositionDelta { .. }) => false,
            None => self.in_reset,
        }
    }

    /// The control mode this module was configured with.
    pub fn mode(&self) -> ControlMode {
        self.params.control_mode
    }

    /// The identifier of the arm being controlled.
    pub fn arm_id(&self) -> &str {
        &self.params.arm_id
    }

    /// The links monitored by the safety boundary.
    pub fn link_names(&self) -> &[String] {
        &self.params.link_names
    }

    /// Abandon any in-progress activity.
    ///
    /// Used when entering safe mode. No demands are produced while safe so a
    /// running reset could not continue anyway.
    pub fn make_safe(&mut self) {
        if self.in_reset {
            warn!("Entering safe mode abandons the in-progress reset");
            self.in_reset = false;
        }

        self.last_dems = ArmDems::None;
    }

    /// Process a newly recieved command.
    fn proc_cmd(
        &mut self,
        cmd: &ArmCmd,
        input_data: &InputData,
    ) -> Result<ArmDems, ArmCtrlError> {
        // A direct command takes over from an in-progress reset
        if self.in_reset && *cmd != ArmCmd::Reset {
            warn!(
                "Recieved {:?} while a reset is in progress, abandoning the reset",
                cmd
            );
            self.in_reset = false;
        }

        match *cmd {
            ArmCmd::Torque { torques_nm } => {
                if self.params.control_mode != ControlMode::Torque {
                    return Err(ArmCtrlError::CmdModeMismatch {
                        mode: self.params.control_mode,
                        cmd: cmd.clone(),
                    });
                }

                let mut scaled_nm = torques_nm;
                for t in scaled_nm.iter_mut() {
                    *t *= self.params.torque_action_scale;
                }

                Ok(ArmDems::Torques(
                    self.calc_torque_dems(&scaled_nm, input_data.pose_jac.as_ref())?,
                ))
            }
            ArmCmd::PositionDelta { delta_m } => {
                if self.params.control_mode != ControlMode::Position {
                    return Err(ArmCtrlError::CmdModeMismatch {
                        mode: self.params.control_mode,
                        cmd: cmd.clone(),
                    });
                }

                let mut scaled_m = delta_m;
                for d in scaled_m.iter_mut() {
                    *d *= self.params.position_action_scale;
                }

                Ok(ArmDems::EePoseTarget(
                    self.calc_position_target(&scaled_m, &input_data.obs.ee_pose),
                ))
            }
            ArmCmd::Reset => {
                debug!("Starting reset to neutral");
                self.in_reset = true;
                self.reset_cycles = 0;
                self.proc_reset(input_data)
            }
            ArmCmd::Stop => {
                // Zero torque on all joints, still shaped and clamped
                Ok(ArmDems::Torques(
                    self.calc_torque_dems(&[0.0; NUM_JOINTS], input_data.pose_jac.as_ref())?,
                ))
            }
        }
    }

    /// Drive one cycle of an in-progress reset.
    ///
    /// Convergence is checked before driving so an arm that is already
    /// settled at neutral sends nothing. Each driven cycle spends one unit
    /// of the reset budget, once the budget is gone the reset is abandoned.
    fn proc_reset(&mut self, input_data: &InputData) -> Result<ArmDems, ArmCtrlError> {
        let obs = &input_data.obs;

        if reset_complete(
            &obs.angles_rad,
            &obs.velocities_rads,
            self.reset_pd.target_rad(),
            self.params.reset_angle_threshold_rad,
            self.params.reset_velocity_threshold_rads,
        ) {
            debug!("Reset complete after {} cycles", self.reset_cycles);
            self.in_reset = false;
            self.report.reset_complete = true;
            return Ok(ArmDems::None);
        }

        if self.reset_cycles >= self.params.reset_max_cycles {
            warn!(
                "Reset did not converge within {} cycles, abandoning it",
                self.params.reset_max_cycles
            );
            self.in_reset = false;
            return Ok(ArmDems::None);
        }

        self.reset_cycles += 1;

        let torques_nm = self
            .reset_pd
            .compute(&obs.angles_rad, &obs.velocities_rads);

        Ok(ArmDems::Torques(
            self.calc_torque_dems(&torques_nm, input_data.pose_jac.as_ref())?,
        ))
    }
}

impl DemsRecord {
    fn none() -> Self {
        Self {
            dem_type: "NONE",
            j0_nm: 0.0,
            j1_nm: 0.0,
            j2_nm: 0.0,
            j3_nm: 0.0,
            j4_nm: 0.0,
            j5_nm: 0.0,
            j6_nm: 0.0,
            ee_x_m: 0.0,
            ee_y_m: 0.0,
            ee_z_m: 0.0,
        }
    }
}

impl From<&ArmDems> for DemsRecord {
    fn from(dems: &ArmDems) -> Self {
        let mut record = DemsRecord::none();

        match dems {
            ArmDems::None => (),
            ArmDems::Torques(t) => {
                record.dem_type = "TORQUE";
                record.j0_nm = t[0];
                record.j1_nm = t[1];
                record.j2_nm = t[2];
                record.j3_nm = t[3];
                record.j4_nm = t[4];
                record.j5_nm = t[5];
                record.j6_nm = t[6];
            }
            ArmDems::EePoseTarget(p) => {
                record.dem_type = "EE_POSE";
                record.ee_x_m = p.pos_m[0];
                record.ee_y_m = p.pos_m[1];
                record.ee_z_m = p.pos_m[2];
            }
        }

        record
    }
}
