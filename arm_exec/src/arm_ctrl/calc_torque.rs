//! Torque demand shaping calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{SMatrix, SVector};

// Internal
use super::*;
use arm_if::eqpt::arm::{PoseJacMap, NUM_JOINTS};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCtrl {
    /// Shape pre-scaled joint torque demands against the safety boundary.
    ///
    /// Each monitored link outside the active safety box contributes a
    /// restoring generalised torque through its positional Jacobian. If any
    /// link is out the summed correction *replaces* the commanded torques
    /// entirely, it is not blended in, and the last joint's correction is
    /// zeroed since it cannot move the links back in. The result is clamped
    /// to the active per-joint torque bounds.
    ///
    /// The active box and bounds are the reset ones while a reset is in
    /// progress, otherwise the normal operation ones.
    pub(crate) fn calc_torque_dems(
        &mut self,
        torques_nm: &[f64; NUM_JOINTS],
        pose_jac: Option<&PoseJacMap>,
    ) -> Result<[f64; NUM_JOINTS], ArmCtrlError> {
        let mut output_nm = *torques_nm;

        if self.params.use_safety_box {
            let pose_jac = match pose_jac {
                Some(pj) => pj,
                None => return Err(ArmCtrlError::NoPoseJacData),
            };

            let boundary = if self.in_reset {
                &self.params.reset_safety_box
            } else {
                &self.params.safety_box
            };

            let mut correction = SVector::<f64, NUM_JOINTS>::zeros();
            let mut any_out = false;

            for entry in pose_jac.iter() {
                if boundary.contains(&entry.pos_m) {
                    continue;
                }

                any_out = true;
                self.report.num_links_out_of_box += 1;

                let dist_m = boundary.distance_outside(&entry.pos_m);
                if dist_m > self.report.max_dist_outside_box_m {
                    self.report.max_dist_outside_box_m = dist_m;
                }

                let force = boundary.restoring_force(
                    &entry.pos_m,
                    self.params.safety_force_temperature,
                    self.params.safety_force_magnitude,
                );

                let jac =
                    SMatrix::<f64, 3, NUM_JOINTS>::from_fn(|r, c| entry.jacobian[r][c]);

                correction += jac.transpose() * force;
            }

            if any_out {
                // The wrist roll joint cannot pull links back into the box
                correction[NUM_JOINTS - 1] = 0.0;

                for j in 0..NUM_JOINTS {
                    output_nm[j] = correction[j];
                }

                self.report.safety_correction_active = true;
            }
        }

        // Clamp to the active torque bounds
        let (low_nm, high_nm) = if self.in_reset {
            (
                &self.params.reset_torque_low_nm,
                &self.params.reset_torque_high_nm,
            )
        } else {
            (
                &self.params.joint_torque_low_nm,
                &self.params.joint_torque_high_nm,
            )
        };

        for j in 0..NUM_JOINTS {
            let clamped = clamp(&output_nm[j], &low_nm[j], &high_nm[j]);
            if clamped != output_nm[j] {
                self.report.torque_clamped[j] = true;
                output_nm[j] = clamped;
            }
        }

        Ok(output_nm)
    }
}
