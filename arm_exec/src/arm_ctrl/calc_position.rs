//! Position displacement target calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::*;
use arm_if::eqpt::arm::EePose;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCtrl {
    /// Turn a pre-scaled end-effector displacement into a pose target.
    ///
    /// The displacement is added to the current end-effector position and
    /// the result is clamped into the end-effector safety box, axis by axis.
    /// The orientation is carried over untouched, displacement commands have
    /// no say over it.
    pub(crate) fn calc_position_target(
        &mut self,
        delta_m: &[f64; 3],
        current: &EePose,
    ) -> EePose {
        let mut target_pos_m = [0f64; 3];
        for i in 0..3 {
            target_pos_m[i] = current.pos_m[i] + delta_m[i];
        }

        let (clamped_m, moved) = self.params.ee_safety_box.clamp_inside(&target_pos_m);
        self.report.ee_pos_clamped = moved;

        EePose {
            pos_m: clamped_m,
            orient_rad: current.orient_rad,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target_inside_box() {
        let mut ctrl = ArmCtrl::from_params(Params::default());

        let current = EePose {
            pos_m: [0.4, 0.0, 0.2],
            orient_rad: [0.1, 0.2, 0.3],
        };

        let target = ctrl.calc_position_target(&[0.05, -0.05, 0.1], &current);

        assert_eq!(target.pos_m, [0.45, -0.05, 0.30000000000000004]);
        assert_eq!(target.orient_rad, current.orient_rad);
        assert_eq!(ctrl.report.ee_pos_clamped, [false; 3]);
    }

    #[test]
    fn test_target_clamped_to_box() {
        let params = Params::default();
        let box_high = params.ee_safety_box.high_m;
        let box_low = params.ee_safety_box.low_m;
        let mut ctrl = ArmCtrl::from_params(params);

        let current = EePose {
            pos_m: [0.55, 0.15, 0.05],
            orient_rad: [0.0, 0.0, 1.5],
        };

        // Pushes past the high x and y faces and below the low z face
        let target = ctrl.calc_position_target(&[0.2, 0.2, -0.1], &current);

        assert_eq!(target.pos_m[0], box_high[0]);
        assert_eq!(target.pos_m[1], box_high[1]);
        assert_eq!(target.pos_m[2], box_low[2]);
        assert_eq!(ctrl.report.ee_pos_clamped, [true; 3]);

        // Orientation still untouched
        assert_eq!(target.orient_rad, [0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_partial_clamp_flags() {
        let mut ctrl = ArmCtrl::from_params(Params::default());

        let current = EePose {
            pos_m: [0.4, 0.0, 0.2],
            orient_rad: [0.0; 3],
        };

        let target = ctrl.calc_position_target(&[0.5, 0.0, 0.0], &current);

        assert_eq!(target.pos_m[0], 0.6);
        assert_eq!(ctrl.report.ee_pos_clamped, [true, false, false]);
        assert_eq!(target.pos_m[1], 0.0);
        assert_eq!(target.pos_m[2], 0.2);
    }
}
