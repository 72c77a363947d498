//! Axis-aligned safety boundary for link and end-effector positions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An axis-aligned box in the arm base frame.
///
/// Positions on a face of the box count as inside, a link only attracts a
/// restoring force once it has actually left the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyBox {
    /// Lower corner of the box.
    ///
    /// Units: metres
    pub low_m: [f64; 3],

    /// Upper corner of the box.
    ///
    /// Units: metres
    pub high_m: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SafetyBox {
    /// True if the position is inside the box, bounds inclusive.
    pub fn contains(&self, pos_m: &[f64; 3]) -> bool {
        (0..3).all(|i| pos_m[i] >= self.low_m[i] && pos_m[i] <= self.high_m[i])
    }

    /// Restoring force pointing back into the box.
    ///
    /// Each axis outside the box contributes a force towards the violated
    /// face, growing exponentially with penetration depth:
    /// `magnitude * exp(depth * temperature)`. Axes inside the box contribute
    /// zero, so a contained position always maps to a zero force.
    pub fn restoring_force(
        &self,
        pos_m: &[f64; 3],
        temperature: f64,
        magnitude: f64,
    ) -> Vector3<f64> {
        let mut force = Vector3::zeros();

        for i in 0..3 {
            if pos_m[i] > self.high_m[i] {
                let depth = pos_m[i] - self.high_m[i];
                force[i] = -(depth * temperature).exp() * magnitude;
            } else if pos_m[i] < self.low_m[i] {
                let depth = self.low_m[i] - pos_m[i];
                force[i] = (depth * temperature).exp() * magnitude;
            }
        }

        force
    }

    /// Clamp a position into the box, flagging each axis that was moved.
    pub fn clamp_inside(&self, pos_m: &[f64; 3]) -> ([f64; 3], [bool; 3]) {
        let mut clamped = [0f64; 3];
        let mut moved = [false; 3];

        for i in 0..3 {
            clamped[i] = clamp(&pos_m[i], &self.low_m[i], &self.high_m[i]);
            moved[i] = clamped[i] != pos_m[i];
        }

        (clamped, moved)
    }

    /// Euclidian distance from the position to the box surface, zero if the
    /// position is inside. Diagnostic only, the restoring force works on the
    /// per-axis depths directly.
    pub fn distance_outside(&self, pos_m: &[f64; 3]) -> f64 {
        let mut excess = [0f64; 3];

        for i in 0..3 {
            if pos_m[i] > self.high_m[i] {
                excess[i] = pos_m[i] - self.high_m[i];
            } else if pos_m[i] < self.low_m[i] {
                excess[i] = self.low_m[i] - pos_m[i];
            }
        }

        // Inputs have equal dimentions so the norm always exists
        util::maths::norm(&excess, &[0.0; 3]).unwrap_or(0.0)
    }

    /// The first axis on which low > high, or `None` if the box is valid.
    pub fn invalid_axis(&self) -> Option<usize> {
        (0..3).find(|&i| self.low_m[i] > self.high_m[i])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_box() -> SafetyBox {
        SafetyBox {
            low_m: [0.0, 0.0, 0.0],
            high_m: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_contains_inclusive() {
        let sb = unit_box();

        assert!(sb.contains(&[0.5, 0.5, 0.5]));

        // Faces and corners are inside
        assert!(sb.contains(&[0.0, 0.5, 0.5]));
        assert!(sb.contains(&[1.0, 1.0, 1.0]));
        assert!(sb.contains(&[0.0, 0.0, 0.0]));

        assert!(!sb.contains(&[1.0 + 1e-12, 0.5, 0.5]));
        assert!(!sb.contains(&[0.5, -0.1, 0.5]));
        assert!(!sb.contains(&[0.5, 0.5, 2.0]));
    }

    #[test]
    fn test_force_zero_inside() {
        let sb = unit_box();

        for pos in [[0.5, 0.5, 0.5], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]].iter() {
            let f = sb.restoring_force(pos, 5.0, 2.0);
            assert_eq!(f, Vector3::zeros());
        }
    }

    #[test]
    fn test_force_direction_and_growth() {
        let sb = unit_box();

        // Above the high x face the force points in -x
        let f = sb.restoring_force(&[1.2, 0.5, 0.5], 5.0, 2.0);
        assert!(f[0] < 0.0);
        assert_eq!(f[1], 0.0);
        assert_eq!(f[2], 0.0);
        assert!((f[0] + (0.2f64 * 5.0).exp() * 2.0).abs() < 1e-12);

        // Below the low z face the force points in +z, including for
        // penetrations deeper than the box is wide
        let f = sb.restoring_force(&[0.5, 0.5, -2.0], 5.0, 2.0);
        assert!(f[2] > 0.0);
        assert!((f[2] - (2.0f64 * 5.0).exp() * 2.0).abs() < 1e-3);

        // Deeper penetration, strictly larger force
        let shallow = sb.restoring_force(&[1.1, 0.5, 0.5], 5.0, 2.0);
        let deep = sb.restoring_force(&[1.3, 0.5, 0.5], 5.0, 2.0);
        assert!(deep[0] < shallow[0]);

        // Two axes out at once, both contribute
        let f = sb.restoring_force(&[-0.1, 0.5, 1.1], 5.0, 2.0);
        assert!(f[0] > 0.0);
        assert!(f[2] < 0.0);
    }

    #[test]
    fn test_clamp_inside() {
        let sb = unit_box();

        let (pos, moved) = sb.clamp_inside(&[0.5, 0.5, 0.5]);
        assert_eq!(pos, [0.5, 0.5, 0.5]);
        assert_eq!(moved, [false, false, false]);

        let (pos, moved) = sb.clamp_inside(&[1.5, -0.5, 0.5]);
        assert_eq!(pos, [1.0, 0.0, 0.5]);
        assert_eq!(moved, [true, true, false]);
    }

    #[test]
    fn test_distance_outside() {
        let sb = unit_box();

        assert_eq!(sb.distance_outside(&[0.5, 0.5, 0.5]), 0.0);
        assert!((sb.distance_outside(&[1.3, 0.5, 0.5]) - 0.3).abs() < 1e-12);

        // 3-4-5 triangle across two axes
        let d = sb.distance_outside(&[1.3, 0.5, -0.4]);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_axis() {
        assert_eq!(unit_box().invalid_axis(), None);

        let sb = SafetyBox {
            low_m: [0.0, 2.0, 0.0],
            high_m: [1.0, 1.0, 1.0],
        };
        assert_eq!(sb.invalid_axis(), Some(1));
    }
}
