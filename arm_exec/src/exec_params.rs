//! # Arm Executable Parameters
//!
//! This module provides parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct ArmExecParams {
    /// The rate the main control loop cycles at.
    ///
    /// Units: hertz
    pub cycle_rate_hz: f64,
}
