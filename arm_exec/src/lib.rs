//! # Arm library.
//!
//! This library allows other crates (and the benchmarks) in the workspace to access items defined
//! inside the arm executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm control module - converts arm commands into safety-shaped actuator demands
pub mod arm_ctrl;

/// Arm driver - runs the observe/compute/act cycle against the equipment services
pub mod arm_driver;

/// Global data store - root-cause tracked safe mode and cycle counters
pub mod data_store;

/// Pose/Jacobian cache - holds the last successfully decoded link data
pub mod pose_jac;

/// Simulated arm - provides equipment services without any hardware attached
#[cfg(feature = "sim")]
pub mod sim_arm;
