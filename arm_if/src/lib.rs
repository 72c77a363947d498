//! # Arm interface crate.
//!
//! Provides the common interfaces between the arm control software and the
//! equipment services which drive the physical arm.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Command and response definitions for equipment (the arm itself)
pub mod eqpt;

/// Service abstractions over the external arm providers
pub mod svc;
