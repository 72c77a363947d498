//! # Equipment Interface
//!
//! This module defines the interface structures which cross between the
//! control software and the arm equipment services.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
