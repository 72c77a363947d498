//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use crate::data_store::{DataStore, SafeModeCause};
use arm_if::tc::Tc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. Safe mode
/// TCs are always honoured, arm commands are dropped while the software is
/// safe.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    // Handle different Tcs
    match tc {
        Tc::None => (),
        Tc::Heartbeat => {
            debug!("Recieved Heartbeat");
        }
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        }
        Tc::Arm(cmd) => {
            if ds.safe {
                warn!("Arm command rejected, the software is in safe mode");
            } else {
                ds.arm_cmd = Some(cmd.clone());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use arm_if::tc::arm_ctrl::ArmCmd;

    #[test]
    fn test_safe_mode_tcs() {
        let mut ds = DataStore::default();

        exec(&mut ds, &Tc::MakeSafe);
        assert!(ds.safe);
        assert_eq!(ds.safe_cause, Some(SafeModeCause::MakeSafeTc));

        exec(&mut ds, &Tc::MakeUnsafe);
        assert!(!ds.safe);
    }

    #[test]
    fn test_arm_cmd_routing() {
        let mut ds = DataStore::default();

        exec(&mut ds, &Tc::Arm(ArmCmd::Reset));
        assert_eq!(ds.arm_cmd, Some(ArmCmd::Reset));
    }

    #[test]
    fn test_arm_cmd_rejected_when_safe() {
        let mut ds = DataStore::default();
        ds.make_safe(SafeModeCause::MakeSafeTc);

        exec(&mut ds, &Tc::Arm(ArmCmd::Reset));
        assert!(ds.arm_cmd.is_none());

        // MakeUnsafe is honoured even while safe
        exec(&mut ds, &Tc::MakeUnsafe);
        assert!(!ds.safe);
        exec(&mut ds, &Tc::Arm(ArmCmd::Stop));
        assert_eq!(ds.arm_cmd, Some(ArmCmd::Stop));
    }

    #[test]
    fn test_none_and_heartbeat_do_nothing() {
        let mut ds = DataStore::default();

        exec(&mut ds, &Tc::None);
        exec(&mut ds, &Tc::Heartbeat);

        assert!(!ds.safe);
        assert!(ds.arm_cmd.is_none());
    }
}
