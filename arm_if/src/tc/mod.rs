//! # Telecommand module
//!
//! This module provides telecommand functionality to the arm interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arm_ctrl;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// Internal
use arm_ctrl::ArmCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the arm software by the
/// operator.
///
/// The variant identifies the purpose of the telecommand and is used by the
/// telecommand processor to determine where to send the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    None,
    Heartbeat,
    MakeSafe,
    MakeUnsafe,
    Arm(ArmCmd),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("TC payload could not be deserialised: {0}")]
    InvalidPayload(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet.
    ///
    /// The packet is an object with a `type` string and, for types that
    /// carry data, a `payload` object, for example:
    ///
    /// `{"type": "ARM", "payload": "Reset"}`
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(TcParseError::InvalidJson(e)),
        };

        // Get the type of the TC
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => {
                return Err(TcParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };

        match type_str {
            "NONE" => Ok(Tc::None),
            "HEARTBEAT" => Ok(Tc::Heartbeat),
            "SAFE" => Ok(Tc::MakeSafe),
            "UNSAFE" => Ok(Tc::MakeUnsafe),
            "ARM" => {
                // Arm commands carry their data in the payload
                if val["payload"].is_null() {
                    return Err(TcParseError::MissingPayload(type_str.into()));
                }

                let cmd: ArmCmd = serde_json::from_value(val["payload"].clone())
                    .map_err(TcParseError::InvalidPayload)?;

                Ok(Tc::Arm(cmd))
            }
            _ => Err(TcParseError::InvalidType(format!(
                "{} is not a recognised TC type",
                type_str
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_plain_types() {
        assert_eq!(Tc::from_json(r#"{"type": "NONE"}"#).unwrap(), Tc::None);
        assert_eq!(Tc::from_json(r#"{"type": "SAFE"}"#).unwrap(), Tc::MakeSafe);
        assert_eq!(
            Tc::from_json(r#"{"type": "UNSAFE"}"#).unwrap(),
            Tc::MakeUnsafe
        );
        assert_eq!(
            Tc::from_json(r#"{"type": "HEARTBEAT"}"#).unwrap(),
            Tc::Heartbeat
        );
    }

    #[test]
    fn test_parse_arm_cmds() {
        let tc = Tc::from_json(
            r#"{"type": "ARM", "payload": {"Torque": {"torques_nm": [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5]}}}"#,
        )
        .unwrap();
        assert_eq!(
            tc,
            Tc::Arm(ArmCmd::Torque {
                torques_nm: [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5]
            })
        );

        let tc = Tc::from_json(
            r#"{"type": "ARM", "payload": {"PositionDelta": {"delta_m": [0.1, -0.1, 0.0]}}}"#,
        )
        .unwrap();
        assert_eq!(
            tc,
            Tc::Arm(ArmCmd::PositionDelta {
                delta_m: [0.1, -0.1, 0.0]
            })
        );

        let tc = Tc::from_json(r#"{"type": "ARM", "payload": "Reset"}"#).unwrap();
        assert_eq!(tc, Tc::Arm(ArmCmd::Reset));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Tc::from_json("not json"),
            Err(TcParseError::InvalidJson(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": 17}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "WARP"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "ARM"}"#),
            Err(TcParseError::MissingPayload(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "ARM", "payload": {"Torque": {"torques_nm": [1.0]}}}"#),
            Err(TcParseError::InvalidPayload(_))
        ));
    }
}
