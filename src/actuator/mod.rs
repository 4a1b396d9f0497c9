//! Actuator control backend
//!
//! The bridge drives the MFCs through an external control service. Requests go
//! over a loopback [`SocketChannel`] first; when that path fails the same
//! operation is replayed through a [`ScriptFallback`]. [`ActuatorServiceClient`]
//! combines the two.

pub mod client;
pub mod fallback;
pub mod socket;

pub use client::{ActuatorPath, ActuatorServiceClient};
pub use fallback::ScriptFallback;
pub use socket::SocketChannel;

use serde::{Deserialize, Serialize};

use crate::{MfcId, Result};

/// One operation on the actuator backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    /// Change an MFC's setpoint. `extra_arg` is passed through to the
    /// fallback and is the controller's last known gas code.
    Setpoint { mfc: MfcId, value: f32, extra_arg: u8 },
    Gas { mfc: MfcId, gas_code: u8 },
    Refresh,
}

impl ActuatorCommand {
    /// Operation name, as used by the service protocol and in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            ActuatorCommand::Setpoint { .. } => "setpoint",
            ActuatorCommand::Gas { .. } => "gas",
            ActuatorCommand::Refresh => "refresh",
        }
    }

    /// Positional arguments handed to a fallback command.
    pub fn fallback_args(&self) -> Vec<String> {
        match *self {
            ActuatorCommand::Setpoint { mfc, value, extra_arg } => {
                vec![value.to_string(), mfc.to_string(), extra_arg.to_string()]
            }
            ActuatorCommand::Gas { mfc, gas_code } => vec![mfc.to_string(), gas_code.to_string()],
            ActuatorCommand::Refresh => Vec::new(),
        }
    }

    pub(crate) fn request(&self) -> ServiceRequest {
        match *self {
            ActuatorCommand::Setpoint { mfc, value, .. } => ServiceRequest::Setpoint { mfc_id: mfc, setpoint: value },
            ActuatorCommand::Gas { mfc, gas_code } => ServiceRequest::Gas { mfc_id: mfc, gas_cmd: gas_code },
            ActuatorCommand::Refresh => ServiceRequest::Refresh,
        }
    }
}

/// Request line sent to the control service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum ServiceRequest {
    Setpoint { mfc_id: MfcId, setpoint: f32 },
    Gas { mfc_id: MfcId, gas_cmd: u8 },
    Refresh,
}

/// Response line from the control service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// A way of executing actuator commands.
#[async_trait::async_trait]
pub trait ActuatorStrategy: Send {
    /// Execute one command.
    ///
    /// Returns the backend's acknowledgement message on success.
    async fn execute(&mut self, command: &ActuatorCommand) -> Result<String>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_the_service_json_shape() {
        let setpoint = ActuatorCommand::Setpoint { mfc: MfcId::FIRST, value: 10.0, extra_arg: 2 };
        let json = serde_json::to_value(setpoint.request()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "setpoint", "mfc_id": 0, "setpoint": 10.0}));

        let gas = ActuatorCommand::Gas { mfc: MfcId::SECOND, gas_code: 5 };
        let json = serde_json::to_value(gas.request()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "gas", "mfc_id": 1, "gas_cmd": 5}));

        let json = serde_json::to_value(ActuatorCommand::Refresh.request()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "refresh"}));
    }

    #[test]
    fn fallback_arguments_are_positional() {
        let setpoint = ActuatorCommand::Setpoint { mfc: MfcId::SECOND, value: 2.5, extra_arg: 3 };
        assert_eq!(setpoint.fallback_args(), vec!["2.5", "1", "3"]);

        let gas = ActuatorCommand::Gas { mfc: MfcId::FIRST, gas_code: 13 };
        assert_eq!(gas.fallback_args(), vec!["0", "13"]);

        assert!(ActuatorCommand::Refresh.fallback_args().is_empty());
    }

    #[test]
    fn missing_response_fields_default_to_failure() {
        let response: ServiceResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.success);
        assert!(response.message.is_empty());
    }
}
