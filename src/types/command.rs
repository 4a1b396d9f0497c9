//! Commands carried by radio frames

use super::{DeviceTag, MfcId};

/// One (controller, gas code) selection inside a gas-select downlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSelection {
    pub mfc: MfcId,
    pub gas_code: u8,
}

/// Every command the bridge sends or receives.
///
/// Downlink commands: `DeviceOn`, `DeviceOff`, `SetSetpoint`, `RefreshRequest`,
/// `GasSelect`. Uplink commands: `StatusReport`, `Heartbeat`, `Error`,
/// `AckSetpoint`. Each variant has exactly one frame layout, see [`crate::codec`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    DeviceOn,
    DeviceOff,
    SetSetpoint { mfc: MfcId, value: f32 },
    RefreshRequest,
    GasSelect { first: GasSelection, second: Option<GasSelection> },
    StatusReport { mfc: MfcId, setpoint: f32, flow: f32, device_tag: DeviceTag },
    Heartbeat,
    Error { source: u8, code: u8 },
    AckSetpoint { mfc: MfcId },
}

impl Command {
    /// Diagnostic error uplink.
    pub fn error(source: u8, code: u8) -> Self {
        Command::Error { source, code }
    }

    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Command::DeviceOn => "device-on",
            Command::DeviceOff => "device-off",
            Command::SetSetpoint { .. } => "set-setpoint",
            Command::RefreshRequest => "refresh",
            Command::GasSelect { .. } => "gas-select",
            Command::StatusReport { .. } => "status-report",
            Command::Heartbeat => "heartbeat",
            Command::Error { .. } => "error",
            Command::AckSetpoint { .. } => "ack-setpoint",
        }
    }
}
