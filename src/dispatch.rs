//! Downlink command dispatch
//!
//! Turns a received downlink into actuator calls and context updates, and
//! returns the uplinks those actions call for.

use std::iter;

use tracing::{debug, info, warn};

use crate::actuator::ActuatorServiceClient;
use crate::codec;
use crate::types::{BridgeContext, Command, Frame, GasSelection, GasTable, MfcId};
use crate::FrameError;

/// Executes downlink commands against the actuator backend.
///
/// Holds no state of its own between calls; everything it changes lives in
/// the [`BridgeContext`] lent by the caller.
pub struct DownlinkDispatcher {
    client: ActuatorServiceClient,
}

impl DownlinkDispatcher {
    pub fn new(client: ActuatorServiceClient) -> Self {
        Self { client }
    }

    /// Decode and execute one downlink payload.
    ///
    /// Returns the follow-up uplinks, in send order. Malformed frames and
    /// unknown command codes produce none.
    pub async fn dispatch(&mut self, ctx: &mut BridgeContext, payload: &[u8]) -> Vec<Command> {
        let command = match codec::decode_downlink(payload) {
            Ok(command) => command,
            Err(FrameError::UnknownCommand { code }) => {
                debug!("Ignoring downlink with unknown command {:#04x}", code);
                return Vec::new();
            }
            Err(e) => {
                warn!("Ignoring malformed downlink [{}]: {}", Frame::from(payload), e);
                return Vec::new();
            }
        };

        debug!(command = command.name(), "Dispatching downlink");

        match command {
            Command::DeviceOn => {
                ctx.device_on = true;
                info!("Device ON");
                Vec::new()
            }
            Command::DeviceOff => {
                ctx.device_on = false;
                info!("Device OFF");
                Vec::new()
            }
            Command::SetSetpoint { mfc, value } => self.set_setpoint(ctx, mfc, value).await,
            Command::RefreshRequest => {
                match self.client.request_refresh().await {
                    Ok(path) => info!(%path, "Refresh requested"),
                    Err(e) => warn!("Refresh request failed: {}", e),
                }
                Vec::new()
            }
            Command::GasSelect { first, second } => {
                for selection in iter::once(first).chain(second) {
                    self.select_gas(selection).await;
                }
                Vec::new()
            }
            other => {
                debug!(command = other.name(), "Not a downlink command, ignoring");
                Vec::new()
            }
        }
    }

    async fn set_setpoint(&mut self, ctx: &mut BridgeContext, mfc: MfcId, value: f32) -> Vec<Command> {
        let state = ctx.actuators.get_mut(mfc);
        state.current_setpoint = value;
        let gas_hint = state.last_gas_code;

        info!(%mfc, setpoint = value, "Setpoint received");

        match self.client.set_setpoint(mfc, value, gas_hint).await {
            Ok(path) => {
                info!(%mfc, %path, "Setpoint {:.2} applied", value);
                vec![Command::AckSetpoint { mfc }]
            }
            Err(e) => {
                warn!(%mfc, "Setpoint {:.2} not applied: {}", value, e);
                Vec::new()
            }
        }
    }

    async fn select_gas(&mut self, selection: GasSelection) {
        let GasSelection { mfc, gas_code } = selection;
        let name = GasTable::name_of(gas_code);
        info!(%mfc, gas = name, "Gas selection {:#04x}", gas_code);

        if let Err(e) = self.client.select_gas(mfc, gas_code).await {
            warn!(%mfc, gas = name, "Gas selection failed: {}", e);
        }
    }
}
