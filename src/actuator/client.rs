//! Resilient actuator client: primary channel with fallback

use std::fmt;

use tracing::{info, warn};

use super::{ActuatorCommand, ActuatorStrategy, ScriptFallback, SocketChannel};
use crate::config::ActuatorConfig;
use crate::{MfcId, Result};

/// Which path carried a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorPath {
    Primary,
    Fallback,
}

impl fmt::Display for ActuatorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorPath::Primary => f.write_str("primary"),
            ActuatorPath::Fallback => f.write_str("fallback"),
        }
    }
}

/// Sends actuator commands, trying the primary strategy first and the
/// fallback on any primary failure.
///
/// An error is returned only when both paths fail; callers log it and move on.
pub struct ActuatorServiceClient {
    primary: Box<dyn ActuatorStrategy>,
    fallback: Box<dyn ActuatorStrategy>,
}

impl ActuatorServiceClient {
    pub fn new(primary: Box<dyn ActuatorStrategy>, fallback: Box<dyn ActuatorStrategy>) -> Self {
        Self { primary, fallback }
    }

    /// Socket channel backed by the configured script fallback.
    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self::new(
            Box::new(SocketChannel::from_config(config)),
            Box::new(ScriptFallback::from_config(&config.fallback)),
        )
    }

    /// Change a setpoint. `gas_hint` is the controller's last known gas code.
    pub async fn set_setpoint(&mut self, mfc: MfcId, value: f32, gas_hint: Option<u8>) -> Result<ActuatorPath> {
        self.execute(ActuatorCommand::Setpoint { mfc, value, extra_arg: gas_hint.unwrap_or(0) }).await
    }

    pub async fn select_gas(&mut self, mfc: MfcId, gas_code: u8) -> Result<ActuatorPath> {
        self.execute(ActuatorCommand::Gas { mfc, gas_code }).await
    }

    pub async fn request_refresh(&mut self) -> Result<ActuatorPath> {
        self.execute(ActuatorCommand::Refresh).await
    }

    pub async fn execute(&mut self, command: ActuatorCommand) -> Result<ActuatorPath> {
        let operation = command.operation();

        match self.primary.execute(&command).await {
            Ok(message) => {
                info!(operation, via = self.primary.name(), "Actuator command accepted: {}", message);
                return Ok(ActuatorPath::Primary);
            }
            Err(e) => warn!(operation, "{}, falling back to {}", e, self.fallback.name()),
        }

        let message = self.fallback.execute(&command).await?;
        info!(operation, via = self.fallback.name(), "Actuator command accepted: {}", message);
        Ok(ActuatorPath::Fallback)
    }
}
