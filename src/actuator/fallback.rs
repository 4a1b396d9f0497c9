//! Out-of-process fallback for actuator commands

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{ActuatorCommand, ActuatorStrategy};
use crate::config::FallbackConfig;
use crate::{BridgeError, Result};

/// Runs a configured command per operation and treats exit status 0 as success.
///
/// The run is awaited inline and bounded by `timeout`; a child that outlives it
/// is killed.
#[derive(Debug, Clone)]
pub struct ScriptFallback {
    working_dir: Option<PathBuf>,
    setpoint_command: Vec<String>,
    gas_command: Vec<String>,
    refresh_command: Vec<String>,
    timeout: Duration,
}

impl ScriptFallback {
    pub fn from_config(config: &FallbackConfig) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            setpoint_command: config.setpoint_command.clone(),
            gas_command: config.gas_command.clone(),
            refresh_command: config.refresh_command.clone(),
            timeout: config.timeout(),
        }
    }

    fn command_for(&self, command: &ActuatorCommand) -> &[String] {
        match command {
            ActuatorCommand::Setpoint { .. } => &self.setpoint_command,
            ActuatorCommand::Gas { .. } => &self.gas_command,
            ActuatorCommand::Refresh => &self.refresh_command,
        }
    }
}

#[async_trait::async_trait]
impl ActuatorStrategy for ScriptFallback {
    async fn execute(&mut self, command: &ActuatorCommand) -> Result<String> {
        let operation = command.operation();
        let Some((program, prefix)) = self.command_for(command).split_first() else {
            return Err(BridgeError::fallback_failed(operation, "no fallback command configured", None));
        };

        let args = command.fallback_args();
        debug!(operation, program = %program, ?args, "Running fallback");

        let mut process = Command::new(program);
        process
            .args(prefix)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            process.current_dir(dir);
        }

        let child = process.spawn().map_err(|e| {
            BridgeError::fallback_failed(operation, format!("could not start '{}': {}", program, e), None)
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                BridgeError::fallback_failed(operation, format!("timed out after {:?}", self.timeout), None)
            })?
            .map_err(|e| BridgeError::fallback_failed(operation, format!("wait failed: {}", e), None))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let last_line = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim().to_string();

        if output.status.success() {
            info!(operation, "Fallback succeeded");
            Ok(last_line)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => format!("exited with {}: {}", output.status, text),
            };
            Err(BridgeError::fallback_failed(operation, reason, output.status.code()))
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
