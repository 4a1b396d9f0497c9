//! Bridge configuration
//!
//! Configuration is a single YAML document. Every key is optional; missing
//! keys take the defaults below, which match a stock gateway install.
//!
//! ```yaml
//! loop_interval_ms: 5000
//! transport:
//!   bind: "0.0.0.0:0"
//!   radio: "127.0.0.1:1700"
//!   exchange_timeout_ms: 10000
//! actuator:
//!   endpoint: "127.0.0.1:8765"
//!   connect_timeout_ms: 1000
//!   response_timeout_ms: 2000
//!   fallback:
//!     working_dir: /opt/mfc
//!     setpoint_command: ["python3", "mfc_setpoint_controller.py"]
//!     timeout_ms: 30000
//! publisher:
//!   command: ["python3", "mfc_status_publisher.py"]
//!   working_dir: /opt/mfc
//! forwarding:
//!   publisher_errors: false
//! retry:
//!   max_diagnostic_frames: 3
//!   backoff_base_ms: 50
//! ```
//!
//! The binary reads the path from `FLOWGATE_CONFIG`; without it the defaults apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{BridgeError, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "FLOWGATE_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Delay between control loop iterations
    pub loop_interval_ms: u64,
    pub transport: TransportConfig,
    pub actuator: ActuatorConfig,
    pub publisher: PublisherConfig,
    pub forwarding: ForwardingPolicy,
    pub retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 5_000,
            transport: TransportConfig::default(),
            actuator: ActuatorConfig::default(),
            publisher: PublisherConfig::default(),
            forwarding: ForwardingPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Radio daemon connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Local UDP address to bind
    pub bind: String,
    /// Address of the radio daemon
    pub radio: String,
    /// How long one uplink waits for the daemon's answer
    pub exchange_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:0".to_string(),
            radio: "127.0.0.1:1700".to_string(),
            exchange_timeout_ms: 10_000,
        }
    }
}

/// Actuator service endpoint and fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub fallback: FallbackConfig,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:8765".to_string(),
            connect_timeout_ms: 1_000,
            response_timeout_ms: 2_000,
            fallback: FallbackConfig::default(),
        }
    }
}

/// Out-of-process commands used when the actuator channel is unavailable.
///
/// Each command is an argv prefix; operation arguments are appended. An empty
/// command means the operation has no fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub working_dir: Option<PathBuf>,
    /// Receives `<setpoint> <mfc_id> <extra_arg>`
    pub setpoint_command: Vec<String>,
    /// Receives `<mfc_id> <gas_code>`
    pub gas_command: Vec<String>,
    /// Receives no arguments
    pub refresh_command: Vec<String>,
    /// Upper bound on a single fallback run; the child is killed afterwards
    pub timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            setpoint_command: vec!["python3".to_string(), "mfc_setpoint_controller.py".to_string()],
            gas_command: Vec::new(),
            refresh_command: Vec::new(),
            timeout_ms: 30_000,
        }
    }
}

/// The long-running status publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), "mfc_status_publisher.py".to_string()],
            working_dir: None,
        }
    }
}

/// Which publisher events are forwarded as Error uplinks. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardingPolicy {
    pub publisher_errors: bool,
    pub publisher_info: bool,
    pub parse_failures: bool,
}

/// Bounds on diagnostic uplinks after failed exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Consecutive diagnostic frames queued for one failing uplink
    pub max_diagnostic_frames: u32,
    /// First backoff before a diagnostic frame; doubles per level
    pub backoff_base_ms: u64,
    /// Radio exchanges allowed per loop iteration
    pub max_exchanges_per_cycle: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_diagnostic_frames: 3, backoff_base_ms: 50, max_exchanges_per_cycle: 8 }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base, 2x, 4x, ... capped at 32x.
    pub fn backoff(&self, depth: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1 << depth.min(5)))
    }
}

impl BridgeConfig {
    /// Load from `FLOWGATE_CONFIG`, or defaults when the variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => {
                info!("{} not set, using built-in configuration", CONFIG_ENV);
                let config = Self::default();
                config.validate(Path::new("<defaults>"))?;
                Ok(config)
            }
        }
    }

    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config_error(path, format!("cannot read file: {}", e)))?;
        let config = Self::from_yaml_str(&text).map_err(|e| match e {
            BridgeError::Config { details, .. } => BridgeError::config_error(path, details),
            other => other,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| BridgeError::config_error("<inline>", e.to_string()))?;
        config.validate(Path::new("<inline>"))?;
        Ok(config)
    }

    /// Reject settings the bridge cannot run with.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let fail = |details: &str| Err(BridgeError::config_error(origin, details));

        if self.loop_interval_ms == 0 {
            return fail("loop_interval_ms must be greater than zero");
        }
        if self.transport.exchange_timeout_ms == 0 {
            return fail("transport.exchange_timeout_ms must be greater than zero");
        }
        if self.actuator.response_timeout_ms == 0 || self.actuator.connect_timeout_ms == 0 {
            return fail("actuator timeouts must be greater than zero");
        }
        if self.actuator.fallback.timeout_ms == 0 {
            return fail("actuator.fallback.timeout_ms must be greater than zero");
        }
        if self.publisher.command.is_empty() {
            return fail("publisher.command must name a program");
        }
        if self.retry.max_exchanges_per_cycle == 0 {
            return fail("retry.max_exchanges_per_cycle must be at least 1");
        }

        Ok(())
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

impl TransportConfig {
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}

impl ActuatorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl FallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
