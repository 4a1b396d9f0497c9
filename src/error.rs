//! Error types for the command/telemetry bridge.
//!
//! Every failure in the bridge maps onto one [`BridgeError`] variant. Only
//! startup failures are fatal; everything the control loop meets at runtime
//! is recovered locally and reported through `tracing`.
//!
//! ## Error Categories
//!
//! - **Frame Errors**: Downlink/uplink bytes outside the expected layout
//! - **Transport Errors**: Radio exchange timeouts and failure codes
//! - **Actuator Errors**: Primary channel or fallback invocation failures
//! - **Telemetry Errors**: Status lines that match no known grammar
//! - **Startup Errors**: Configuration and transport initialization failures
//!
//! ## Recovery
//!
//! ```rust
//! use flowgate::BridgeError;
//!
//! let error = BridgeError::actuator_failed("setpoint", "connection refused");
//! assert!(error.is_retryable());
//! assert!(!error.is_fatal());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Reasons a byte sequence is not a valid frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FrameError {
    #[error("frame is empty")]
    Empty,

    #[error("frame of {len} bytes is too short to carry a command")]
    TooShort { len: usize },

    #[error("command {code:#04x} expects {min}..={max} bytes, got {len}")]
    Length { code: u8, len: usize, min: usize, max: usize },

    #[error("unknown command code {code:#04x}")]
    UnknownCommand { code: u8 },

    #[error("mfc id {id} is outside the supported range 0..=1")]
    InvalidMfcId { id: i64 },
}

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    #[error("Transport exchange timed out")]
    TransportTimeout,

    #[error("Transport exchange failed with code {code}")]
    TransportFailure { code: i32 },

    #[error("Actuator service {operation} failed: {reason}")]
    ActuatorService {
        operation: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Fallback {operation} failed: {reason}")]
    Fallback { operation: String, reason: String, exit_code: Option<i32> },

    #[error("Unparsable telemetry line '{line}': {details}")]
    TelemetryParse { line: String, details: String },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Initialization failed: {reason}")]
    Initialization {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::TransportTimeout => true,
            BridgeError::TransportFailure { .. } => true,
            BridgeError::ActuatorService { .. } => true,
            BridgeError::Fallback { .. } => true,
            BridgeError::MalformedFrame(_) => false,
            BridgeError::TelemetryParse { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::Initialization { .. } => false,
        }
    }

    /// Returns whether this error must stop the process.
    ///
    /// Only startup failures are fatal; the control loop recovers from the rest.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Initialization { .. } | BridgeError::Config { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::MalformedFrame(_) => vec![
                "Check the network server payload encoder",
                "Verify the command code table matches on both ends",
            ],
            BridgeError::TransportTimeout => vec![
                "Check radio coverage and gateway availability",
                "Increase the exchange timeout",
            ],
            BridgeError::TransportFailure { .. } => vec![
                "Check the radio daemon logs",
                "Verify the network session is still active",
            ],
            BridgeError::ActuatorService { .. } => vec![
                "Ensure the status publisher is running",
                "Check that the actuator endpoint port is free and reachable",
            ],
            BridgeError::Fallback { .. } => vec![
                "Check the fallback command path and working directory",
                "Run the fallback command by hand to see its output",
            ],
            BridgeError::TelemetryParse { .. } => vec![
                "Check the status publisher output format",
                "Verify the MFC id is 0 or 1",
            ],
            BridgeError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Remove unknown keys and retry",
            ],
            BridgeError::Initialization { .. } => vec![
                "Check the radio daemon address",
                "Verify no other process holds the transport socket",
            ],
        }
    }

    /// Helper constructor for primary actuator channel failures.
    pub fn actuator_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::ActuatorService { operation: operation.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for primary actuator channel failures with source.
    pub fn actuator_failed_with_source(
        operation: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::ActuatorService {
            operation: operation.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for fallback invocation failures.
    pub fn fallback_failed(
        operation: impl Into<String>,
        reason: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        BridgeError::Fallback { operation: operation.into(), reason: reason.into(), exit_code }
    }

    /// Helper constructor for telemetry lines that match no grammar.
    pub fn telemetry_parse(line: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::TelemetryParse { line: line.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        BridgeError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for startup failures.
    pub fn initialization_failed(reason: impl Into<String>) -> Self {
        BridgeError::Initialization { reason: reason.into(), source: None }
    }

    /// Helper constructor for startup failures with source.
    pub fn initialization_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Initialization { reason: reason.into(), source: Some(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            operation in "[a-z]{1,12}",
            reason in ".*",
            code in any::<i32>(),
            id in any::<i64>(),
            len in 0usize..64
          ) {
            let actuator = BridgeError::actuator_failed(operation.clone(), reason.clone());
            let msg = actuator.to_string();
            prop_assert!(msg.contains(&operation));
            prop_assert!(msg.contains(&reason));

            let failure = BridgeError::TransportFailure { code };
            prop_assert!(failure.to_string().contains(&code.to_string()));

            let frame = BridgeError::from(FrameError::InvalidMfcId { id });
            prop_assert!(frame.to_string().contains(&id.to_string()));

            let short = FrameError::TooShort { len };
            prop_assert!(short.to_string().contains(&len.to_string()));
          }

          #[test]
          fn source_chain_is_preserved(base_message in ".*") {
            let io = std::io::Error::other(base_message.clone());
            let err = BridgeError::actuator_failed_with_source("gas", "write failed", Box::new(io));

            let source = std::error::Error::source(&err);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();
        assert_send_sync_static::<FrameError>();

        let error = BridgeError::initialization_failed("radio");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn classification_matches_recovery_policy() {
        assert!(BridgeError::TransportTimeout.is_retryable());
        assert!(BridgeError::TransportFailure { code: -2 }.is_retryable());
        assert!(!BridgeError::from(FrameError::Empty).is_retryable());
        assert!(!BridgeError::telemetry_parse("STATUS:", "no fields").is_retryable());

        assert!(BridgeError::initialization_failed("bind").is_fatal());
        assert!(BridgeError::config_error("/etc/flowgate.yaml", "bad yaml").is_fatal());
        assert!(!BridgeError::fallback_failed("setpoint", "exit 1", Some(1)).is_fatal());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = vec![
            BridgeError::from(FrameError::UnknownCommand { code: 0x7f }),
            BridgeError::TransportTimeout,
            BridgeError::TransportFailure { code: -1 },
            BridgeError::actuator_failed("refresh", "no response"),
            BridgeError::fallback_failed("gas", "not configured", None),
            BridgeError::telemetry_parse("STATUS:9:1.0", "mfc id"),
            BridgeError::config_error("cfg.yaml", "missing"),
            BridgeError::initialization_failed("bind"),
        ];

        for err in &errors {
            let suggestions = err.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {err}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
