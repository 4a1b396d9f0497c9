//! Command/telemetry bridge between a low-bandwidth radio link and local
//! mass-flow controllers.
//!
//! Flowgate decodes small binary downlink frames into actuator actions, drives
//! an external control service, and re-encodes the service's status telemetry
//! into uplink frames sent back over the same link.
//!
//! # Architecture
//!
//! - [`codec`]: binary uplink/downlink frame layouts
//! - [`telemetry`]: non-blocking publisher output and its line protocol
//! - [`actuator`]: control service client with a subprocess fallback
//! - [`dispatch`]: downlink command execution
//! - [`scheduler`]: the control loop that owns all bridge state
//! - [`transport`]: the radio exchange seam and its UDP driver
//!
//! # Example
//!
//! ```rust,no_run
//! use flowgate::{BridgeConfig, bridge};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::from_env()?;
//!     let mut scheduler = bridge::connect(&config).await?;
//!     scheduler.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
mod error;
pub mod logging;
pub mod scheduler;
pub mod telemetry;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod transport;
pub mod types;

pub use actuator::{ActuatorPath, ActuatorServiceClient, ActuatorStrategy};
pub use config::BridgeConfig;
pub use dispatch::DownlinkDispatcher;
pub use error::*;
pub use scheduler::{TickSummary, UplinkScheduler};
pub use telemetry::{TelemetryLineParser, TelemetryRecord, TelemetrySource};
pub use transport::{DownlinkTransport, ExchangeOutcome};
pub use types::*;
