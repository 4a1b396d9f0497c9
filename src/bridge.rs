//! Assembly of the production bridge from configuration

use tracing::{error, warn};

use crate::actuator::ActuatorServiceClient;
use crate::config::BridgeConfig;
use crate::dispatch::DownlinkDispatcher;
use crate::scheduler::UplinkScheduler;
use crate::telemetry::{PublisherProcess, TelemetrySource};
use crate::transport::UdpTransport;
use crate::Result;

/// Build a scheduler wired to the UDP radio, the actuator service and the
/// status publisher.
///
/// Only a transport failure is an error. A publisher that cannot be started is
/// logged and the bridge runs heartbeat-only.
pub async fn connect(config: &BridgeConfig) -> Result<UplinkScheduler> {
    let transport = UdpTransport::connect(&config.transport).await.inspect_err(|e| {
        error!("Radio transport initialization failed: {}", e);
    })?;

    let telemetry = match PublisherProcess::spawn(&config.publisher) {
        Ok(publisher) => Some(Box::new(publisher) as Box<dyn TelemetrySource>),
        Err(e) => {
            warn!("Status publisher unavailable, sending heartbeats only: {}", e);
            None
        }
    };

    let dispatcher = DownlinkDispatcher::new(ActuatorServiceClient::from_config(&config.actuator));

    Ok(UplinkScheduler::new(Box::new(transport), dispatcher, telemetry, config))
}
