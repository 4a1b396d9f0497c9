//! UDP link to a local radio daemon
//!
//! Each uplink is one datagram. The daemon answers each uplink with one
//! datagram whose first byte is a status, followed by any downlink payload:
//!
//! | Status | Meaning |
//! |---|---|
//! | `0x00` | delivered, no downlink |
//! | `0x01` | delivered, downlink follows |
//! | other | failure code |

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::{DownlinkTransport, ExchangeOutcome};
use crate::config::TransportConfig;
use crate::{BridgeError, Frame, Result};

pub mod status {
    pub const DELIVERED: u8 = 0x00;
    pub const DOWNLINK: u8 = 0x01;
}

/// Failure code reported when the socket itself errors
pub const SOCKET_FAILURE: i32 = -1;

/// Largest datagram accepted from the daemon
const MAX_DATAGRAM: usize = 256;

pub struct UdpTransport {
    socket: UdpSocket,
    exchange_timeout: Duration,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind locally and connect to the radio daemon.
    ///
    /// Failure here is the bridge's initialization failure.
    pub async fn connect(config: &TransportConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind).await.map_err(|e| {
            BridgeError::initialization_failed_with_source(
                format!("could not bind radio socket on {}", config.bind),
                Box::new(e),
            )
        })?;
        socket.connect(&config.radio).await.map_err(|e| {
            BridgeError::initialization_failed_with_source(
                format!("could not reach radio daemon at {}", config.radio),
                Box::new(e),
            )
        })?;

        info!(local = ?socket.local_addr().ok(), radio = %config.radio, "Radio transport ready");

        Ok(Self { socket, exchange_timeout: config.exchange_timeout(), buf: vec![0u8; MAX_DATAGRAM] })
    }

    /// Drop answers that arrived after an earlier exchange timed out.
    fn discard_stale(&mut self) {
        while let Ok(n) = self.socket.try_recv(&mut self.buf) {
            debug!("Discarding stale {} byte reply from radio daemon", n);
        }
    }
}

#[async_trait::async_trait]
impl DownlinkTransport for UdpTransport {
    async fn exchange(&mut self, uplink: &Frame) -> ExchangeOutcome {
        self.discard_stale();

        if let Err(e) = self.socket.send(uplink.as_bytes()).await {
            warn!("Radio send failed: {}", e);
            return ExchangeOutcome::Failed(e.raw_os_error().unwrap_or(SOCKET_FAILURE));
        }
        trace!(%uplink, "Uplink sent");

        let reply = timeout(self.exchange_timeout, self.socket.recv(&mut self.buf)).await;
        let received = match reply {
            Err(_) => return ExchangeOutcome::TimedOut,
            Ok(Err(e)) => {
                warn!("Radio receive failed: {}", e);
                return ExchangeOutcome::Failed(e.raw_os_error().unwrap_or(SOCKET_FAILURE));
            }
            Ok(Ok(n)) => &self.buf[..n],
        };

        match received.split_first() {
            None => ExchangeOutcome::Failed(SOCKET_FAILURE),
            Some((&status::DELIVERED, _)) => ExchangeOutcome::Delivered,
            Some((&status::DOWNLINK, [])) => ExchangeOutcome::Delivered,
            Some((&status::DOWNLINK, payload)) => ExchangeOutcome::Downlink(Frame::from(payload)),
            Some((&code, _)) => ExchangeOutcome::Failed(i32::from(code)),
        }
    }
}
