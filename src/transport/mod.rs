//! Radio transport seam
//!
//! The bridge sees the radio as a single request/response exchange: send one
//! uplink, get back at most one downlink. Session setup and the MAC layer stay
//! behind [`DownlinkTransport`].

pub mod udp;

pub use udp::UdpTransport;

use crate::types::wire::{error_code, error_source};
use crate::{BridgeError, Command, Frame};

/// Result of one uplink exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Uplink delivered and the network answered with a downlink
    Downlink(Frame),
    /// Uplink delivered, nothing came back
    Delivered,
    /// No confirmation within the exchange timeout
    TimedOut,
    /// Any other failure, with the radio's status code
    Failed(i32),
}

impl ExchangeOutcome {
    /// Error uplink reporting this outcome, if it was a failure.
    pub fn diagnostic(&self) -> Option<Command> {
        match self {
            ExchangeOutcome::TimedOut => Some(Command::error(error_source::RADIO, error_code::EXCHANGE_TIMEOUT)),
            ExchangeOutcome::Failed(_) => Some(Command::error(error_source::RADIO, error_code::EXCHANGE_FAILURE)),
            ExchangeOutcome::Downlink(_) | ExchangeOutcome::Delivered => None,
        }
    }

    /// The failure as an error, for logging.
    pub fn error(&self) -> Option<BridgeError> {
        match *self {
            ExchangeOutcome::TimedOut => Some(BridgeError::TransportTimeout),
            ExchangeOutcome::Failed(code) => Some(BridgeError::TransportFailure { code }),
            ExchangeOutcome::Downlink(_) | ExchangeOutcome::Delivered => None,
        }
    }
}

/// A radio that can perform one uplink/downlink exchange at a time.
///
/// Failures are part of the outcome, never an `Err`: the control loop reacts
/// to them with diagnostic uplinks instead of stopping.
#[async_trait::async_trait]
pub trait DownlinkTransport: Send {
    async fn exchange(&mut self, uplink: &Frame) -> ExchangeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn failures_map_to_radio_diagnostics() {
        let timeout = ExchangeOutcome::TimedOut.diagnostic().unwrap();
        assert_eq!(codec::encode(&timeout).as_bytes(), &[0x1F, 0x03, 0x04]);

        let failed = ExchangeOutcome::Failed(-1116).diagnostic().unwrap();
        assert_eq!(codec::encode(&failed).as_bytes(), &[0x1F, 0x03, 0x05]);

        assert!(ExchangeOutcome::Delivered.diagnostic().is_none());
        assert!(ExchangeOutcome::Delivered.error().is_none());
        assert!(ExchangeOutcome::TimedOut.error().is_some_and(|e| e.is_retryable()));
        assert!(ExchangeOutcome::Downlink(Frame::new(vec![0x01, 0x00])).diagnostic().is_none());
    }
}
