//! Uplink scheduler: the bridge's control loop
//!
//! Each iteration polls the status publisher, turns what it reported into
//! uplinks, and pushes them through the radio one exchange at a time. Every
//! exchange may bring back a downlink, which is dispatched immediately and may
//! queue more uplinks of its own.
//!
//! Failed exchanges queue a diagnostic Error uplink in place of recursing. A
//! diagnostic that fails in turn queues another one level deeper, up to
//! `retry.max_diagnostic_frames`, each after an exponential backoff.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::config::{BridgeConfig, ForwardingPolicy, RetryPolicy};
use crate::dispatch::DownlinkDispatcher;
use crate::telemetry::{StatusReading, TelemetryLineParser, TelemetryRecord, TelemetrySource};
use crate::transport::{DownlinkTransport, ExchangeOutcome};
use crate::types::wire::{error_code, error_source};
use crate::types::{BridgeContext, Command, MfcId};

/// An uplink waiting for its exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingUplink {
    command: Command,
    /// How many failed exchanges led to this uplink (0 for regular traffic)
    depth: u32,
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Telemetry records parsed this iteration
    pub records: usize,
    /// Radio exchanges performed
    pub exchanges: u32,
    /// Exchanges that timed out or failed
    pub failures: u32,
    /// Downlinks received
    pub downlinks: u32,
    /// Uplinks dropped because the per-iteration budget ran out
    pub dropped: usize,
}

/// Owns the bridge context and drives every exchange.
pub struct UplinkScheduler {
    transport: Box<dyn DownlinkTransport>,
    dispatcher: DownlinkDispatcher,
    telemetry: Option<Box<dyn TelemetrySource>>,
    parser: TelemetryLineParser,
    context: BridgeContext,
    forwarding: ForwardingPolicy,
    retry: RetryPolicy,
    period: Duration,
    iterations: u64,
}

impl UplinkScheduler {
    /// `telemetry` is `None` when the status publisher could not be started;
    /// the scheduler then only sends heartbeats.
    pub fn new(
        transport: Box<dyn DownlinkTransport>,
        dispatcher: DownlinkDispatcher,
        telemetry: Option<Box<dyn TelemetrySource>>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            telemetry,
            parser: TelemetryLineParser::new(),
            context: BridgeContext::new(),
            forwarding: config.forwarding,
            retry: config.retry,
            period: config.loop_interval(),
            iterations: 0,
        }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    /// Whether the status publisher is alive.
    pub fn publisher_running(&self) -> bool {
        self.telemetry.as_ref().is_some_and(|source| source.is_running())
    }

    /// Run iterations at the configured period until `cancel` fires.
    ///
    /// A slow iteration delays the next one; ticks are never bunched up.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(period = ?self.period, "Control loop started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // An iteration may block on the fallback; shutdown waits for it.
            let summary = self.tick().await;
            if summary.failures > 0 || summary.dropped > 0 {
                debug!(?summary, "Iteration finished with failures");
            } else {
                trace!(?summary, "Iteration finished");
            }
        }

        info!("Control loop stopped after {} iterations", self.iterations);
    }

    /// One loop iteration.
    pub async fn tick(&mut self) -> TickSummary {
        self.iterations += 1;
        let mut summary = TickSummary::default();
        let mut queue = VecDeque::new();

        if let Some(bytes) = self.telemetry.as_mut().and_then(|source| source.poll_bytes()) {
            self.parser.feed(&bytes);
        }

        for record in self.parser.drain() {
            summary.records += 1;
            if let Some(command) = self.handle_record(record) {
                queue.push_back(PendingUplink { command, depth: 0 });
            }
        }

        let rejected = self.parser.take_rejected();
        if rejected > 0 && self.forwarding.parse_failures {
            queue.push_back(PendingUplink {
                command: Command::error(error_source::STATUS_PUBLISHER, error_code::TELEMETRY_PARSE),
                depth: 0,
            });
        }

        if !self.publisher_running() {
            debug!("Status publisher not running, sending heartbeat");
            queue.push_back(PendingUplink { command: Command::Heartbeat, depth: 0 });
        }

        self.flush(queue, &mut summary).await;
        summary
    }

    fn handle_record(&mut self, record: TelemetryRecord) -> Option<Command> {
        match record {
            TelemetryRecord::Status(reading) => Some(self.apply_status(&reading)),
            TelemetryRecord::Error(text) => {
                warn!("Status publisher error: {}", text);
                self.forwarding
                    .publisher_errors
                    .then(|| Command::error(error_source::STATUS_PUBLISHER, error_code::PUBLISHER_MESSAGE))
            }
            TelemetryRecord::Info(text) => {
                info!("Status publisher: {}", text);
                self.forwarding
                    .publisher_info
                    .then(|| Command::error(error_source::STATUS_PUBLISHER, error_code::PUBLISHER_MESSAGE))
            }
        }
    }

    /// Fold a reading into the actuator state and build the report for it.
    fn apply_status(&mut self, reading: &StatusReading) -> Command {
        let state = self.context.actuators.get_mut(reading.mfc);
        state.current_flow = reading.flow;
        if let Some(setpoint) = reading.setpoint {
            state.current_setpoint = setpoint;
        }
        if let Some(tag) = reading.device_tag {
            state.device_tag = tag;
        }
        if let Some(code) = reading.gas_code {
            state.last_gas_code = Some(code);
        }

        debug!(
            mfc = %reading.mfc,
            flow = reading.flow,
            setpoint = state.current_setpoint,
            tag = %state.device_tag,
            gas = reading.gas_label(),
            "Status update"
        );

        self.status_report(reading.mfc)
    }

    fn status_report(&self, mfc: MfcId) -> Command {
        let state = self.context.actuators.get(mfc);
        Command::StatusReport {
            mfc,
            setpoint: state.current_setpoint,
            flow: state.current_flow,
            device_tag: state.device_tag,
        }
    }

    async fn flush(&mut self, mut queue: VecDeque<PendingUplink>, summary: &mut TickSummary) {
        while let Some(pending) = queue.pop_front() {
            if summary.exchanges >= self.retry.max_exchanges_per_cycle {
                summary.dropped = queue.len() + 1;
                warn!("Exchange budget exhausted, dropping {} queued uplinks", summary.dropped);
                break;
            }

            if pending.depth > 0 {
                tokio::time::sleep(self.retry.backoff(pending.depth - 1)).await;
            }

            let frame = codec::encode(&pending.command);
            summary.exchanges += 1;
            let outcome = self.transport.exchange(&frame).await;

            match outcome {
                ExchangeOutcome::Downlink(downlink) => {
                    summary.downlinks += 1;
                    info!(uplink = %frame, downlink = %downlink, "Exchange returned downlink");
                    let follow_ups = self.dispatcher.dispatch(&mut self.context, downlink.as_bytes()).await;
                    // Follow-ups go out before anything queued earlier.
                    for command in follow_ups.into_iter().rev() {
                        queue.push_front(PendingUplink { command, depth: 0 });
                    }
                }
                ExchangeOutcome::Delivered => {
                    debug!(uplink = %frame, "Uplink delivered");
                }
                ref failure => {
                    summary.failures += 1;
                    if let Some(err) = failure.error() {
                        warn!(uplink = %frame, depth = pending.depth, "{}", err);
                    }

                    let Some(diagnostic) = failure.diagnostic() else { continue };
                    if pending.depth < self.retry.max_diagnostic_frames {
                        queue.push_front(PendingUplink { command: diagnostic, depth: pending.depth + 1 });
                    } else {
                        warn!("Giving up on diagnostics after {} consecutive failures", pending.depth + 1);
                    }
                }
            }
        }
    }
}
