//! Test doubles for the bridge's seams
//!
//! Scripted implementations of [`DownlinkTransport`], [`ActuatorStrategy`] and
//! [`TelemetrySource`] that record what the bridge did with them. Each double
//! hands out a shared log handle before being boxed, so tests can inspect calls
//! after the double has moved into the component under test.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::actuator::{ActuatorCommand, ActuatorStrategy};
use crate::telemetry::TelemetrySource;
use crate::transport::{DownlinkTransport, ExchangeOutcome};
use crate::{BridgeError, Frame, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared, cloneable record of calls.
#[derive(Debug)]
pub struct CallLog<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> CallLog<T> {
    pub fn push(&self, item: T) {
        lock(&self.0).push(item);
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.0))
    }

    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.0).is_empty()
    }
}

/// Actuator strategy that records commands and answers from a script.
///
/// Scripted outcomes are consumed in order; once exhausted every call gets the
/// default outcome.
pub struct RecordingStrategy {
    name: &'static str,
    outcomes: VecDeque<bool>,
    default_ok: bool,
    calls: CallLog<ActuatorCommand>,
}

impl RecordingStrategy {
    pub fn succeeding(name: &'static str) -> Self {
        Self { name, outcomes: VecDeque::new(), default_ok: true, calls: CallLog::default() }
    }

    pub fn failing(name: &'static str) -> Self {
        Self { default_ok: false, ..Self::succeeding(name) }
    }

    /// Follow `outcomes` first, then succeed.
    pub fn scripted(name: &'static str, outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self { outcomes: outcomes.into_iter().collect(), ..Self::succeeding(name) }
    }

    pub fn calls(&self) -> CallLog<ActuatorCommand> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl ActuatorStrategy for RecordingStrategy {
    async fn execute(&mut self, command: &ActuatorCommand) -> Result<String> {
        self.calls.push(*command);
        if self.outcomes.pop_front().unwrap_or(self.default_ok) {
            Ok("OK".to_string())
        } else {
            Err(BridgeError::actuator_failed(command.operation(), format!("{} scripted failure", self.name)))
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Transport that records uplinks and replays scripted outcomes.
///
/// Once the script runs out every exchange is [`ExchangeOutcome::Delivered`].
pub struct ScriptedTransport {
    outcomes: VecDeque<ExchangeOutcome>,
    sent: CallLog<Frame>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self { outcomes: VecDeque::new(), sent: CallLog::default() }
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = ExchangeOutcome>) -> Self {
        Self { outcomes: outcomes.into_iter().collect(), sent: CallLog::default() }
    }

    /// Downlink returned for the next exchange.
    pub fn then_downlink(mut self, bytes: &[u8]) -> Self {
        self.outcomes.push_back(ExchangeOutcome::Downlink(Frame::from(bytes)));
        self
    }

    pub fn sent(&self) -> CallLog<Frame> {
        self.sent.clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DownlinkTransport for ScriptedTransport {
    async fn exchange(&mut self, uplink: &Frame) -> ExchangeOutcome {
        self.sent.push(uplink.clone());
        self.outcomes.pop_front().unwrap_or(ExchangeOutcome::Delivered)
    }
}

#[derive(Debug)]
struct TelemetryScript {
    chunks: VecDeque<Vec<u8>>,
    running: bool,
}

/// Telemetry source fed by the test.
///
/// Clones share the same queue, so a test keeps one clone to push output
/// while the bridge polls the other.
#[derive(Debug, Clone)]
pub struct ScriptedTelemetry(Arc<Mutex<TelemetryScript>>);

impl ScriptedTelemetry {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(TelemetryScript { chunks: VecDeque::new(), running: true })))
    }

    /// Queue bytes for the next poll.
    pub fn push(&self, bytes: impl AsRef<[u8]>) {
        lock(&self.0).chunks.push_back(bytes.as_ref().to_vec());
    }

    pub fn set_running(&self, running: bool) {
        lock(&self.0).running = running;
    }
}

impl Default for ScriptedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn poll_bytes(&mut self) -> Option<Vec<u8>> {
        let mut script = lock(&self.0);
        if script.chunks.is_empty() {
            return None;
        }
        Some(script.chunks.drain(..).flatten().collect())
    }

    fn is_running(&self) -> bool {
        lock(&self.0).running
    }
}
