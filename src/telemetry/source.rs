//! Sources of raw telemetry bytes

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::PublisherConfig;
use crate::{BridgeError, Result};

/// Size of a single read from the publisher's stdout
const READ_CHUNK: usize = 512;

/// Non-blocking source of telemetry bytes.
///
/// The control loop polls once per cycle and must never wait on the source,
/// so implementations hand back whatever has already arrived.
pub trait TelemetrySource: Send {
    /// Take all bytes that arrived since the last poll.
    ///
    /// Returns `None` when nothing is available right now.
    fn poll_bytes(&mut self) -> Option<Vec<u8>>;

    /// Whether the producer is still alive.
    fn is_running(&self) -> bool;
}

/// The long-running status publisher subprocess.
///
/// A small task pumps the child's stdout into a channel; [`poll_bytes`]
/// drains that channel with `try_recv`, which never blocks.
///
/// [`poll_bytes`]: TelemetrySource::poll_bytes
pub struct PublisherProcess {
    child: Child,
    chunks: UnboundedReceiver<Vec<u8>>,
    running: bool,
    cancel: CancellationToken,
}

impl PublisherProcess {
    /// Start the publisher described by the configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &PublisherConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| BridgeError::initialization_failed("publisher command is empty"))?;

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            BridgeError::initialization_failed_with_source(
                format!("failed to start status publisher '{}'", program),
                Box::new(e),
            )
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::initialization_failed("publisher stdout was not captured"))?;

        let (tx, chunks) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(pump_stdout(stdout, tx, cancel.clone()));

        info!(pid = child.id(), program = %program, "Started status publisher");

        Ok(Self { child, chunks, running: true, cancel })
    }

    fn mark_stopped(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        match self.child.try_wait() {
            Ok(Some(status)) => warn!(%status, "Status publisher exited"),
            Ok(None) => warn!("Status publisher closed its output but is still running"),
            Err(e) => warn!("Failed to query status publisher: {}", e),
        }
    }
}

impl TelemetrySource for PublisherProcess {
    fn poll_bytes(&mut self) -> Option<Vec<u8>> {
        let mut bytes = Vec::new();

        loop {
            match self.chunks.try_recv() {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.mark_stopped();
                    break;
                }
            }
        }

        if bytes.is_empty() {
            None
        } else {
            trace!("Read {} bytes from status publisher", bytes.len());
            Some(bytes)
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for PublisherProcess {
    fn drop(&mut self) {
        debug!("Stopping status publisher");
        self.cancel.cancel();
    }
}

async fn pump_stdout(
    mut stdout: ChildStdout,
    tx: UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = stdout.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("Status publisher output reached end of stream");
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read status publisher output: {}", e);
                break;
            }
        }
    }
}
