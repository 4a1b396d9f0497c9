//! Primary request/response channel to the control service

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::{ActuatorCommand, ActuatorStrategy, ServiceResponse};
use crate::config::ActuatorConfig;
use crate::{BridgeError, Result};

/// Upper bound on a service response; anything longer is truncated and
/// almost certainly fails to parse.
pub const MAX_RESPONSE_LEN: usize = 256;

/// One TCP connection per command: connect, write a JSON line, read one reply.
#[derive(Debug, Clone)]
pub struct SocketChannel {
    endpoint: String,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl SocketChannel {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration, response_timeout: Duration) -> Self {
        Self { endpoint: endpoint.into(), connect_timeout, response_timeout }
    }

    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self::new(config.endpoint.clone(), config.connect_timeout(), config.response_timeout())
    }

    async fn exchange(&self, operation: &'static str, line: &[u8]) -> Result<Vec<u8>> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| BridgeError::actuator_failed(operation, format!("connect to {} timed out", self.endpoint)))?
            .map_err(|e| {
                BridgeError::actuator_failed_with_source(
                    operation,
                    format!("could not connect to {}", self.endpoint),
                    Box::new(e),
                )
            })?;

        stream
            .write_all(line)
            .await
            .map_err(|e| BridgeError::actuator_failed_with_source(operation, "write failed", Box::new(e)))?;
        // The service reads until end of stream before answering.
        stream
            .shutdown()
            .await
            .map_err(|e| BridgeError::actuator_failed_with_source(operation, "write shutdown failed", Box::new(e)))?;

        let mut buf = [0u8; MAX_RESPONSE_LEN];
        let read = timeout(self.response_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| BridgeError::actuator_failed(operation, "no response before timeout"))?
            .map_err(|e| BridgeError::actuator_failed_with_source(operation, "read failed", Box::new(e)))?;

        if read == 0 {
            return Err(BridgeError::actuator_failed(operation, "connection closed without a response"));
        }

        Ok(buf[..read].to_vec())
    }
}

#[async_trait::async_trait]
impl ActuatorStrategy for SocketChannel {
    async fn execute(&mut self, command: &ActuatorCommand) -> Result<String> {
        let operation = command.operation();

        let mut line = serde_json::to_vec(&command.request()).map_err(|e| {
            BridgeError::actuator_failed_with_source(operation, "could not encode request", Box::new(e))
        })?;
        line.push(b'\n');
        trace!(endpoint = %self.endpoint, "Sending {}", String::from_utf8_lossy(&line).trim_end());

        let raw = self.exchange(operation, &line).await?;
        let text = String::from_utf8_lossy(&raw);
        debug!(operation, "Service replied: {}", text.trim_end());

        let response: ServiceResponse = serde_json::from_str(text.trim()).map_err(|e| {
            BridgeError::actuator_failed_with_source(
                operation,
                format!("invalid response '{}'", text.trim()),
                Box::new(e),
            )
        })?;

        if response.success {
            Ok(response.message)
        } else {
            Err(BridgeError::actuator_failed(operation, format!("service reported failure: {}", response.message)))
        }
    }

    fn name(&self) -> &'static str {
        "socket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MfcId;
    use tokio::net::TcpListener;

    async fn serve_once(reply: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            conn.read_to_end(&mut request).await.unwrap();
            conn.write_all(reply).await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (addr, handle)
    }

    fn channel(addr: String) -> SocketChannel {
        SocketChannel::new(addr, Duration::from_millis(500), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn successful_reply_returns_message() {
        let (addr, server) = serve_once(b"{\"success\": true, \"message\": \"OK\"}\n").await;
        let mut socket = channel(addr);

        let command = ActuatorCommand::Setpoint { mfc: MfcId::FIRST, value: 10.0, extra_arg: 0 };
        let message = socket.execute(&command).await.unwrap();
        assert_eq!(message, "OK");

        let request = server.await.unwrap();
        assert!(request.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(request.trim()).unwrap();
        assert_eq!(json["action"], "setpoint");
        assert_eq!(json["mfc_id"], 0);
    }

    #[tokio::test]
    async fn failure_flag_is_an_error() {
        let (addr, _server) = serve_once(b"{\"success\": false, \"message\": \"Failed\"}\n").await;
        let err = channel(addr).execute(&ActuatorCommand::Refresh).await.unwrap_err();
        assert!(matches!(err, BridgeError::ActuatorService { .. }));
        assert!(err.to_string().contains("Failed"));
    }

    #[tokio::test]
    async fn garbage_reply_is_an_error() {
        let (addr, _server) = serve_once(b"not json").await;
        let err = channel(addr).execute(&ActuatorCommand::Refresh).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = channel(addr).execute(&ActuatorCommand::Refresh).await.unwrap_err();
        assert!(matches!(err, BridgeError::ActuatorService { .. }));
    }
}
