//! End-to-end control loop over real sockets and processes.
//!
//! A UDP task stands in for the radio daemon and a TCP listener for the
//! actuator service; the status publisher is a shell one-liner.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flowgate::config::{BridgeConfig, PublisherConfig};
use flowgate::{MfcId, bridge};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

type Log<T> = Arc<Mutex<Vec<T>>>;

const SETPOINT_DOWNLINK: [u8; 6] = [0x10, 0x00, 0x41, 0x20, 0x00, 0x00];

/// Radio daemon answering the first status report with a setpoint downlink.
async fn spawn_radio() -> (String, Log<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap().to_string();
    let uplinks: Log<Vec<u8>> = Arc::default();
    let log = uplinks.clone();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let mut downlink_sent = false;
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else { break };
            let uplink = buf[..n].to_vec();

            let mut reply = vec![0x00];
            if uplink[0] == 0x20 && !downlink_sent {
                downlink_sent = true;
                reply = [&[0x01][..], &SETPOINT_DOWNLINK].concat();
            }
            log.lock().unwrap().push(uplink);
            let _ = socket.send_to(&reply, peer).await;
        }
    });

    (addr, uplinks)
}

/// Actuator service accepting every request.
async fn spawn_actuator() -> (String, Log<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let requests: Log<serde_json::Value> = Arc::default();
    let log = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut conn, _)) = listener.accept().await {
            let mut request = Vec::new();
            conn.read_to_end(&mut request).await.unwrap();
            let json = serde_json::from_slice(request.trim_ascii()).unwrap();
            log.lock().unwrap().push(json);
            conn.write_all(b"{\"success\": true, \"message\": \"OK\"}\n").await.unwrap();
        }
    });

    (addr, requests)
}

fn config(radio: String, actuator: String, publisher: &str) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.transport.bind = "127.0.0.1:0".to_string();
    config.transport.radio = radio;
    config.transport.exchange_timeout_ms = 500;
    config.actuator.endpoint = actuator;
    config.actuator.fallback.setpoint_command =
        vec!["sh".to_string(), "-c".to_string(), "echo applied".to_string()];
    config.publisher =
        PublisherConfig { command: vec!["sh".to_string(), "-c".to_string(), publisher.to_string()], working_dir: None };
    config.retry.backoff_base_ms = 0;
    config
}

fn contains(log: &Log<Vec<u8>>, frame: &[u8]) -> bool {
    log.lock().unwrap().iter().any(|f| f == frame)
}

#[tokio::test]
async fn status_line_to_setpoint_acknowledgement() {
    let (radio, uplinks) = spawn_radio().await;
    let (actuator, requests) = spawn_actuator().await;
    let config = config(radio, actuator, "printf 'STATUS:BL:0:1.5000:10.0000:METHANE\\n'; sleep 5");

    let mut scheduler = bridge::connect(&config).await.unwrap();

    for _ in 0..100 {
        scheduler.tick().await;
        if contains(&uplinks, &[0x11, 0x00]) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let sent = uplinks.lock().unwrap().clone();
    assert_eq!(
        sent[0],
        vec![0x20, 0x00, 0x41, 0x20, 0x00, 0x00, 0x3F, 0xC0, 0x00, 0x00, b'B', b'L']
    );
    assert_eq!(sent[1], vec![0x11, 0x00]);

    let requests = requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["action"], "setpoint");
    assert_eq!(requests[0]["mfc_id"], 0);
    assert_eq!(requests[0]["setpoint"], 10.0);

    let state = scheduler.context().actuators.get(MfcId::FIRST);
    assert_eq!(state.current_setpoint, 10.0);
    assert_eq!(state.current_flow, 1.5);
    assert_eq!(state.last_gas_code, Some(0x02));
}

#[tokio::test]
async fn unreachable_service_falls_back_and_still_acknowledges() {
    let (radio, uplinks) = spawn_radio().await;
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let actuator = closed.local_addr().unwrap().to_string();
    drop(closed);
    let config = config(radio, actuator, "printf 'STATUS:0:1.0\\n'; sleep 5");

    let mut scheduler = bridge::connect(&config).await.unwrap();

    for _ in 0..100 {
        scheduler.tick().await;
        if contains(&uplinks, &[0x11, 0x00]) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(contains(&uplinks, &[0x11, 0x00]));
}

#[tokio::test]
async fn missing_publisher_means_heartbeats() {
    let (radio, uplinks) = spawn_radio().await;
    let (actuator, _) = spawn_actuator().await;
    let mut config = config(radio, actuator, "");
    config.publisher.command = vec!["/nonexistent/flowgate-publisher".to_string()];

    let mut scheduler = bridge::connect(&config).await.unwrap();
    assert!(!scheduler.publisher_running());

    scheduler.tick().await;

    assert_eq!(uplinks.lock().unwrap().clone(), vec![vec![0x30, 0x00]]);
}

#[tokio::test]
async fn bad_radio_address_fails_startup() {
    let mut config = BridgeConfig::default();
    config.transport.radio = "no-such-radio".to_string();

    let err = bridge::connect(&config).await.err().unwrap();
    assert!(err.is_fatal());
}
