use std::process::ExitCode;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use flowgate::{BridgeConfig, BridgeError, bridge, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            for suggestion in suggestions(&e) {
                info!("Hint: {}", suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

/// Recovery hints for the first bridge error in the chain.
fn suggestions(err: &anyhow::Error) -> Vec<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BridgeError>())
        .map(BridgeError::recovery_suggestions)
        .unwrap_or_default()
}

async fn run() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env().context("failed to load configuration")?;
    let mut scheduler = bridge::connect(&config).await.context("failed to start the bridge")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    scheduler.run(cancel).await;
    info!("Shutdown complete");
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
                    _ = terminate.recv() => info!("SIGTERM received, shutting down"),
                }
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("SIGINT received, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupt received, shutting down");
    }

    cancel.cancel();
}
