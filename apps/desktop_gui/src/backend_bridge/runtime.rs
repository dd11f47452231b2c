//! Runtime bridge between the UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{execute, BackendCommand, HttpGateway};
use crossbeam_channel::{Receiver, Sender};

use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Starts the worker thread. Each command runs as its own task so requests of
/// different kinds overlap; the controller decides which outcomes still count.
pub fn launch(
    server_url: String,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let gateway = match HttpGateway::new(&server_url) {
            Ok(gateway) => Arc::new(gateway),
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: {err}"),
                )));
                tracing::error!(server_url = %server_url, "failed to create gateway: {err}");
                return;
            }
        };
        let _ = ui_tx.try_send(UiEvent::Info(format!("Backend worker ready ({server_url})")));
        tracing::info!(server_url = %server_url, "backend worker ready");

        while let Ok(command) = cmd_rx.recv() {
            let gateway = Arc::clone(&gateway);
            let ui_tx = ui_tx.clone();
            runtime.spawn(async move {
                let outcome = execute(gateway.as_ref(), command).await;
                if ui_tx.send(UiEvent::Outcome(outcome)).is_err() {
                    tracing::warn!("ui event channel closed; dropping backend outcome");
                }
            });
        }
        tracing::info!("command channel closed; backend worker exiting");
    })
}
