//! Command orchestration from controller commands to the backend queue.

use client_core::{BackendCommand, BackendOutcome, GatewayError};
use crossbeam_channel::{Sender, TrySendError};

/// Queues `cmd` for the backend worker. When it cannot be queued the command
/// is settled right away with a transport failure, so its trigger does not
/// stay disabled.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
) -> Option<BackendOutcome> {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            None
        }
        Err(TrySendError::Full(cmd)) => {
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
            Some(BackendOutcome::failed(
                cmd,
                GatewayError::Transport("UI command queue is full; please retry".to_string()),
            ))
        }
        Err(TrySendError::Disconnected(cmd)) => {
            tracing::error!(command = cmd_name, "backend command processor disconnected");
            Some(BackendOutcome::failed(
                cmd,
                GatewayError::Transport(
                    "backend command processor disconnected (possible startup failure)"
                        .to_string(),
                ),
            ))
        }
    }
}
