//! Backend commands issued by the controller and the outcomes they settle with.

use std::path::{Path, PathBuf};

use serde_json::Value;
use shared::domain::CleanupTarget;
use tracing::{info, warn};

use crate::{
    error::GatewayError,
    gateway::{CleanupReport, InspectRequest, MergeBackend, MergeReceipt, MergeRequest},
    inspection::InspectReport,
    sequencer::RequestTicket,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Inspect {
        ticket: RequestTicket,
        request: InspectRequest,
    },
    Merge {
        ticket: RequestTicket,
        request: MergeRequest,
    },
    LoadMapping {
        ticket: RequestTicket,
    },
    SaveMapping {
        ticket: RequestTicket,
        mappings: Value,
    },
    Cleanup {
        ticket: RequestTicket,
        target: CleanupTarget,
    },
    Download {
        ticket: RequestTicket,
        url: String,
        destination: PathBuf,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        self.ticket().kind.label()
    }

    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::Inspect { ticket, .. }
            | Self::Merge { ticket, .. }
            | Self::LoadMapping { ticket }
            | Self::SaveMapping { ticket, .. }
            | Self::Cleanup { ticket, .. }
            | Self::Download { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    Inspected {
        ticket: RequestTicket,
        result: Result<InspectReport, GatewayError>,
    },
    Merged {
        ticket: RequestTicket,
        result: Result<MergeReceipt, GatewayError>,
    },
    MappingLoaded {
        ticket: RequestTicket,
        result: Result<Value, GatewayError>,
    },
    MappingSaved {
        ticket: RequestTicket,
        result: Result<(), GatewayError>,
    },
    CleanedUp {
        ticket: RequestTicket,
        target: CleanupTarget,
        result: Result<CleanupReport, GatewayError>,
    },
    Downloaded {
        ticket: RequestTicket,
        destination: PathBuf,
        result: Result<u64, GatewayError>,
    },
}

impl BackendOutcome {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::Inspected { ticket, .. }
            | Self::Merged { ticket, .. }
            | Self::MappingLoaded { ticket, .. }
            | Self::MappingSaved { ticket, .. }
            | Self::CleanedUp { ticket, .. }
            | Self::Downloaded { ticket, .. } => *ticket,
        }
    }

    /// Settles `command` with `error` without it reaching the backend, e.g.
    /// when the command queue is full or the worker is gone.
    pub fn failed(command: BackendCommand, error: GatewayError) -> Self {
        match command {
            BackendCommand::Inspect { ticket, .. } => Self::Inspected {
                ticket,
                result: Err(error),
            },
            BackendCommand::Merge { ticket, .. } => Self::Merged {
                ticket,
                result: Err(error),
            },
            BackendCommand::LoadMapping { ticket } => Self::MappingLoaded {
                ticket,
                result: Err(error),
            },
            BackendCommand::SaveMapping { ticket, .. } => Self::MappingSaved {
                ticket,
                result: Err(error),
            },
            BackendCommand::Cleanup { ticket, target } => Self::CleanedUp {
                ticket,
                target,
                result: Err(error),
            },
            BackendCommand::Download {
                ticket,
                destination,
                ..
            } => Self::Downloaded {
                ticket,
                destination,
                result: Err(error),
            },
        }
    }

    pub fn error(&self) -> Option<&GatewayError> {
        match self {
            Self::Inspected { result, .. } => result.as_ref().err(),
            Self::Merged { result, .. } => result.as_ref().err(),
            Self::MappingLoaded { result, .. } => result.as_ref().err(),
            Self::MappingSaved { result, .. } => result.as_ref().err(),
            Self::CleanedUp { result, .. } => result.as_ref().err(),
            Self::Downloaded { result, .. } => result.as_ref().err(),
        }
    }
}

/// Runs one command against `backend`. Never fails: every error is folded
/// into the returned outcome.
pub async fn execute(backend: &dyn MergeBackend, command: BackendCommand) -> BackendOutcome {
    let name = command.name();
    let seq = command.ticket().seq.0;
    info!(command = name, seq, "executing backend command");

    let outcome = match command {
        BackendCommand::Inspect { ticket, request } => BackendOutcome::Inspected {
            ticket,
            result: backend.inspect(request).await,
        },
        BackendCommand::Merge { ticket, request } => BackendOutcome::Merged {
            ticket,
            result: backend.merge(request).await,
        },
        BackendCommand::LoadMapping { ticket } => BackendOutcome::MappingLoaded {
            ticket,
            result: backend.load_mapping().await,
        },
        BackendCommand::SaveMapping { ticket, mappings } => BackendOutcome::MappingSaved {
            ticket,
            result: backend.save_mapping(mappings).await,
        },
        BackendCommand::Cleanup { ticket, target } => BackendOutcome::CleanedUp {
            ticket,
            target,
            result: backend.cleanup(target).await,
        },
        BackendCommand::Download {
            ticket,
            url,
            destination,
        } => {
            let result = download_to(backend, &url, &destination).await;
            BackendOutcome::Downloaded {
                ticket,
                destination,
                result,
            }
        }
    };

    match outcome.error() {
        Some(err) => warn!(command = name, seq, kind = ?err.kind(), "backend command failed: {err}"),
        None => info!(command = name, seq, "backend command settled"),
    }
    outcome
}

async fn download_to(
    backend: &dyn MergeBackend,
    url: &str,
    destination: &Path,
) -> Result<u64, GatewayError> {
    let bytes = backend.download(url).await?;
    tokio::fs::write(destination, &bytes).await.map_err(|err| {
        GatewayError::LocalIo(format!(
            "failed to write '{}': {err}",
            destination.display()
        ))
    })?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
