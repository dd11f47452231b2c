use shared::error::FailureKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no files selected")]
    EmptySelection,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server answered HTTP {status}{}", detail_suffix(.detail))]
    Http { status: u16, detail: Option<String> },
    #[error("server rejected the request: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("local file error: {0}")]
    LocalIo(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(" ({detail})"))
        .unwrap_or_default()
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptySelection => FailureKind::EmptySelection,
            Self::Transport(_) => FailureKind::Transport,
            Self::Http { .. } => FailureKind::Http,
            Self::Rejected(_) => FailureKind::Application,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::InvalidInput(_) => FailureKind::MalformedInput,
            Self::LocalIo(_) => FailureKind::LocalIo,
        }
    }

    /// Message text supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => message.as_deref(),
            Self::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// One-line status text for a failed `operation` ("Inspect", "Merge", ...).
    pub fn status_text(&self, operation: &str) -> String {
        match self {
            Self::EmptySelection => "Please select files first.".to_string(),
            Self::Transport(_) => format!("{operation} request failed, please retry later."),
            Self::Http {
                status,
                detail: Some(detail),
            } => format!("{operation} failed (HTTP {status}): {detail}"),
            Self::Http { status, .. } => format!("{operation} failed (HTTP {status})"),
            Self::Rejected(Some(message)) => message.clone(),
            Self::Rejected(None) => format!("{operation} failed"),
            Self::MalformedResponse(_) => {
                format!("{operation} failed: unexpected response from server")
            }
            Self::InvalidInput(reason) | Self::LocalIo(reason) => {
                format!("{operation} failed: {reason}")
            }
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::MalformedResponse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}
