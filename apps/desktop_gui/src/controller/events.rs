//! Bridge-to-UI events and error modeling for the desktop window.

use client_core::BackendOutcome;

pub enum UiEvent {
    Info(String),
    Outcome(BackendOutcome),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    LocalIo,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    FilePicker,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("failed to read")
            || message_lower.contains("not a regular file")
            || message_lower.contains("no such file")
            || message_lower.contains("permission denied")
        {
            UiErrorCategory::LocalIo
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// The worker never came up, so every backend action will fail.
    pub fn is_startup_failure(&self) -> bool {
        self.context == UiErrorContext::BackendStartup
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_invalid_server_url_as_validation_at_startup() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: invalid input: invalid server url 'x'",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
        assert!(err.is_startup_failure());
    }

    #[test]
    fn classifies_unreadable_picks_as_local_io() {
        let err = UiError::from_message(
            UiErrorContext::FilePicker,
            "failed to read '/tmp/a.xlsx': No such file or directory",
        );
        assert_eq!(err.category(), UiErrorCategory::LocalIo);
        assert_eq!(err.context(), UiErrorContext::FilePicker);
        assert!(!err.is_startup_failure());
    }

    #[test]
    fn classifies_runtime_build_failure() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: failed to build runtime: resource unavailable",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert_eq!(
            UiError::from_message(UiErrorContext::General, "something odd").category(),
            UiErrorCategory::Unknown
        );
    }
}
