use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Append-only activity panel. Every entry is mirrored to `tracing`.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(Local::now(), message);
    }

    pub fn push_at(&mut self, at: DateTime<Local>, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "activity", "{message}");
        self.entries.push(LogEntry { at, message });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last_message(&self) -> Option<&str> {
        self.entries.last().map(|entry| entry.message.as_str())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    pub fn rendered(&self) -> Vec<String> {
        self.entries.iter().map(LogEntry::render).collect()
    }
}
