use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);
    };
}

id_newtype!(FileId);
id_newtype!(RequestSeq);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupTarget {
    Logs,
    Temp,
}

impl CleanupTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Temp => "temp",
        }
    }

    /// Human label used in status and log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Temp => "temp directory",
        }
    }
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanupTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("logs") {
            Ok(Self::Logs)
        } else if value.eq_ignore_ascii_case("temp") {
            Ok(Self::Temp)
        } else {
            Err(format!("unknown cleanup target '{value}' (expected logs or temp)"))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Xlsx, OutputFormat::Csv];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn default_file_name(self) -> String {
        format!("merged.{}", self.as_str())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("xlsx") {
            Ok(Self::Xlsx)
        } else if value.eq_ignore_ascii_case("csv") {
            Ok(Self::Csv)
        } else {
            Err(format!("unknown output format '{value}' (expected xlsx or csv)"))
        }
    }
}

/// Operation kinds that are tracked independently for sequencing and
/// trigger enablement. Each cleanup target counts as its own trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Inspect,
    Merge,
    LoadMapping,
    SaveMapping,
    Cleanup(CleanupTarget),
    Download,
}

impl RequestKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Inspect => "inspect",
            Self::Merge => "merge",
            Self::LoadMapping => "load_mapping",
            Self::SaveMapping => "save_mapping",
            Self::Cleanup(CleanupTarget::Logs) => "cleanup_logs",
            Self::Cleanup(CleanupTarget::Temp) => "cleanup_temp",
            Self::Download => "download",
        }
    }
}
