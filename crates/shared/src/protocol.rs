//! Wire shapes of the merge service endpoints.
//!
//! Every response is an envelope carrying `ok` and an optional `error`; the
//! remaining fields are optional on the wire and only required once `ok` is
//! true. Callers check the envelope first and then validate the payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INSPECT_PATH: &str = "/inspect";
pub const MERGE_PATH: &str = "/merge";
pub const MAPPING_PATH: &str = "/mapping";
pub const CLEANUP_PATH: &str = "/cleanup";

/// Multipart field names accepted by `/inspect`, `/merge` and `/cleanup`.
pub mod fields {
    pub const FILES: &str = "files";
    pub const NORMALIZE_COLUMNS: &str = "normalize_columns";
    pub const ENABLE_FUZZY: &str = "enable_fuzzy";
    pub const REMOVE_DUPLICATES: &str = "remove_duplicates";
    pub const SMART_DEDUP: &str = "smart_dedup";
    pub const DEDUP_KEYS: &str = "dedup_keys";
    pub const EXCLUDE_COLUMNS: &str = "exclude_columns";
    pub const OUTPUT_FORMAT: &str = "output_format";
    pub const TARGET: &str = "target";

    /// Value sent for an enabled checkbox flag.
    pub const FLAG_ON: &str = "on";
}

pub trait Envelope {
    fn is_ok(&self) -> bool;
    fn error_message(&self) -> Option<&str>;
}

macro_rules! impl_envelope {
    ($($name:ident),+ $(,)?) => {
        $(
            impl Envelope for $name {
                fn is_ok(&self) -> bool {
                    self.ok
                }

                fn error_message(&self) -> Option<&str> {
                    self.error.as_deref().filter(|message| !message.trim().is_empty())
                }
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default)]
    pub is_meta: bool,
    #[serde(default)]
    pub sources: Vec<String>,
}

pub type PreviewRow = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub file: String,
    pub sheet: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<PreviewRow>,
}

impl PreviewEntry {
    /// Cells of `row` in column order. Falls back to the row's own key order
    /// when the entry carries no column list.
    pub fn row_cells(&self, row: &PreviewRow) -> Vec<String> {
        if self.columns.is_empty() {
            return row.values().map(display_value).collect();
        }
        self.columns
            .iter()
            .map(|column| row.get(column).map(display_value).unwrap_or_default())
            .collect()
    }
}

/// Renders a preview cell the way the page shows it: `null` is blank,
/// strings are unquoted.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub previews: Vec<PreviewEntry>,
    /// Column renames applied per `"<file>-<sheet>"` when normalisation ran.
    #[serde(default)]
    pub mapping: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMappingRequest {
    pub mappings: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl_envelope!(
    InspectResponse,
    MergeResponse,
    MappingResponse,
    AckResponse,
    CleanupResponse,
);

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
