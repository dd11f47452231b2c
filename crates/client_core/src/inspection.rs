use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use shared::protocol::{ColumnInfo, PreviewEntry};

/// Payload of one successful inspect call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectReport {
    pub columns: Vec<ColumnInfo>,
    pub previews: Vec<PreviewEntry>,
    pub mapping: BTreeMap<String, Value>,
}

/// Columns and previews from the most recent applied inspect.
#[derive(Debug, Default)]
pub struct InspectionCache {
    report: Option<InspectReport>,
}

impl InspectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, columns: Vec<ColumnInfo>, previews: Vec<PreviewEntry>) {
        self.replace_report(InspectReport {
            columns,
            previews,
            mapping: BTreeMap::new(),
        });
    }

    pub fn replace_report(&mut self, report: InspectReport) {
        self.report = Some(report);
    }

    pub fn clear(&mut self) {
        self.report = None;
    }

    /// True once an inspect result has been stored.
    pub fn is_populated(&self) -> bool {
        self.report.is_some()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        self.report
            .as_ref()
            .map(|report| report.columns.as_slice())
            .unwrap_or_default()
    }

    pub fn previews(&self) -> &[PreviewEntry] {
        self.report
            .as_ref()
            .map(|report| report.previews.as_slice())
            .unwrap_or_default()
    }

    pub fn mapping_report(&self) -> Option<&BTreeMap<String, Value>> {
        self.report.as_ref().map(|report| &report.mapping)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns().iter().find(|column| column.name == name)
    }

    /// Previews to show for the current file selection. An empty selection
    /// means nothing was explicitly checked, so everything is shown.
    pub fn filter_by_selected_names(&self, names: &HashSet<String>) -> Vec<&PreviewEntry> {
        self.previews()
            .iter()
            .filter(|preview| names.is_empty() || names.contains(&preview.file))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/inspection_tests.rs"]
mod tests;
