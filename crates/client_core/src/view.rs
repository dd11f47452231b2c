//! Pure projection of [`AppState`] into what a front end draws.

use shared::domain::{CleanupTarget, FileId, OutputFormat, RequestKind};

use crate::controller::{
    AppState, DownloadLink, InspectPhase, MergeFormOptions, StatusLine,
};

pub const NO_FILES_TEXT: &str = "No files selected yet.";
pub const COLUMNS_PLACEHOLDER: &str = "Click Inspect to load column information.";
pub const COLUMNS_LOADING: &str = "Loading columns...";
pub const COLUMNS_EMPTY: &str = "No column information returned.";
pub const PREVIEW_PLACEHOLDER: &str = "Preview: click Inspect to show the first rows of each sheet.";
pub const PREVIEW_LOADING: &str = "Loading preview...";
pub const PREVIEW_FAILED: &str = "Preview failed";
pub const PREVIEW_EMPTY: &str = "No preview data returned.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: FileId,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileListView {
    Empty(&'static str),
    Rows(Vec<FileRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub name: String,
    /// Comma-joined `file-sheet` sources the column was seen in.
    pub sources: String,
    /// Meta columns are always kept in the merged output.
    pub kept: bool,
    pub checked: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChecklistView {
    Placeholder(&'static str),
    Rows(Vec<ColumnRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewBlock {
    pub title: String,
    pub header: String,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewPanelView {
    Placeholder(&'static str),
    Blocks(Vec<PreviewBlock>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPanelView {
    pub visible: bool,
    pub loading: bool,
    pub text: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStates {
    pub inspect: bool,
    pub merge: bool,
    pub save_mapping: bool,
    pub cleanup_logs: bool,
    pub cleanup_temp: bool,
    pub save_result: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub files: FileListView,
    pub columns: ColumnChecklistView,
    pub preview: PreviewPanelView,
    pub options: MergeFormOptions,
    pub output_formats: Vec<OutputFormat>,
    pub status: Option<StatusLine>,
    pub download: Option<DownloadLink>,
    pub mapping: MappingPanelView,
    pub controls: ControlStates,
    pub log: Vec<String>,
}

/// Kilobytes with one decimal, ties rounded up.
pub fn format_size_kb(bytes: u64) -> String {
    let tenths = (u128::from(bytes) * 10 + 512) / 1024;
    format!("{}.{} KB", tenths / 10, tenths % 10)
}

pub fn render(state: &AppState) -> ViewModel {
    ViewModel {
        files: render_files(state),
        columns: render_columns(state),
        preview: render_preview(state),
        options: state.options.clone(),
        output_formats: state.output_formats.clone(),
        status: state.status.clone(),
        download: state.download.clone(),
        mapping: MappingPanelView {
            visible: state.mapping.visible,
            loading: state.is_in_flight(RequestKind::LoadMapping),
            text: state.mapping.text.clone(),
            status: state.mapping.status.clone(),
        },
        controls: ControlStates {
            inspect: !state.is_in_flight(RequestKind::Inspect),
            merge: !state.is_in_flight(RequestKind::Merge),
            save_mapping: !state.is_in_flight(RequestKind::SaveMapping),
            cleanup_logs: !state.is_in_flight(RequestKind::Cleanup(CleanupTarget::Logs)),
            cleanup_temp: !state.is_in_flight(RequestKind::Cleanup(CleanupTarget::Temp)),
            save_result: state.download.is_some()
                && !state.is_in_flight(RequestKind::Download),
        },
        log: state.log.rendered(),
    }
}

fn render_files(state: &AppState) -> FileListView {
    if state.registry.is_empty() {
        return FileListView::Empty(NO_FILES_TEXT);
    }
    FileListView::Rows(
        state
            .registry
            .files()
            .iter()
            .map(|file| FileRow {
                id: file.id,
                label: format!("{} — {}", file.name, format_size_kb(file.size)),
                checked: state.is_file_checked(file.id),
            })
            .collect(),
    )
}

fn render_columns(state: &AppState) -> ColumnChecklistView {
    if state.inspect_phase == InspectPhase::Loading {
        return ColumnChecklistView::Placeholder(COLUMNS_LOADING);
    }
    if !state.cache.is_populated() {
        return ColumnChecklistView::Placeholder(COLUMNS_PLACEHOLDER);
    }
    let columns = state.cache.columns();
    if columns.is_empty() {
        return ColumnChecklistView::Placeholder(COLUMNS_EMPTY);
    }
    ColumnChecklistView::Rows(
        columns
            .iter()
            .map(|column| ColumnRow {
                name: column.name.clone(),
                sources: column.sources.join(", "),
                kept: column.is_meta,
                checked: column.is_meta || state.excluded_columns.contains(&column.name),
                enabled: !column.is_meta,
            })
            .collect(),
    )
}

fn render_preview(state: &AppState) -> PreviewPanelView {
    match state.inspect_phase {
        InspectPhase::Loading => return PreviewPanelView::Placeholder(PREVIEW_LOADING),
        InspectPhase::Failed => return PreviewPanelView::Placeholder(PREVIEW_FAILED),
        InspectPhase::Idle => {}
    }
    if state.registry.is_empty() || !state.cache.is_populated() {
        return PreviewPanelView::Placeholder(PREVIEW_PLACEHOLDER);
    }

    let entries = state
        .cache
        .filter_by_selected_names(&state.selected_names());
    if entries.is_empty() {
        return PreviewPanelView::Placeholder(PREVIEW_EMPTY);
    }
    PreviewPanelView::Blocks(
        entries
            .into_iter()
            .map(|entry| PreviewBlock {
                title: format!("{} / {}", entry.file, entry.sheet),
                header: entry.columns.join(" | "),
                rows: entry
                    .rows
                    .iter()
                    .map(|row| entry.row_cells(row).join(" | "))
                    .collect(),
            })
            .collect(),
    )
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
