//! Single-owner state for the merge client and the reducer that drives it.
//!
//! Front ends feed [`UiAction`]s into [`MergeController::dispatch`]. Actions
//! that need the backend come back as a [`BackendCommand`]; once that command
//! has run, its [`BackendOutcome`] goes through [`MergeController::apply`].
//! Outcomes of superseded requests are dropped there.

use std::{
    collections::{BTreeSet, HashSet},
    path::PathBuf,
};

use serde_json::Value;
use shared::domain::{CleanupTarget, FileId, OutputFormat, RequestKind};
use tracing::{debug, info, warn};

use crate::{
    activity_log::ActivityLog,
    command::{BackendCommand, BackendOutcome},
    error::GatewayError,
    gateway::{CleanupReport, InspectRequest, MergeOptions, MergeReceipt, MergeRequest},
    inspection::{InspectReport, InspectionCache},
    registry::{FileRegistry, PickedFile},
    sequencer::RequestSequencer,
    settings::ClientSettings,
    view::{self, ViewModel},
};

pub const SELECT_FILES_FIRST: &str = "Please select files first.";
pub const MAPPING_SAVE_FAILED: &str = "Mapping JSON parse or save failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFormOptions {
    pub normalize: bool,
    pub fuzzy: bool,
    pub remove_duplicates: bool,
    pub smart_dedup: bool,
    pub dedup_keys: String,
    pub output_format: OutputFormat,
}

impl MergeFormOptions {
    fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            normalize: settings.normalize_by_default,
            fuzzy: false,
            remove_duplicates: false,
            smart_dedup: false,
            dedup_keys: String::new(),
            output_format: settings.default_output_format,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InspectPhase {
    #[default]
    Idle,
    Loading,
    /// The last inspect failed. Cleared by the next selection change or inspect.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
    pub task_id: Option<String>,
    /// Suggested name for the saved result.
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingPanelState {
    pub visible: bool,
    pub loaded: bool,
    pub text: String,
    pub status: Option<String>,
}

#[derive(Debug)]
pub struct AppState {
    pub registry: FileRegistry,
    pub cache: InspectionCache,
    pub selected_files: HashSet<FileId>,
    /// Non-meta columns the user checked for removal.
    pub excluded_columns: BTreeSet<String>,
    pub options: MergeFormOptions,
    pub output_formats: Vec<OutputFormat>,
    pub inspect_phase: InspectPhase,
    pub status: Option<StatusLine>,
    pub download: Option<DownloadLink>,
    pub mapping: MappingPanelState,
    pub log: ActivityLog,
    pub requests: RequestSequencer,
    normalize_default: bool,
}

impl AppState {
    pub fn selected_names(&self) -> HashSet<String> {
        self.registry.names_for(&self.selected_files)
    }

    pub fn is_file_checked(&self, id: FileId) -> bool {
        self.selected_files.contains(&id)
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.requests.is_in_flight(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    FilesPicked(Vec<PickedFile>),
    ToggleFile(FileId),
    SelectAllFiles,
    UnselectAllFiles,
    InvertFileSelection,
    DeleteSelectedFiles,
    ClearFiles,
    Reset,
    ToggleColumn(String),
    SelectAllColumns,
    UnselectAllColumns,
    InvertColumnSelection,
    SetNormalize(bool),
    SetFuzzy(bool),
    SetRemoveDuplicates(bool),
    SetSmartDedup(bool),
    SetDedupKeys(String),
    SetOutputFormat(OutputFormat),
    Inspect,
    Merge,
    ToggleMappingPanel,
    EditMapping(String),
    SaveMapping,
    Cleanup(CleanupTarget),
    SaveResult(PathBuf),
}

pub struct MergeController {
    state: AppState,
}

impl MergeController {
    pub fn new(settings: &ClientSettings) -> Self {
        let mut state = AppState {
            registry: FileRegistry::new(),
            cache: InspectionCache::new(),
            selected_files: HashSet::new(),
            excluded_columns: BTreeSet::new(),
            options: MergeFormOptions::from_settings(settings),
            output_formats: settings.output_formats.clone(),
            inspect_phase: InspectPhase::Idle,
            status: None,
            download: None,
            mapping: MappingPanelState::default(),
            log: ActivityLog::new(),
            requests: RequestSequencer::new(),
            normalize_default: settings.normalize_by_default,
        };
        state
            .log
            .push(format!("Client ready, server {}", settings.server_url));
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> ViewModel {
        view::render(&self.state)
    }

    /// Applies a user action. Returns the backend command to run, if any.
    pub fn dispatch(&mut self, action: UiAction) -> Option<BackendCommand> {
        match action {
            UiAction::FilesPicked(files) => {
                for file in files {
                    self.state.log.push(format!("Added file: {}", file.name));
                    self.state.registry.add(file);
                }
                None
            }
            UiAction::ToggleFile(id) => {
                if self.state.registry.contains(id) && !self.state.selected_files.remove(&id) {
                    self.state.selected_files.insert(id);
                }
                self.selection_changed();
                None
            }
            UiAction::SelectAllFiles => {
                self.state.selected_files = self.state.registry.ids().collect();
                self.selection_changed();
                None
            }
            UiAction::UnselectAllFiles => {
                self.state.selected_files.clear();
                self.selection_changed();
                None
            }
            UiAction::InvertFileSelection => {
                let inverted = self
                    .state
                    .registry
                    .ids()
                    .filter(|id| !self.state.selected_files.contains(id))
                    .collect();
                self.state.selected_files = inverted;
                self.selection_changed();
                None
            }
            UiAction::DeleteSelectedFiles => {
                let removed = self.state.registry.remove_where(&self.state.selected_files);
                self.state.selected_files.clear();
                self.selection_changed();
                self.state
                    .log
                    .push(format!("Deleted {removed} selected file(s)"));
                None
            }
            UiAction::ClearFiles => {
                self.state.registry.clear();
                self.state.selected_files.clear();
                self.selection_changed();
                self.state.log.push("File list cleared");
                None
            }
            UiAction::Reset => {
                self.reset();
                None
            }
            UiAction::ToggleColumn(name) => {
                let excludable = self
                    .state
                    .cache
                    .column(&name)
                    .is_some_and(|column| !column.is_meta);
                if excludable && !self.state.excluded_columns.remove(&name) {
                    self.state.excluded_columns.insert(name);
                }
                None
            }
            UiAction::SelectAllColumns => {
                self.state.excluded_columns = self.excludable_columns().collect();
                None
            }
            UiAction::UnselectAllColumns => {
                self.state.excluded_columns.clear();
                None
            }
            UiAction::InvertColumnSelection => {
                let inverted = self
                    .excludable_columns()
                    .filter(|name| !self.state.excluded_columns.contains(name))
                    .collect();
                self.state.excluded_columns = inverted;
                None
            }
            UiAction::SetNormalize(value) => {
                self.state.options.normalize = value;
                None
            }
            UiAction::SetFuzzy(value) => {
                self.state.options.fuzzy = value;
                None
            }
            UiAction::SetRemoveDuplicates(value) => {
                self.state.options.remove_duplicates = value;
                None
            }
            UiAction::SetSmartDedup(value) => {
                self.state.options.smart_dedup = value;
                None
            }
            UiAction::SetDedupKeys(keys) => {
                self.state.options.dedup_keys = keys;
                None
            }
            UiAction::SetOutputFormat(format) => {
                if self.state.output_formats.contains(&format) {
                    self.state.options.output_format = format;
                } else {
                    warn!(%format, "output format is not offered; ignoring");
                }
                None
            }
            UiAction::Inspect => self.begin_inspect(),
            UiAction::Merge => self.begin_merge(),
            UiAction::ToggleMappingPanel => self.toggle_mapping_panel(),
            UiAction::EditMapping(text) => {
                self.state.mapping.text = text;
                None
            }
            UiAction::SaveMapping => self.begin_save_mapping(),
            UiAction::Cleanup(target) => self.begin_cleanup(target),
            UiAction::SaveResult(destination) => self.begin_download(destination),
        }
    }

    /// Applies a settled backend outcome. Stale outcomes are discarded.
    pub fn apply(&mut self, outcome: BackendOutcome) {
        let ticket = outcome.ticket();
        if !self.state.requests.settle(ticket) {
            debug!(
                kind = ticket.kind.label(),
                seq = ticket.seq.0,
                "discarding stale backend outcome"
            );
            return;
        }
        info!(kind = ticket.kind.label(), seq = ticket.seq.0, "applying backend outcome");

        match outcome {
            BackendOutcome::Inspected { result, .. } => self.finish_inspect(result),
            BackendOutcome::Merged { result, .. } => self.finish_merge(result),
            BackendOutcome::MappingLoaded { result, .. } => self.finish_load_mapping(result),
            BackendOutcome::MappingSaved { result, .. } => self.finish_save_mapping(result),
            BackendOutcome::CleanedUp { target, result, .. } => {
                self.finish_cleanup(target, result)
            }
            BackendOutcome::Downloaded {
                destination,
                result,
                ..
            } => self.finish_download(destination, result),
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.state.status = Some(StatusLine {
            text: text.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.state.status = Some(StatusLine {
            text: text.into(),
            is_error: true,
        });
    }

    fn selection_changed(&mut self) {
        if self.state.inspect_phase == InspectPhase::Failed {
            self.state.inspect_phase = InspectPhase::Idle;
        }
    }

    fn excludable_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.state
            .cache
            .columns()
            .iter()
            .filter(|column| !column.is_meta)
            .map(|column| column.name.clone())
    }

    fn refuse_empty_selection(&mut self, operation: &str) {
        self.set_error(SELECT_FILES_FIRST);
        self.state
            .log
            .push(format!("{operation} refused: no files selected"));
    }

    fn reset(&mut self) {
        self.state.registry.clear();
        self.state.selected_files.clear();
        self.state.excluded_columns.clear();
        self.state.options.normalize = self.state.normalize_default;
        self.state.options.fuzzy = false;
        self.state.options.remove_duplicates = false;
        self.state.options.smart_dedup = false;
        self.state.options.dedup_keys.clear();
        self.state.status = None;
        self.state.download = None;
        self.state.cache.clear();
        self.state.inspect_phase = InspectPhase::Idle;
        self.state.requests.abandon(RequestKind::Inspect);
        self.state.requests.abandon(RequestKind::Merge);
        self.state.requests.abandon(RequestKind::Download);
        self.state.log.push("Form reset");
    }

    fn begin_inspect(&mut self) -> Option<BackendCommand> {
        if self.state.is_in_flight(RequestKind::Inspect) {
            return None;
        }
        if self.state.registry.is_empty() {
            self.refuse_empty_selection("Inspect");
            return None;
        }

        let files = self.state.registry.uploads();
        let ticket = self.state.requests.issue(RequestKind::Inspect);
        self.state.inspect_phase = InspectPhase::Loading;
        self.set_status("Inspecting files...");
        self.state
            .log
            .push(format!("Inspect started, files: {}", files.len()));
        Some(BackendCommand::Inspect {
            ticket,
            request: InspectRequest {
                files,
                normalize: self.state.options.normalize,
                fuzzy: self.state.options.fuzzy,
            },
        })
    }

    fn finish_inspect(&mut self, result: Result<InspectReport, GatewayError>) {
        match result {
            Ok(report) => {
                let mapped_sheets = report.mapping.len();
                self.state.log.push(format!(
                    "Inspect finished: {} column(s), {} preview(s)",
                    report.columns.len(),
                    report.previews.len()
                ));
                if mapped_sheets > 0 {
                    self.state
                        .log
                        .push(format!("Column mapping applied to {mapped_sheets} sheet(s)"));
                }
                self.state.cache.replace_report(report);
                self.state.excluded_columns.clear();
                self.state.inspect_phase = InspectPhase::Idle;
                self.state.download = None;
                self.set_status("Inspection finished; pick columns to drop, then merge.");
            }
            Err(err) => {
                self.state.inspect_phase = InspectPhase::Failed;
                self.set_error(err.status_text("Inspect"));
                self.state.log.push(format!("Inspect failed: {err}"));
            }
        }
    }

    fn begin_merge(&mut self) -> Option<BackendCommand> {
        if self.state.is_in_flight(RequestKind::Merge) {
            return None;
        }
        if self.state.registry.is_empty() {
            self.refuse_empty_selection("Merge");
            return None;
        }

        let form = &self.state.options;
        let options = MergeOptions {
            normalize: form.normalize,
            fuzzy: form.fuzzy,
            remove_duplicates: form.remove_duplicates,
            smart_dedup: form.smart_dedup,
            dedup_keys: form.dedup_keys.trim().to_string(),
            excluded_columns: self.state.excluded_columns.clone(),
            output_format: form.output_format,
        };
        let files = self.state.registry.uploads();
        let ticket = self.state.requests.issue(RequestKind::Merge);
        self.state.download = None;
        self.set_status("Merging, please wait...");
        self.state.log.push("Merge started");
        Some(BackendCommand::Merge {
            ticket,
            request: MergeRequest { files, options },
        })
    }

    fn finish_merge(&mut self, result: Result<MergeReceipt, GatewayError>) {
        match result {
            Ok(receipt) => {
                self.state
                    .log
                    .push(format!("Merge finished, result at {}", receipt.download_url));
                self.state.download = Some(DownloadLink {
                    file_name: receipt.output_format.default_file_name(),
                    url: receipt.download_url,
                    task_id: receipt.task_id,
                });
                self.set_status("Merge succeeded, download the result.");
            }
            Err(err) => {
                self.set_error(err.status_text("Merge"));
                self.state.log.push(format!("Merge failed: {err}"));
            }
        }
    }

    fn toggle_mapping_panel(&mut self) -> Option<BackendCommand> {
        self.state.mapping.visible = !self.state.mapping.visible;
        if !self.state.mapping.visible
            || self.state.mapping.loaded
            || self.state.is_in_flight(RequestKind::LoadMapping)
        {
            return None;
        }
        let ticket = self.state.requests.issue(RequestKind::LoadMapping);
        self.state.mapping.status = Some("Loading mapping...".to_string());
        Some(BackendCommand::LoadMapping { ticket })
    }

    fn finish_load_mapping(&mut self, result: Result<Value, GatewayError>) {
        match result {
            Ok(mappings) => {
                self.state.mapping.text = serde_json::to_string_pretty(&mappings)
                    .unwrap_or_else(|_| mappings.to_string());
                self.state.mapping.loaded = true;
                self.state.mapping.status = Some("Mapping loaded.".to_string());
                self.state.log.push("Mapping loaded");
            }
            Err(err) => {
                let message = err
                    .server_message()
                    .unwrap_or("Failed to load mapping")
                    .to_string();
                self.state.mapping.status = Some(message);
                self.state.log.push(format!("Mapping load failed: {err}"));
            }
        }
    }

    fn begin_save_mapping(&mut self) -> Option<BackendCommand> {
        if self.state.is_in_flight(RequestKind::SaveMapping) {
            return None;
        }
        let mappings = match serde_json::from_str::<Value>(&self.state.mapping.text) {
            Ok(mappings) => mappings,
            Err(err) => {
                self.state.mapping.status = Some(MAPPING_SAVE_FAILED.to_string());
                self.state
                    .log
                    .push(format!("Mapping save refused: invalid JSON ({err})"));
                return None;
            }
        };
        let ticket = self.state.requests.issue(RequestKind::SaveMapping);
        self.state.mapping.status = Some("Saving mapping...".to_string());
        Some(BackendCommand::SaveMapping { ticket, mappings })
    }

    fn finish_save_mapping(&mut self, result: Result<(), GatewayError>) {
        match result {
            Ok(()) => {
                self.state.mapping.status = Some("Saved".to_string());
                self.state.log.push("Mapping saved");
            }
            Err(err) => {
                // The service answers 400/500 with its reason in the envelope.
                let message = err
                    .server_message()
                    .unwrap_or(MAPPING_SAVE_FAILED)
                    .to_string();
                self.state.mapping.status = Some(message);
                self.state.log.push(format!("Mapping save failed: {err}"));
            }
        }
    }

    fn begin_cleanup(&mut self, target: CleanupTarget) -> Option<BackendCommand> {
        let kind = RequestKind::Cleanup(target);
        if self.state.is_in_flight(kind) {
            return None;
        }
        let ticket = self.state.requests.issue(kind);
        self.set_status(format!("Cleaning {}...", target.label()));
        self.state
            .log
            .push(format!("Cleanup of {} started", target.label()));
        Some(BackendCommand::Cleanup { ticket, target })
    }

    fn finish_cleanup(&mut self, target: CleanupTarget, result: Result<CleanupReport, GatewayError>) {
        let label = capitalized(target.label());
        match result {
            Ok(report) => {
                let mut summary = format!(
                    "{label} cleanup finished, removed {} item(s)",
                    report.removed
                );
                if !report.errors.is_empty() {
                    summary.push_str(&format!(" with {} warning(s)", report.errors.len()));
                }
                self.state.log.push(summary.clone());
                if !report.errors.is_empty() {
                    self.state
                        .log
                        .push(format!("Cleanup errors: {}", report.errors.join("; ")));
                }
                self.set_status(summary);
            }
            Err(err) => {
                self.set_error(err.status_text(&format!("{label} cleanup")));
                self.state.log.push(format!("{label} cleanup failed: {err}"));
            }
        }
    }

    fn begin_download(&mut self, destination: PathBuf) -> Option<BackendCommand> {
        if self.state.is_in_flight(RequestKind::Download) {
            return None;
        }
        let Some(link) = self.state.download.as_ref() else {
            self.set_error("No merged result to save yet.");
            return None;
        };
        let url = link.url.clone();
        let ticket = self.state.requests.issue(RequestKind::Download);
        self.set_status(format!("Saving result to {}...", destination.display()));
        Some(BackendCommand::Download {
            ticket,
            url,
            destination,
        })
    }

    fn finish_download(&mut self, destination: PathBuf, result: Result<u64, GatewayError>) {
        match result {
            Ok(bytes) => {
                let message = format!("Saved result to {} ({bytes} bytes)", destination.display());
                self.state.log.push(message.clone());
                self.set_status(message);
            }
            Err(err) => {
                self.set_error(err.status_text("Download"));
                self.state.log.push(format!("Download failed: {err}"));
            }
        }
    }
}

fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
