//! Scripted `MergeBackend` shared by the command and controller tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::CleanupTarget,
    protocol::{ColumnInfo, PreviewEntry},
};

use crate::{
    error::GatewayError,
    gateway::{CleanupReport, InspectRequest, MergeBackend, MergeReceipt, MergeRequest},
    inspection::InspectReport,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Inspect(InspectRequest),
    Merge(MergeRequest),
    LoadMapping,
    SaveMapping(Value),
    Cleanup(CleanupTarget),
    Download(String),
}

#[derive(Default)]
struct Script {
    inspect: VecDeque<Result<InspectReport, GatewayError>>,
    merge: VecDeque<Result<MergeReceipt, GatewayError>>,
    load_mapping: VecDeque<Result<Value, GatewayError>>,
    save_mapping: VecDeque<Result<(), GatewayError>>,
    cleanup: VecDeque<Result<CleanupReport, GatewayError>>,
    download: VecDeque<Result<Vec<u8>, GatewayError>>,
    calls: Vec<Call>,
}

/// Replies are consumed in the order they were scripted. An unscripted call
/// fails as a transport error.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

fn unscripted<T>(operation: &str) -> Result<T, GatewayError> {
    Err(GatewayError::Transport(format!("{operation} not scripted")))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, edit: impl FnOnce(&mut Script)) -> Self {
        edit(&mut self.script.lock().expect("script lock"));
        self
    }

    pub fn on_inspect(self, reply: Result<InspectReport, GatewayError>) -> Self {
        self.with(|script| script.inspect.push_back(reply))
    }

    pub fn on_merge(self, reply: Result<MergeReceipt, GatewayError>) -> Self {
        self.with(|script| script.merge.push_back(reply))
    }

    pub fn on_load_mapping(self, reply: Result<Value, GatewayError>) -> Self {
        self.with(|script| script.load_mapping.push_back(reply))
    }

    pub fn on_save_mapping(self, reply: Result<(), GatewayError>) -> Self {
        self.with(|script| script.save_mapping.push_back(reply))
    }

    pub fn on_cleanup(self, reply: Result<CleanupReport, GatewayError>) -> Self {
        self.with(|script| script.cleanup.push_back(reply))
    }

    pub fn on_download(self, reply: Result<Vec<u8>, GatewayError>) -> Self {
        self.with(|script| script.download.push_back(reply))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().expect("script lock").calls.clone()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, Script> {
        let mut script = self.script.lock().expect("script lock");
        script.calls.push(call);
        script
    }
}

#[async_trait]
impl MergeBackend for ScriptedBackend {
    async fn inspect(&self, request: InspectRequest) -> Result<InspectReport, GatewayError> {
        let reply = self.record(Call::Inspect(request)).inspect.pop_front();
        reply.unwrap_or_else(|| unscripted("inspect"))
    }

    async fn merge(&self, request: MergeRequest) -> Result<MergeReceipt, GatewayError> {
        let reply = self.record(Call::Merge(request)).merge.pop_front();
        reply.unwrap_or_else(|| unscripted("merge"))
    }

    async fn load_mapping(&self) -> Result<Value, GatewayError> {
        let reply = self.record(Call::LoadMapping).load_mapping.pop_front();
        reply.unwrap_or_else(|| unscripted("load_mapping"))
    }

    async fn save_mapping(&self, mappings: Value) -> Result<(), GatewayError> {
        let reply = self.record(Call::SaveMapping(mappings)).save_mapping.pop_front();
        reply.unwrap_or_else(|| unscripted("save_mapping"))
    }

    async fn cleanup(&self, target: CleanupTarget) -> Result<CleanupReport, GatewayError> {
        let reply = self.record(Call::Cleanup(target)).cleanup.pop_front();
        reply.unwrap_or_else(|| unscripted("cleanup"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let reply = self.record(Call::Download(url.to_string())).download.pop_front();
        reply.unwrap_or_else(|| unscripted("download"))
    }
}

pub fn column(name: &str, is_meta: bool) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        is_meta,
        sources: vec![format!("{name}.xlsx-Sheet1")],
    }
}

pub fn preview(file: &str, columns: &[&str], rows: Vec<Value>) -> PreviewEntry {
    PreviewEntry {
        file: file.to_string(),
        sheet: "Sheet1".to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .into_iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
    }
}

pub fn report(columns: Vec<ColumnInfo>, previews: Vec<PreviewEntry>) -> InspectReport {
    InspectReport {
        columns,
        previews,
        mapping: Default::default(),
    }
}
