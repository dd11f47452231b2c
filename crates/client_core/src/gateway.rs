use std::{collections::BTreeSet, path::PathBuf};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{CleanupTarget, OutputFormat},
    protocol::{
        fields, AckResponse, CleanupResponse, Envelope, InspectResponse, MappingResponse,
        MergeResponse, SaveMappingRequest, CLEANUP_PATH, INSPECT_PATH, MAPPING_PATH, MERGE_PATH,
    },
};
use tracing::{info, warn};
use url::Url;

use crate::{error::GatewayError, inspection::InspectReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectRequest {
    pub files: Vec<UploadFile>,
    pub normalize: bool,
    pub fuzzy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub normalize: bool,
    pub fuzzy: bool,
    pub remove_duplicates: bool,
    pub smart_dedup: bool,
    pub dedup_keys: String,
    pub excluded_columns: BTreeSet<String>,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub files: Vec<UploadFile>,
    pub options: MergeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReceipt {
    /// Absolute URL of the merged result.
    pub download_url: String,
    pub task_id: Option<String>,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: u64,
    pub errors: Vec<String>,
}

/// The merge service as seen by the client. One call is one request/response
/// cycle: no retries, no timeouts beyond the transport's own.
#[async_trait]
pub trait MergeBackend: Send + Sync {
    async fn inspect(&self, request: InspectRequest) -> Result<InspectReport, GatewayError>;
    async fn merge(&self, request: MergeRequest) -> Result<MergeReceipt, GatewayError>;
    async fn load_mapping(&self) -> Result<Value, GatewayError>;
    async fn save_mapping(&self, mappings: Value) -> Result<(), GatewayError>;
    async fn cleanup(&self, target: CleanupTarget) -> Result<CleanupReport, GatewayError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError>;
}

pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(server_url: &str) -> Result<Self, GatewayError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(server_url.trim()).map_err(|err| {
            GatewayError::InvalidInput(format!("invalid server url '{server_url}': {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidInput(format!(
                "server url '{server_url}' cannot carry endpoint paths"
            )));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves an endpoint path or a server-provided link against the
    /// configured server. Absolute URLs pass through unchanged.
    pub fn resolve(&self, path_or_url: &str) -> Result<Url, GatewayError> {
        self.base_url.join(path_or_url).map_err(|err| {
            GatewayError::InvalidInput(format!("cannot resolve '{path_or_url}': {err}"))
        })
    }

    async fn post_form<T>(&self, path: &str, form: Form) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + Envelope,
    {
        let url = self.resolve(path)?;
        let response = self.http.post(url).multipart(form).send().await?;
        read_envelope(path, response).await
    }
}

async fn upload_form(files: &[UploadFile]) -> Result<Form, GatewayError> {
    if files.is_empty() {
        return Err(GatewayError::EmptySelection);
    }
    let mut form = Form::new();
    for file in files {
        let bytes = tokio::fs::read(&file.path).await.map_err(|err| {
            GatewayError::LocalIo(format!("failed to read '{}': {err}", file.path.display()))
        })?;
        form = form.part(
            fields::FILES,
            Part::bytes(bytes).file_name(file.name.clone()),
        );
    }
    Ok(form)
}

fn with_flag(form: Form, name: &'static str, enabled: bool) -> Form {
    if enabled {
        form.text(name, fields::FLAG_ON)
    } else {
        form
    }
}

async fn read_envelope<T>(endpoint: &str, response: Response) -> Result<T, GatewayError>
where
    T: DeserializeOwned + Envelope,
{
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        // Error pages from the service still tend to carry the JSON envelope.
        let detail = serde_json::from_slice::<T>(&body)
            .ok()
            .and_then(|envelope| envelope.error_message().map(str::to_owned));
        warn!(endpoint, status = status.as_u16(), "request failed");
        return Err(GatewayError::Http {
            status: status.as_u16(),
            detail,
        });
    }

    let envelope: T = serde_json::from_slice(&body).map_err(|err| {
        warn!(endpoint, "response body does not match schema: {err}");
        GatewayError::MalformedResponse(format!("{endpoint}: {err}"))
    })?;
    if !envelope.is_ok() {
        return Err(GatewayError::Rejected(
            envelope.error_message().map(str::to_owned),
        ));
    }
    Ok(envelope)
}

#[async_trait]
impl MergeBackend for HttpGateway {
    async fn inspect(&self, request: InspectRequest) -> Result<InspectReport, GatewayError> {
        info!(files = request.files.len(), "sending inspect request");
        let mut form = upload_form(&request.files).await?;
        form = with_flag(form, fields::NORMALIZE_COLUMNS, request.normalize);
        form = with_flag(form, fields::ENABLE_FUZZY, request.fuzzy);

        let response: InspectResponse = self.post_form(INSPECT_PATH, form).await?;
        Ok(InspectReport {
            columns: response.columns,
            previews: response.previews,
            mapping: response.mapping,
        })
    }

    async fn merge(&self, request: MergeRequest) -> Result<MergeReceipt, GatewayError> {
        let options = &request.options;
        info!(
            files = request.files.len(),
            excluded = options.excluded_columns.len(),
            format = %options.output_format,
            "sending merge request"
        );
        let mut form = upload_form(&request.files).await?;
        form = with_flag(form, fields::NORMALIZE_COLUMNS, options.normalize);
        form = with_flag(form, fields::ENABLE_FUZZY, options.fuzzy);
        form = with_flag(form, fields::REMOVE_DUPLICATES, options.remove_duplicates);
        form = with_flag(form, fields::SMART_DEDUP, options.smart_dedup);
        let excluded = options
            .excluded_columns
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let form = form
            .text(fields::DEDUP_KEYS, options.dedup_keys.trim().to_string())
            .text(fields::EXCLUDE_COLUMNS, excluded)
            .text(fields::OUTPUT_FORMAT, options.output_format.as_str());

        let response: MergeResponse = self.post_form(MERGE_PATH, form).await?;
        let link = response
            .download_url
            .filter(|link| !link.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::MalformedResponse(format!("{MERGE_PATH}: missing download_url"))
            })?;
        Ok(MergeReceipt {
            download_url: self.resolve(&link)?.to_string(),
            task_id: response.task_id,
            output_format: options.output_format,
        })
    }

    async fn load_mapping(&self) -> Result<Value, GatewayError> {
        let url = self.resolve(MAPPING_PATH)?;
        let response = self.http.get(url).send().await?;
        let envelope: MappingResponse = read_envelope(MAPPING_PATH, response).await?;
        match envelope.mappings {
            Some(mappings @ Value::Object(_)) => Ok(mappings),
            Some(_) => Err(GatewayError::MalformedResponse(format!(
                "{MAPPING_PATH}: mappings is not an object"
            ))),
            None => Err(GatewayError::MalformedResponse(format!(
                "{MAPPING_PATH}: missing mappings"
            ))),
        }
    }

    async fn save_mapping(&self, mappings: Value) -> Result<(), GatewayError> {
        let url = self.resolve(MAPPING_PATH)?;
        let response = self
            .http
            .post(url)
            .json(&SaveMappingRequest { mappings })
            .send()
            .await?;
        let _: AckResponse = read_envelope(MAPPING_PATH, response).await?;
        Ok(())
    }

    async fn cleanup(&self, target: CleanupTarget) -> Result<CleanupReport, GatewayError> {
        info!(cleanup_target = target.as_str(), "sending cleanup request");
        let form = Form::new().text(fields::TARGET, target.as_str());
        let response: CleanupResponse = self.post_form(CLEANUP_PATH, form).await?;
        let removed = response.removed.ok_or_else(|| {
            GatewayError::MalformedResponse(format!("{CLEANUP_PATH}: missing removed count"))
        })?;
        Ok(CleanupReport {
            removed,
            errors: response.errors,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.resolve(url)?;
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "download failed");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                detail: None,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
