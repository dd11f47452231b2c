use std::{fs, path::Path};

use serde::Deserialize;
use shared::domain::OutputFormat;
use tracing::warn;

pub const SETTINGS_FILE: &str = "merger_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    /// Formats offered by the output selector, in display order.
    pub output_formats: Vec<OutputFormat>,
    pub default_output_format: OutputFormat,
    /// Extensions offered by the file picker, without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub normalize_by_default: bool,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            output_formats: OutputFormat::ALL.to_vec(),
            default_output_format: OutputFormat::Xlsx,
            allowed_extensions: ["xlsx", "xls", "csv", "txt"]
                .into_iter()
                .map(String::from)
                .collect(),
            normalize_by_default: true,
            log_filter: "info".into(),
        }
    }
}

/// Every key is optional; missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    output_formats: Option<Vec<String>>,
    default_output_format: Option<String>,
    allowed_extensions: Option<Vec<String>>,
    normalize_by_default: Option<bool>,
    log_filter: Option<String>,
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

/// Defaults, then the optional TOML file at `path`, then environment
/// overrides looked up through `env`.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    if let Some(v) = non_empty(env("MERGER_SERVER_URL")) {
        settings.server_url = v;
    }
    if let Some(v) = non_empty(env("APP__SERVER_URL")) {
        settings.server_url = v;
    }

    if let Some(v) = non_empty(env("MERGER_OUTPUT_FORMAT")) {
        match v.parse::<OutputFormat>() {
            Ok(format) => settings.default_output_format = format,
            Err(err) => warn!("ignoring MERGER_OUTPUT_FORMAT: {err}"),
        }
    }

    if let Some(v) = non_empty(env("MERGER_LOG_FILTER")) {
        settings.log_filter = v;
    }

    if !settings
        .output_formats
        .contains(&settings.default_output_format)
    {
        settings
            .output_formats
            .insert(0, settings.default_output_format);
    }

    settings
}

fn apply_file(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(values) = file_cfg.output_formats {
        let formats: Vec<OutputFormat> = values
            .iter()
            .filter_map(|value| match value.parse::<OutputFormat>() {
                Ok(format) => Some(format),
                Err(err) => {
                    warn!("ignoring output format in settings: {err}");
                    None
                }
            })
            .fold(Vec::new(), |mut acc, format| {
                if !acc.contains(&format) {
                    acc.push(format);
                }
                acc
            });
        if !formats.is_empty() {
            settings.output_formats = formats;
        }
    }
    if let Some(v) = file_cfg.default_output_format {
        match v.parse::<OutputFormat>() {
            Ok(format) => settings.default_output_format = format,
            Err(err) => warn!("ignoring default_output_format in settings: {err}"),
        }
    }
    if let Some(values) = file_cfg.allowed_extensions {
        settings.allowed_extensions = values
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
    }
    if let Some(v) = file_cfg.normalize_by_default {
        settings.normalize_by_default = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
