use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    controller::MAPPING_SAVE_FAILED,
    execute, load_settings,
    settings::load_settings_from,
    view::{ColumnChecklistView, PreviewPanelView},
    ClientSettings, HttpGateway, MergeController, PickedFile, UiAction, ViewModel,
};
use shared::domain::{CleanupTarget, OutputFormat, RequestKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "merger_cli", about = "Drive the spreadsheet merge service from the shell")]
struct Cli {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file to load instead of ./merger_client.toml.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Print the activity log to stderr when done.
    #[arg(long)]
    show_log: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct ColumnFlags {
    /// Skip column-name normalisation.
    #[arg(long)]
    no_normalize: bool,
    /// Enable fuzzy column matching.
    #[arg(long)]
    fuzzy: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload files and print their columns and previews.
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        flags: ColumnFlags,
        /// Only show previews of these file names.
        #[arg(long = "only")]
        only: Vec<String>,
    },
    /// Merge files and optionally save the result.
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        flags: ColumnFlags,
        #[arg(long)]
        remove_duplicates: bool,
        #[arg(long)]
        smart_dedup: bool,
        #[arg(long, default_value = "")]
        dedup_keys: String,
        /// Columns to drop, comma separated.
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Where to save the merged result.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show or replace the server's column mapping.
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },
    /// Ask the server to clean its logs or temp directory.
    Cleanup { target: CleanupTarget },
}

#[derive(Subcommand, Debug)]
enum MappingAction {
    Show,
    /// Upload a JSON mapping file.
    Save { file: PathBuf },
}

struct Session {
    controller: MergeController,
    backend: HttpGateway,
    settings: ClientSettings,
}

impl Session {
    fn new(settings: ClientSettings) -> Result<Self> {
        let backend = HttpGateway::new(&settings.server_url)
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
        Ok(Self {
            controller: MergeController::new(&settings),
            backend,
            settings,
        })
    }

    /// Dispatches one action and, when it needs the backend, runs the request
    /// to completion before returning.
    async fn step(&mut self, action: UiAction) -> Result<()> {
        let Some(command) = self.controller.dispatch(action) else {
            return self.check_status();
        };
        let kind = command.ticket().kind;
        let outcome = execute(&self.backend, command).await;
        let failed = outcome.error().is_some();
        self.controller.apply(outcome);
        if failed {
            let state = self.controller.state();
            let message = match kind {
                RequestKind::LoadMapping | RequestKind::SaveMapping => state.mapping.status.clone(),
                _ => state.status.as_ref().map(|status| status.text.clone()),
            }
            .unwrap_or_else(|| format!("{} failed", kind.label()));
            bail!(message);
        }
        Ok(())
    }

    fn check_status(&self) -> Result<()> {
        match &self.controller.state().status {
            Some(status) if status.is_error => bail!(status.text.clone()),
            _ => Ok(()),
        }
    }

    fn pick(&mut self, files: &[PathBuf]) -> Result<()> {
        let mut picked = Vec::with_capacity(files.len());
        for path in files {
            if !has_allowed_extension(path, &self.settings.allowed_extensions) {
                tracing::warn!(path = %path.display(), "extension is not in the accepted list");
            }
            picked.push(
                PickedFile::from_path(path)
                    .with_context(|| format!("cannot use '{}'", path.display()))?,
            );
        }
        self.controller.dispatch(UiAction::FilesPicked(picked));
        Ok(())
    }

    async fn apply_flags(&mut self, flags: &ColumnFlags) -> Result<()> {
        self.step(UiAction::SetNormalize(!flags.no_normalize)).await?;
        self.step(UiAction::SetFuzzy(flags.fuzzy)).await
    }

    fn status_line(&self) -> Option<String> {
        self.controller
            .state()
            .status
            .as_ref()
            .map(|status| status.text.clone())
    }
}

fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

fn render_columns(view: &ViewModel) -> String {
    match &view.columns {
        ColumnChecklistView::Placeholder(text) => format!("{text}\n"),
        ColumnChecklistView::Rows(rows) => rows
            .iter()
            .map(|row| {
                let mark = if row.kept {
                    "[kept]"
                } else if row.checked {
                    "[drop]"
                } else {
                    "[ ]"
                };
                format!("{mark} {} ({})\n", row.name, row.sources)
            })
            .collect(),
    }
}

fn render_preview(view: &ViewModel) -> String {
    match &view.preview {
        PreviewPanelView::Placeholder(text) => format!("{text}\n"),
        PreviewPanelView::Blocks(blocks) => blocks
            .iter()
            .map(|block| {
                let mut text = format!("== {} ==\n{}\n", block.title, block.header);
                for row in &block.rows {
                    text.push_str(row);
                    text.push('\n');
                }
                text
            })
            .collect(),
    }
}

async fn run(cli: Cli, session: &mut Session) -> Result<()> {
    match cli.command {
        Command::Inspect { files, flags, only } => {
            session.pick(&files)?;
            session.apply_flags(&flags).await?;
            session.step(UiAction::Inspect).await?;
            let ids: Vec<_> = session
                .controller
                .state()
                .registry
                .files()
                .iter()
                .filter(|file| only.contains(&file.name))
                .map(|file| file.id)
                .collect();
            for id in ids {
                session.step(UiAction::ToggleFile(id)).await?;
            }
            let view = session.controller.view();
            print!("Columns:\n{}", render_columns(&view));
            print!("Preview:\n{}", render_preview(&view));
        }
        Command::Merge {
            files,
            flags,
            remove_duplicates,
            smart_dedup,
            dedup_keys,
            exclude,
            format,
            output,
        } => {
            session.pick(&files)?;
            session.apply_flags(&flags).await?;
            if !exclude.is_empty() {
                // Columns can only be dropped once the server has reported them.
                session.step(UiAction::Inspect).await?;
                for name in exclude.iter().map(|name| name.trim()).filter(|n| !n.is_empty()) {
                    match session.controller.state().cache.column(name) {
                        None => bail!("column '{name}' was not reported by inspect"),
                        Some(column) if column.is_meta => {
                            bail!("column '{name}' is always kept and cannot be excluded")
                        }
                        Some(_) => {}
                    }
                    session.step(UiAction::ToggleColumn(name.to_string())).await?;
                }
            }
            session
                .step(UiAction::SetRemoveDuplicates(remove_duplicates))
                .await?;
            session.step(UiAction::SetSmartDedup(smart_dedup)).await?;
            session.step(UiAction::SetDedupKeys(dedup_keys)).await?;
            if let Some(format) = format {
                session.step(UiAction::SetOutputFormat(format)).await?;
            }
            session.step(UiAction::Merge).await?;

            let link = session
                .controller
                .state()
                .download
                .clone()
                .context("merge finished without a download link")?;
            println!("{}", link.url);
            if let Some(output) = output {
                session.step(UiAction::SaveResult(output)).await?;
            }
        }
        Command::Mapping {
            action: MappingAction::Show,
        } => {
            session.step(UiAction::ToggleMappingPanel).await?;
            println!("{}", session.controller.state().mapping.text);
        }
        Command::Mapping {
            action: MappingAction::Save { file },
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read mapping file '{}'", file.display()))?;
            session.step(UiAction::EditMapping(text)).await?;
            session.step(UiAction::SaveMapping).await?;
            let status = session.controller.state().mapping.status.clone();
            if status.as_deref() == Some(MAPPING_SAVE_FAILED) {
                bail!(MAPPING_SAVE_FAILED);
            }
        }
        Command::Cleanup { target } => {
            session.step(UiAction::Cleanup(target)).await?;
        }
    }

    if let Some(status) = session.status_line() {
        eprintln!("{status}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => load_settings_from(path, |name| std::env::var(name).ok()),
        None => load_settings(),
    };
    if let Some(server_url) = &cli.server_url {
        settings.server_url = server_url.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let show_log = cli.show_log;
    let mut session = Session::new(settings)?;
    let result = run(cli, &mut session).await;
    if show_log {
        for line in session.controller.state().log.rendered() {
            eprintln!("{line}");
        }
    }
    result
}
