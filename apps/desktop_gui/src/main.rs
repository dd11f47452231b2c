use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use anyhow::anyhow;
use clap::Parser;
use client_core::{load_settings, settings::load_settings_from, BackendCommand};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::controller::events::UiEvent;
use crate::ui::DesktopGuiApp;

#[derive(Parser, Debug)]
#[command(name = "desktop_gui", about = "Desktop client for the spreadsheet merge service")]
struct GuiArgs {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file to load instead of ./merger_client.toml.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = GuiArgs::parse();
    let mut settings = match &args.settings {
        Some(path) => load_settings_from(path, |name| std::env::var(name).ok()),
        None => load_settings(),
    };
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings.server_url.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Spreadsheet Merger")
            .with_inner_size([1200.0, 780.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Spreadsheet Merger",
        options,
        Box::new(move |_cc| Ok(Box::new(DesktopGuiApp::new(&settings, cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow!("desktop window failed: {err}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::GuiArgs;

    #[test]
    fn gui_arguments_are_consistent() {
        GuiArgs::command().debug_assert();
    }

    #[test]
    fn parses_server_override() {
        let args = <GuiArgs as clap::Parser>::try_parse_from([
            "desktop_gui",
            "--server-url",
            "http://merge.local:8000",
        ])
        .expect("parse");
        assert_eq!(args.server_url.as_deref(), Some("http://merge.local:8000"));
        assert!(args.settings.is_none());
    }
}
