use std::time::Duration;

use client_core::{
    BackendCommand, ClientSettings, MergeController, PickedFile, UiAction,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::ui::panels::{self, PanelEvent};

pub struct DesktopGuiApp {
    controller: MergeController,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    allowed_extensions: Vec<String>,
    worker_status: String,
    banner: Option<UiError>,
}

impl DesktopGuiApp {
    pub fn new(
        settings: &ClientSettings,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        Self {
            controller: MergeController::new(settings),
            cmd_tx,
            ui_rx,
            allowed_extensions: settings.allowed_extensions.clone(),
            worker_status: "Backend worker not started".to_string(),
            banner: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.worker_status = message;
                }
                UiEvent::Outcome(outcome) => self.controller.apply(outcome),
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), category = ?err.category(), "{}", err.message());
                    self.banner = Some(err);
                }
            }
        }
    }

    fn handle(&mut self, action: UiAction) {
        if let Some(cmd) = self.controller.dispatch(action) {
            if let Some(outcome) = dispatch_backend_command(&self.cmd_tx, cmd) {
                self.controller.apply(outcome);
            }
        }
    }

    fn handle_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Action(action) => self.handle(action),
            PanelEvent::PickFiles => self.pick_files(),
            PanelEvent::ChooseResultDestination => self.choose_result_destination(),
        }
    }

    fn pick_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Spreadsheets", self.allowed_extensions.as_slice())
            .pick_files()
        else {
            return;
        };

        let mut picked = Vec::with_capacity(paths.len());
        for path in paths {
            match PickedFile::from_path(&path) {
                Ok(file) => picked.push(file),
                Err(err) => {
                    self.banner = Some(UiError::from_message(
                        UiErrorContext::FilePicker,
                        format!("failed to read '{}': {err}", path.display()),
                    ));
                }
            }
        }
        if !picked.is_empty() {
            self.handle(UiAction::FilesPicked(picked));
        }
    }

    fn choose_result_destination(&mut self) {
        let Some(suggested) = self
            .controller
            .state()
            .download
            .as_ref()
            .map(|link| link.file_name.clone())
        else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(suggested)
            .save_file()
        {
            self.handle(UiAction::SaveResult(path));
        }
    }

    fn show_banner(&mut self, ctx: &egui::Context) {
        let Some(banner) = &self.banner else {
            return;
        };
        let mut dismissed = false;
        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                let prefix = if banner.is_startup_failure() {
                    "Backend unavailable:"
                } else {
                    "Error:"
                };
                ui.colored_label(
                    ui.visuals().error_fg_color,
                    format!("{prefix} {}", banner.message()),
                );
                if !banner.is_startup_failure() && ui.button("Dismiss").clicked() {
                    dismissed = true;
                }
            });
        });
        if dismissed {
            self.banner = None;
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.show_banner(ctx);

        let view = self.controller.view();
        let mut events = Vec::new();

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Spreadsheet Merger");
                ui.separator();
                ui.weak(&self.worker_status);
            });
            panels::status_bar(ui, &view, &mut events);
        });

        egui::TopBottomPanel::bottom("activity_log")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Activity log").strong());
                panels::log_panel(ui, &view.log);
            });

        egui::SidePanel::left("form_panel")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("form_scroll")
                    .show(ui, |ui| {
                        panels::files_panel(ui, &view.files, &mut events);
                        panels::options_panel(ui, &view, &mut events);
                        panels::actions_row(ui, &view.controls, &mut events);
                        ui.separator();
                        panels::mapping_panel(
                            ui,
                            &view.mapping,
                            view.controls.save_mapping,
                            &mut events,
                        );
                        ui.separator();
                        panels::cleanup_panel(ui, &view.controls, &mut events);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            panels::columns_panel(ui, &view.columns, &mut events);
            ui.separator();
            panels::preview_panel(ui, &view.preview);
        });

        for event in events {
            self.handle_panel_event(event);
        }

        // Outcomes arrive from the worker thread without waking the UI.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
