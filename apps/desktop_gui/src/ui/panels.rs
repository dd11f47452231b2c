//! Panels drawn from a [`ViewModel`]. Panels never touch controller state;
//! they report what the user did as [`PanelEvent`]s.

use client_core::{
    view::{
        ColumnChecklistView, ControlStates, FileListView, MappingPanelView, PreviewPanelView,
    },
    UiAction, ViewModel,
};
use eframe::egui;
use shared::domain::CleanupTarget;

pub enum PanelEvent {
    Action(UiAction),
    PickFiles,
    ChooseResultDestination,
}

fn section_heading(ui: &mut egui::Ui, title: &str) {
    ui.add_space(6.0);
    ui.label(egui::RichText::new(title).strong());
}

pub fn files_panel(ui: &mut egui::Ui, files: &FileListView, events: &mut Vec<PanelEvent>) {
    section_heading(ui, "Files");
    ui.horizontal_wrapped(|ui| {
        if ui.button("Add files…").clicked() {
            events.push(PanelEvent::PickFiles);
        }
        if ui.button("Select all").clicked() {
            events.push(PanelEvent::Action(UiAction::SelectAllFiles));
        }
        if ui.button("Unselect all").clicked() {
            events.push(PanelEvent::Action(UiAction::UnselectAllFiles));
        }
        if ui.button("Invert").clicked() {
            events.push(PanelEvent::Action(UiAction::InvertFileSelection));
        }
        if ui.button("Delete selected").clicked() {
            events.push(PanelEvent::Action(UiAction::DeleteSelectedFiles));
        }
        if ui.button("Clear").clicked() {
            events.push(PanelEvent::Action(UiAction::ClearFiles));
        }
    });

    egui::ScrollArea::vertical()
        .id_salt("file_list")
        .max_height(180.0)
        .show(ui, |ui| match files {
            FileListView::Empty(text) => {
                ui.weak(*text);
            }
            FileListView::Rows(rows) => {
                for row in rows {
                    let mut checked = row.checked;
                    if ui.checkbox(&mut checked, &row.label).changed() {
                        events.push(PanelEvent::Action(UiAction::ToggleFile(row.id)));
                    }
                }
            }
        });
}

pub fn options_panel(ui: &mut egui::Ui, view: &ViewModel, events: &mut Vec<PanelEvent>) {
    section_heading(ui, "Merge options");
    let options = &view.options;

    let mut normalize = options.normalize;
    if ui.checkbox(&mut normalize, "Normalize column names").changed() {
        events.push(PanelEvent::Action(UiAction::SetNormalize(normalize)));
    }
    let mut fuzzy = options.fuzzy;
    if ui.checkbox(&mut fuzzy, "Fuzzy column matching").changed() {
        events.push(PanelEvent::Action(UiAction::SetFuzzy(fuzzy)));
    }
    let mut remove_duplicates = options.remove_duplicates;
    if ui
        .checkbox(&mut remove_duplicates, "Remove duplicate rows")
        .changed()
    {
        events.push(PanelEvent::Action(UiAction::SetRemoveDuplicates(
            remove_duplicates,
        )));
    }
    let mut smart_dedup = options.smart_dedup;
    if ui.checkbox(&mut smart_dedup, "Smart deduplication").changed() {
        events.push(PanelEvent::Action(UiAction::SetSmartDedup(smart_dedup)));
    }

    ui.horizontal(|ui| {
        ui.label("Dedup keys");
        let mut keys = options.dedup_keys.clone();
        let response = ui.add(
            egui::TextEdit::singleline(&mut keys).hint_text("e.g. id, email"),
        );
        if response.changed() {
            events.push(PanelEvent::Action(UiAction::SetDedupKeys(keys)));
        }
    });

    ui.horizontal(|ui| {
        ui.label("Output");
        let mut selected = options.output_format;
        for format in &view.output_formats {
            if ui
                .radio_value(&mut selected, *format, format.as_str())
                .changed()
            {
                events.push(PanelEvent::Action(UiAction::SetOutputFormat(selected)));
            }
        }
    });
}

pub fn actions_row(ui: &mut egui::Ui, controls: &ControlStates, events: &mut Vec<PanelEvent>) {
    ui.add_space(6.0);
    ui.horizontal(|ui| {
        if ui
            .add_enabled(controls.inspect, egui::Button::new("Inspect"))
            .clicked()
        {
            events.push(PanelEvent::Action(UiAction::Inspect));
        }
        if ui
            .add_enabled(controls.merge, egui::Button::new("Merge"))
            .clicked()
        {
            events.push(PanelEvent::Action(UiAction::Merge));
        }
        if ui.button("Reset").clicked() {
            events.push(PanelEvent::Action(UiAction::Reset));
        }
    });
}

pub fn cleanup_panel(ui: &mut egui::Ui, controls: &ControlStates, events: &mut Vec<PanelEvent>) {
    section_heading(ui, "Server maintenance");
    ui.horizontal(|ui| {
        if ui
            .add_enabled(controls.cleanup_logs, egui::Button::new("Clean logs"))
            .clicked()
        {
            events.push(PanelEvent::Action(UiAction::Cleanup(CleanupTarget::Logs)));
        }
        if ui
            .add_enabled(controls.cleanup_temp, egui::Button::new("Clean temp directory"))
            .clicked()
        {
            events.push(PanelEvent::Action(UiAction::Cleanup(CleanupTarget::Temp)));
        }
    });
}

pub fn mapping_panel(
    ui: &mut egui::Ui,
    mapping: &MappingPanelView,
    save_enabled: bool,
    events: &mut Vec<PanelEvent>,
) {
    section_heading(ui, "Column mapping");
    let toggle_label = if mapping.visible {
        "Hide mapping"
    } else {
        "Edit mapping"
    };
    if ui.button(toggle_label).clicked() {
        events.push(PanelEvent::Action(UiAction::ToggleMappingPanel));
    }
    if !mapping.visible {
        return;
    }

    let mut text = mapping.text.clone();
    let response = ui.add_enabled(
        !mapping.loading,
        egui::TextEdit::multiline(&mut text)
            .code_editor()
            .desired_rows(10)
            .desired_width(f32::INFINITY),
    );
    if response.changed() {
        events.push(PanelEvent::Action(UiAction::EditMapping(text)));
    }
    ui.horizontal(|ui| {
        if ui
            .add_enabled(
                save_enabled && !mapping.loading,
                egui::Button::new("Save mapping"),
            )
            .clicked()
        {
            events.push(PanelEvent::Action(UiAction::SaveMapping));
        }
        if let Some(status) = &mapping.status {
            ui.small(status);
        }
    });
}

pub fn columns_panel(ui: &mut egui::Ui, columns: &ColumnChecklistView, events: &mut Vec<PanelEvent>) {
    section_heading(ui, "Columns (checked columns are dropped)");
    ui.horizontal(|ui| {
        if ui.button("Select all").clicked() {
            events.push(PanelEvent::Action(UiAction::SelectAllColumns));
        }
        if ui.button("Unselect all").clicked() {
            events.push(PanelEvent::Action(UiAction::UnselectAllColumns));
        }
        if ui.button("Invert").clicked() {
            events.push(PanelEvent::Action(UiAction::InvertColumnSelection));
        }
    });

    egui::ScrollArea::vertical()
        .id_salt("column_checklist")
        .max_height(220.0)
        .show(ui, |ui| match columns {
            ColumnChecklistView::Placeholder(text) => {
                ui.weak(*text);
            }
            ColumnChecklistView::Rows(rows) => {
                for row in rows {
                    ui.horizontal(|ui| {
                        let mut checked = row.checked;
                        let response =
                            ui.add_enabled(row.enabled, egui::Checkbox::new(&mut checked, &row.name));
                        if response.changed() {
                            events.push(PanelEvent::Action(UiAction::ToggleColumn(
                                row.name.clone(),
                            )));
                        }
                        let note = if row.kept {
                            format!("({}) - kept", row.sources)
                        } else {
                            format!("({})", row.sources)
                        };
                        ui.weak(note);
                    });
                }
            }
        });
}

pub fn preview_panel(ui: &mut egui::Ui, preview: &PreviewPanelView) {
    section_heading(ui, "Preview");
    egui::ScrollArea::both()
        .id_salt("preview_panel")
        .auto_shrink([false, false])
        .show(ui, |ui| match preview {
            PreviewPanelView::Placeholder(text) => {
                ui.weak(*text);
            }
            PreviewPanelView::Blocks(blocks) => {
                for block in blocks {
                    ui.label(egui::RichText::new(&block.title).strong());
                    ui.monospace(&block.header);
                    for row in &block.rows {
                        ui.monospace(row);
                    }
                    ui.add_space(10.0);
                }
            }
        });
}

pub fn status_bar(ui: &mut egui::Ui, view: &ViewModel, events: &mut Vec<PanelEvent>) {
    ui.horizontal_wrapped(|ui| {
        if let Some(status) = &view.status {
            if status.is_error {
                ui.colored_label(ui.visuals().error_fg_color, &status.text);
            } else {
                ui.label(&status.text);
            }
        }
        if let Some(link) = &view.download {
            ui.separator();
            ui.hyperlink_to("Download result", &link.url);
            if ui
                .add_enabled(view.controls.save_result, egui::Button::new("Save as…"))
                .clicked()
            {
                events.push(PanelEvent::ChooseResultDestination);
            }
        }
    });
}

pub fn log_panel(ui: &mut egui::Ui, log: &[String]) {
    egui::ScrollArea::vertical()
        .id_salt("activity_log")
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for line in log {
                ui.small(line);
            }
        });
}
