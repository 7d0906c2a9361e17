//! Import panel: sheet selection, upload control, and activity log.

use std::collections::HashSet;

use eframe::egui::{self, Color32, ProgressBar, RichText, ScrollArea, Ui};
use egui_phosphor::regular::{ARROW_CLOCKWISE, ARROWS_CLOCKWISE, FOLDER_OPEN, PLUGS_CONNECTED, TRASH, UPLOAD_SIMPLE};

use super::app::{App, ConnectionStatus, ImportState, LogLevel};
use super::components::{colors, panel_header, primary_button_with_icon, section_frame, styled_button_with_icon};
use crate::models::UploadKind;

/// Show the import panel.
pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Upload Sheet");

    ui.columns(2, |columns| {
        show_upload_control(app, &mut columns[0]);
        show_backend_info(app, &mut columns[1]);
    });

    ui.add_space(20.0);

    show_log_viewer(app, ui);
}

fn show_upload_control(app: &mut App, ui: &mut Ui) {
    section_frame(ui, |ui| {
        ui.label(RichText::new("Sheet").strong());
        ui.add_space(10.0);

        let locked = app.import_state.is_busy() || app.reconciliation.is_some();

        ui.horizontal(|ui| {
            ui.label("Type:");
            for kind in [UploadKind::Attendance, UploadKind::Salary] {
                let selected = app.upload_kind == kind;
                if ui
                    .add_enabled(!locked, egui::Button::selectable(selected, kind.title()))
                    .clicked()
                {
                    app.upload_kind = kind;
                }
            }
        });

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!locked, egui::Button::new(format!("{FOLDER_OPEN} Choose File...")))
                .clicked()
            {
                app.pick_file();
            }
            match &app.selected_file {
                Some(path) => {
                    ui.label(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
                }
                None => {
                    ui.weak("No file selected");
                }
            }
        });

        ui.add_space(12.0);

        ui.horizontal(|ui| {
            if primary_button_with_icon(ui, UPLOAD_SIMPLE, "Start Upload", app.can_start_import()).clicked() {
                app.start_import();
            }

            // Re-run detection while the confirmation window is open
            let can_recheck = matches!(app.import_state, ImportState::AwaitingConfirmation)
                && app.reconciliation.as_ref().is_some_and(|d| !d.is_submitting());
            if can_recheck && styled_button_with_icon(ui, ARROWS_CLOCKWISE, "Re-check Employees").clicked() {
                app.start_import();
            }

            if app.can_retry_upload() && styled_button_with_icon(ui, ARROW_CLOCKWISE, "Retry Upload").clicked() {
                app.retry_upload();
            }
        });

        ui.add_space(12.0);

        match &app.import_state {
            ImportState::Idle => {
                ui.weak("Ready");
            }
            ImportState::InProgress { progress, message } => {
                ui.add(ProgressBar::new(*progress).text(message).animate(true));
            }
            ImportState::AwaitingConfirmation => {
                ui.colored_label(colors::WARNING, "Waiting for missing employees to be confirmed");
            }
            ImportState::Completed => {
                if let Some(result) = &app.last_result {
                    ui.colored_label(colors::SUCCESS, result.summary());
                }
            }
            ImportState::UploadFailed(e) => {
                ui.colored_label(colors::ERROR, format!("Upload failed: {e}"));
                ui.weak("Employees were created; retrying sends the rows only.");
            }
            ImportState::Error(e) => {
                ui.colored_label(colors::ERROR, format!("Failed: {e}"));
            }
        }
    });
}

fn show_backend_info(app: &mut App, ui: &mut Ui) {
    section_frame(ui, |ui| {
        ui.label(RichText::new("Backend").strong());
        ui.add_space(10.0);

        egui::Grid::new("backend_info_grid")
            .num_columns(2)
            .spacing([20.0, 6.0])
            .show(ui, |ui| {
                ui.label("API URL:");
                ui.label(&app.config.api.base_url);
                ui.end_row();

                ui.label("Token:");
                ui.label(if app.config.api.token.is_empty() { "Not set" } else { "Configured" });
                ui.end_row();

                ui.label("Default shift:");
                ui.label(format!(
                    "{} - {}",
                    app.config.import.shift_start_time, app.config.import.shift_end_time
                ));
                ui.end_row();

                ui.label("Status:");
                let (color, text) = match app.connection_status {
                    ConnectionStatus::Unknown => (colors::NEUTRAL, "Not checked"),
                    ConnectionStatus::Testing => (colors::WARNING, "Checking..."),
                    ConnectionStatus::Connected => (colors::SUCCESS, "Connected"),
                    ConnectionStatus::Error => (colors::ERROR, "Unreachable"),
                };
                ui.colored_label(color, text);
                ui.end_row();
            });

        ui.add_space(10.0);

        let testing = app.connection_status == ConnectionStatus::Testing;
        if ui
            .add_enabled(!testing, egui::Button::new(format!("{PLUGS_CONNECTED} Test Connection")))
            .clicked()
        {
            app.test_connection();
        }
    });
}

fn show_log_viewer(app: &mut App, ui: &mut Ui) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("Activity Log").strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if styled_button_with_icon(ui, TRASH, "Clear").clicked() {
                app.clear_log();
            }
        });
    });

    ui.add_space(6.0);

    // Repeated messages are collapsed to their latest occurrence
    let mut seen = HashSet::new();
    let entries: Vec<_> = app
        .log_messages
        .iter()
        .rev()
        .filter(|entry| seen.insert(entry.message.as_str()))
        .collect();

    ScrollArea::vertical()
        .id_salt("activity_log_scroll")
        .max_height(ui.available_height())
        .show(ui, |ui| {
            if entries.is_empty() {
                ui.weak("No activity yet");
            }
            for entry in entries {
                let color = match entry.level {
                    LogLevel::Info => ui.visuals().text_color(),
                    LogLevel::Success => colors::SUCCESS,
                    LogLevel::Warning => colors::WARNING,
                    LogLevel::Error => colors::ERROR,
                };
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(entry.timestamp.format("%H:%M:%S").to_string())
                            .monospace()
                            .color(Color32::GRAY),
                    );
                    ui.colored_label(color, &entry.message);
                });
            }
        });
}
