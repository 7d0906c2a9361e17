//! First-run setup wizard: backend connection and import defaults.

use std::path::PathBuf;

use eframe::egui::{self, RichText, Ui};
use egui_phosphor::regular::{CARET_LEFT, CARET_RIGHT, FLOPPY_DISK, PLUGS_CONNECTED};
use tokio::sync::mpsc;

use super::components::{colors, primary_button_with_icon, styled_button_with_icon};
use crate::client::TallyClient;
use crate::config::{AppConfig, parse_shift_time};
use crate::models::UploadKind;

/// Wizard pages in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    Welcome,
    Backend,
    ImportDefaults,
    Review,
}

impl WizardStep {
    const ALL: [WizardStep; 4] = [Self::Welcome, Self::Backend, Self::ImportDefaults, Self::Review];

    fn title(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Backend => "Backend Connection",
            Self::ImportDefaults => "Import Defaults",
            Self::Review => "Review",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

/// Outcome of the backend check.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectionCheck {
    #[default]
    Unchecked,
    Checking,
    Reachable,
    Failed(String),
}

/// Setup wizard state.
#[derive(Debug)]
pub struct SetupWizard {
    pub step: WizardStep,
    pub config: AppConfig,
    pub check: ConnectionCheck,
    timeout_input: String,
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupWizard {
    pub fn new() -> Self {
        let config = AppConfig::default();
        Self {
            step: WizardStep::default(),
            timeout_input: config.api.timeout_secs.to_string(),
            config,
            check: ConnectionCheck::default(),
        }
    }

    /// Problem blocking the current page, if any.
    pub fn blocker(&self) -> Option<String> {
        match self.step {
            WizardStep::Welcome | WizardStep::Review => None,
            WizardStep::Backend => {
                if self.timeout_input.trim().parse::<u64>().is_err() {
                    Some("Timeout must be a whole number of seconds".to_string())
                } else if self.check != ConnectionCheck::Reachable {
                    Some("Test the connection before continuing".to_string())
                } else {
                    None
                }
            }
            WizardStep::ImportDefaults => {
                let import = &self.config.import;
                if parse_shift_time(&import.shift_start_time).is_none() {
                    Some("Shift start must be HH:MM".to_string())
                } else if parse_shift_time(&import.shift_end_time).is_none() {
                    Some("Shift end must be HH:MM".to_string())
                } else {
                    self.config.validate().err().map(|e| e.to_string())
                }
            }
        }
    }

    /// Move forward when the current page allows it.
    pub fn advance(&mut self) {
        if self.blocker().is_none()
            && let Some(next) = self.step.next()
        {
            self.step = next;
        }
    }

    pub fn back(&mut self) {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
    }

    /// Any edit to the backend settings invalidates an earlier check.
    fn backend_edited(&mut self) {
        if let Ok(secs) = self.timeout_input.trim().parse() {
            self.config.api.timeout_secs = secs;
        }
        self.check = ConnectionCheck::Unchecked;
    }
}

/// eframe app hosting the wizard.
pub struct SetupApp {
    wizard: SetupWizard,
    error: Option<String>,
    rt: tokio::runtime::Runtime,
    config_path: PathBuf,
    check_rx: Option<mpsc::UnboundedReceiver<Result<(), String>>>,
}

impl SetupApp {
    pub fn new(
        wizard: SetupWizard,
        initial_error: Option<String>,
        config_path: PathBuf,
        rt: tokio::runtime::Runtime,
    ) -> Self {
        Self {
            wizard,
            error: initial_error,
            rt,
            config_path,
            check_rx: None,
        }
    }

    fn start_check(&mut self) {
        let api = self.wizard.config.api.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        self.check_rx = Some(rx);
        self.wizard.check = ConnectionCheck::Checking;

        self.rt.spawn(async move {
            let result = match TallyClient::new(&api) {
                Ok(client) => match client.test_connection().await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("Backend answered with an error status".to_string()),
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(result);
        });
    }

    fn poll_check(&mut self) {
        let Some(rx) = &mut self.check_rx else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(Ok(())) => ConnectionCheck::Reachable,
            Ok(Err(e)) => ConnectionCheck::Failed(e),
            Err(mpsc::error::TryRecvError::Empty) => return,
            Err(mpsc::error::TryRecvError::Disconnected) => ConnectionCheck::Failed("Check was interrupted".to_string()),
        };
        self.wizard.check = outcome;
        self.check_rx = None;
    }

    fn save(&mut self, ctx: &egui::Context) {
        match self.wizard.config.save(&self.config_path) {
            Ok(()) => {
                tracing::info!("Config saved to {:?}", self.config_path);
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            Err(e) => self.error = Some(format!("Failed to save config: {e}")),
        }
    }
}

impl eframe::App for SetupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_check();
        if self.wizard.check == ConnectionCheck::Checking {
            ctx.request_repaint();
        }

        if let Some(err) = self.error.clone() {
            egui::Window::new("Configuration Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.colored_label(colors::ERROR, &err);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.error = None;
                    }
                });
            return;
        }

        let mut wants_check = false;
        let mut wants_save = false;

        egui::TopBottomPanel::bottom("wizard_nav").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if self.wizard.step.prev().is_some() && styled_button_with_icon(ui, CARET_LEFT, "Back").clicked() {
                    self.wizard.back();
                }
                if let Some(blocker) = self.wizard.blocker() {
                    ui.colored_label(colors::WARNING, blocker);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.wizard.step == WizardStep::Review {
                        wants_save = primary_button_with_icon(ui, FLOPPY_DISK, "Save", true).clicked();
                    } else {
                        let ready = self.wizard.blocker().is_none();
                        if primary_button_with_icon(ui, CARET_RIGHT, "Next", ready).clicked() {
                            self.wizard.advance();
                        }
                    }
                });
            });
            ui.add_space(8.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new(self.wizard.step.title()).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(format!(
                        "Step {} of {}",
                        self.wizard.step.index() + 1,
                        WizardStep::ALL.len()
                    ));
                });
            });
            ui.separator();
            ui.add_space(12.0);

            match self.wizard.step {
                WizardStep::Welcome => show_welcome(ui),
                WizardStep::Backend => wants_check = show_backend(ui, &mut self.wizard),
                WizardStep::ImportDefaults => show_import_defaults(ui, &mut self.wizard.config),
                WizardStep::Review => show_review(ui, &self.wizard.config, &self.config_path),
            }
        });

        if wants_check {
            self.start_check();
        }
        if wants_save {
            self.save(ctx);
        }
    }
}

fn show_welcome(ui: &mut Ui) {
    ui.label("Tally Import uploads attendance and salary sheets to the tally backend.");
    ui.add_space(8.0);
    ui.label("Have the backend URL and your organization's API token ready.");
}

/// Returns true when the operator asked for a connection check.
fn show_backend(ui: &mut Ui, wizard: &mut SetupWizard) -> bool {
    let mut edited = false;

    egui::Grid::new("wizard_backend_grid")
        .num_columns(2)
        .spacing([20.0, 8.0])
        .show(ui, |ui| {
            ui.label("Backend URL:");
            edited |= ui.text_edit_singleline(&mut wizard.config.api.base_url).changed();
            ui.end_row();

            ui.label("API token:");
            edited |= ui
                .add(egui::TextEdit::singleline(&mut wizard.config.api.token).password(true))
                .changed();
            ui.end_row();

            ui.label("Timeout (seconds):");
            edited |= ui.text_edit_singleline(&mut wizard.timeout_input).changed();
            ui.end_row();
        });

    if edited {
        wizard.backend_edited();
    }

    ui.add_space(16.0);

    let mut wants_check = false;
    ui.horizontal(|ui| {
        let checking = wizard.check == ConnectionCheck::Checking;
        wants_check = primary_button_with_icon(ui, PLUGS_CONNECTED, "Test Connection", !checking).clicked();

        match &wizard.check {
            ConnectionCheck::Unchecked => {
                ui.weak("Not tested");
            }
            ConnectionCheck::Checking => {
                ui.spinner();
            }
            ConnectionCheck::Reachable => {
                ui.colored_label(colors::SUCCESS, "Backend reachable");
            }
            ConnectionCheck::Failed(e) => {
                ui.colored_label(colors::ERROR, e);
            }
        }
    });

    wants_check
}

fn show_import_defaults(ui: &mut Ui, config: &mut AppConfig) {
    ui.label("Applied to employees created while confirming an upload.");
    ui.add_space(10.0);

    egui::Grid::new("wizard_import_grid")
        .num_columns(2)
        .spacing([20.0, 8.0])
        .show(ui, |ui| {
            ui.label("Default sheet type:");
            ui.horizontal(|ui| {
                for kind in [UploadKind::Attendance, UploadKind::Salary] {
                    ui.radio_value(&mut config.import.default_kind, kind, kind.title());
                }
            });
            ui.end_row();

            ui.label("Shift start (HH:MM):");
            ui.text_edit_singleline(&mut config.import.shift_start_time);
            ui.end_row();

            ui.label("Shift end (HH:MM):");
            ui.text_edit_singleline(&mut config.import.shift_end_time);
            ui.end_row();

            ui.label("Log file:");
            ui.checkbox(&mut config.ui.log_to_file, "Keep daily log files");
            ui.end_row();
        });
}

fn show_review(ui: &mut Ui, config: &AppConfig, path: &std::path::Path) {
    egui::Grid::new("wizard_review_grid")
        .num_columns(2)
        .spacing([20.0, 6.0])
        .striped(true)
        .show(ui, |ui| {
            let token = if config.api.token.is_empty() { "not set" } else { "set" };
            let shift = format!("{} - {}", config.import.shift_start_time, config.import.shift_end_time);
            let rows = [
                ("Backend", config.api.base_url.clone()),
                ("Token", token.to_string()),
                ("Timeout", format!("{}s", config.api.timeout_secs)),
                ("Sheet type", config.import.default_kind.title().to_string()),
                ("Shift", shift),
                ("Config file", path.display().to_string()),
            ];
            for (label, value) in rows {
                ui.label(label);
                ui.label(value);
                ui.end_row();
            }
        });

    ui.add_space(16.0);
    ui.label("Saving closes the wizard; start Tally Import again to begin uploading.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_walk_in_order() {
        assert_eq!(WizardStep::Welcome.next(), Some(WizardStep::Backend));
        assert_eq!(WizardStep::Review.next(), None);
        assert_eq!(WizardStep::Welcome.prev(), None);
        assert_eq!(WizardStep::Review.prev(), Some(WizardStep::ImportDefaults));
    }

    #[test]
    fn test_backend_step_requires_reachable_backend() {
        let mut wizard = SetupWizard::new();
        wizard.advance();
        assert_eq!(wizard.step, WizardStep::Backend);

        wizard.advance();
        assert_eq!(wizard.step, WizardStep::Backend);

        wizard.check = ConnectionCheck::Failed("refused".to_string());
        assert!(wizard.blocker().is_some());

        wizard.check = ConnectionCheck::Reachable;
        wizard.advance();
        assert_eq!(wizard.step, WizardStep::ImportDefaults);
    }

    #[test]
    fn test_editing_backend_resets_check() {
        let mut wizard = SetupWizard::new();
        wizard.check = ConnectionCheck::Reachable;
        wizard.timeout_input = "45".to_string();

        wizard.backend_edited();

        assert_eq!(wizard.check, ConnectionCheck::Unchecked);
        assert_eq!(wizard.config.api.timeout_secs, 45);
    }

    #[test]
    fn test_bad_timeout_blocks_backend_step() {
        let mut wizard = SetupWizard::new();
        wizard.step = WizardStep::Backend;
        wizard.check = ConnectionCheck::Reachable;
        wizard.timeout_input = "soon".to_string();

        assert!(wizard.blocker().unwrap().contains("Timeout"));
    }

    #[test]
    fn test_import_step_validates_shift_times() {
        let mut wizard = SetupWizard::new();
        wizard.step = WizardStep::ImportDefaults;
        assert!(wizard.blocker().is_none());

        wizard.config.import.shift_end_time = "6pm".to_string();
        assert!(wizard.blocker().is_some());
    }
}
