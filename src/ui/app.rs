//! Main application state.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use eframe::egui::{self, Align, Layout, ProgressBar};
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::export;
use crate::import::{
    ImportProgress, ImportResult, ImportService, run_prepare_background, run_resume_background, run_upload_background,
};
use crate::models::{MissingEmployeeCandidate, UploadKind};
use crate::reconcile::ReconciliationDialog;
use crate::upload::UploadSheet;

use super::components::colors;
use super::{import_panel, missing_employees};

/// Backend connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Testing,
    Connected,
    Error,
}

/// Import operation state.
#[derive(Debug, Clone, Default)]
pub enum ImportState {
    #[default]
    Idle,
    InProgress {
        progress: f32,
        message: String,
    },
    /// Waiting for the operator to confirm missing employees.
    AwaitingConfirmation,
    Completed,
    /// Employees exist but the rows were not uploaded; the sheet is kept
    /// for a retry.
    UploadFailed(String),
    Error(String),
}

impl ImportState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ImportState::InProgress { .. })
    }
}

/// Log level for UI messages.
#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Log entry for display in the UI.
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub level: LogLevel,
}

/// Main application state.
pub struct App {
    // Runtime and backend
    pub rt: tokio::runtime::Runtime,
    pub config: AppConfig,
    service: Option<ImportService>,

    // Import selection
    pub upload_kind: UploadKind,
    pub selected_file: Option<PathBuf>,

    // Import state
    pub import_state: ImportState,
    pub last_result: Option<ImportResult>,
    import_rx: Option<mpsc::UnboundedReceiver<ImportProgress>>,
    pending_sheet: Option<UploadSheet>,
    pub reconciliation: Option<ReconciliationDialog>,

    // Connection test
    pub connection_status: ConnectionStatus,
    connection_rx: Option<mpsc::UnboundedReceiver<bool>>,

    // Log messages
    pub log_messages: Vec<LogEntry>,

    // Dialogs
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl App {
    pub fn new(config: AppConfig, rt: tokio::runtime::Runtime) -> Self {
        let service = match ImportService::new(&config) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::error!("Failed to create backend client: {}", e);
                None
            }
        };

        let mut app = Self {
            rt,
            upload_kind: config.import.default_kind,
            config,
            service,
            selected_file: None,
            import_state: ImportState::default(),
            last_result: None,
            import_rx: None,
            pending_sheet: None,
            reconciliation: None,
            connection_status: ConnectionStatus::default(),
            connection_rx: None,
            log_messages: Vec::new(),
            error_message: None,
            success_message: None,
        };

        if app.service.is_none() {
            app.error_message = Some("Backend client could not be created; check the API settings".to_string());
        } else {
            app.test_connection();
        }

        app
    }

    /// Log a message to the UI log.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log_messages.push(LogEntry {
            timestamp: Local::now(),
            message: message.into(),
            level,
        });

        // Keep only last 100 messages
        if self.log_messages.len() > 100 {
            self.log_messages.remove(0);
        }
    }

    /// Log an info message.
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Log a success message.
    pub fn log_success(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    /// Log a warning message.
    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Log an error message.
    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Clear the activity log.
    pub fn clear_log(&mut self) {
        self.log_messages.clear();
    }

    /// Let the operator pick a sheet.
    pub fn pick_file(&mut self) {
        if let Some(path) = export::show_open_dialog() {
            self.log_info(format!("Selected {}", path.display()));
            self.selected_file = Some(path);
            self.last_result = None;
        }
    }

    /// Whether a new import may start.
    pub fn can_start_import(&self) -> bool {
        self.selected_file.is_some() && !self.import_state.is_busy() && self.reconciliation.is_none()
    }

    /// Parse the selected sheet and reconcile it against the backend.
    ///
    /// Also used to re-check while the confirmation window is open; chosen
    /// joining dates survive the refresh.
    pub fn start_import(&mut self) {
        let Some(service) = self.service.clone() else {
            self.error_message = Some("Backend client is not configured".to_string());
            return;
        };
        let Some(path) = self.selected_file.clone() else {
            return;
        };
        if self
            .reconciliation
            .as_ref()
            .is_some_and(ReconciliationDialog::is_submitting)
        {
            return;
        }

        if self.reconciliation.is_none() {
            self.pending_sheet = None;
        }

        let kind = self.upload_kind;
        self.log_info(format!("Checking {} sheet {}", kind.label(), path.display()));
        tracing::info!("Starting {} import from {:?}", kind.label(), path);

        let (tx, rx) = mpsc::unbounded_channel();
        self.import_rx = Some(rx);
        self.import_state = ImportState::InProgress {
            progress: 0.0,
            message: "Starting...".to_string(),
        };

        self.rt.spawn(run_prepare_background(service, path, kind, tx));
    }

    /// Create the confirmed employees and resume the upload.
    fn resume_import(&mut self, confirmed: Vec<MissingEmployeeCandidate>) {
        let (Some(service), Some(sheet)) = (self.service.clone(), self.pending_sheet.clone()) else {
            if let Some(dialog) = &mut self.reconciliation {
                dialog.finish_confirm();
            }
            self.error_message = Some("No upload is waiting for confirmation".to_string());
            return;
        };

        let dated = confirmed.iter().filter(|c| c.date_of_joining.is_some()).count();
        self.log_info(format!(
            "Creating {} employees ({} with joining date)",
            confirmed.len(),
            dated
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        self.import_rx = Some(rx);
        self.import_state = ImportState::InProgress {
            progress: 0.0,
            message: "Creating employees...".to_string(),
        };

        self.rt.spawn(run_resume_background(service, sheet, confirmed, tx));
    }

    /// Whether a kept sheet can be uploaded again.
    pub fn can_retry_upload(&self) -> bool {
        matches!(self.import_state, ImportState::UploadFailed(_)) && self.pending_sheet.is_some()
    }

    /// Upload the kept sheet again without creating employees.
    pub fn retry_upload(&mut self) {
        if !self.can_retry_upload() {
            return;
        }
        let (Some(service), Some(sheet)) = (self.service.clone(), self.pending_sheet.clone()) else {
            return;
        };

        self.log_info(format!("Retrying upload of {}", sheet.source));
        let (tx, rx) = mpsc::unbounded_channel();
        self.import_rx = Some(rx);
        self.import_state = ImportState::InProgress {
            progress: 0.0,
            message: "Uploading...".to_string(),
        };

        self.rt.spawn(run_upload_background(service, sheet, tx));
    }

    /// Drop the pending upload after the operator cancelled.
    fn cancel_import(&mut self) {
        self.reconciliation = None;
        self.pending_sheet = None;
        self.import_state = ImportState::Idle;
        self.log_warning("Upload cancelled; missing employees were not created");
    }

    /// Export the missing-employee list to Excel.
    fn export_candidates(&mut self, candidates: &[MissingEmployeeCandidate]) {
        let default_name = export::generate_export_filename(&format!("missing_{}", self.upload_kind.label()));
        let Some(path) = export::show_save_dialog(&default_name) else {
            return;
        };

        match export::export_candidates_to_excel(candidates, &path) {
            Ok(()) => {
                self.success_message = Some(format!("Exported to: {}", path.display()));
                self.log_success(format!("Exported missing employees: {}", path.display()));
            }
            Err(e) => {
                self.error_message = Some(e.to_string());
                self.log_error(e.to_string());
            }
        }
    }

    /// Test backend connection.
    pub fn test_connection(&mut self) {
        let Some(service) = self.service.clone() else {
            self.connection_status = ConnectionStatus::Error;
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.connection_rx = Some(rx);
        self.connection_status = ConnectionStatus::Testing;

        self.rt.spawn(async move {
            let ok = service.test_connection().await.unwrap_or(false);
            let _ = tx.send(ok);
        });
    }

    /// Apply one import progress message.
    fn handle_import_progress(&mut self, progress: ImportProgress) -> bool {
        match progress {
            ImportProgress::Progress { percent, message } => {
                self.import_state = ImportState::InProgress {
                    progress: percent,
                    message,
                };
                false
            }
            ImportProgress::NeedsConfirmation(plan) => {
                let count = plan.missing.len();
                let kind = plan.sheet.kind;
                // A re-check of the same upload keeps the operator's dates.
                match self.reconciliation.as_mut().filter(|d| d.upload_kind() == kind) {
                    Some(dialog) => dialog.set_candidates(plan.missing),
                    None => self.reconciliation = Some(ReconciliationDialog::new(kind, plan.missing)),
                }
                self.pending_sheet = Some(plan.sheet);
                self.import_state = ImportState::AwaitingConfirmation;
                self.log_warning(format!("{count} employees in the sheet do not exist yet"));
                true
            }
            ImportProgress::Completed(result) => {
                tracing::info!("{}", result.summary());
                self.log_success(result.summary());
                self.success_message = Some(if result.message.is_empty() {
                    result.summary()
                } else {
                    format!("{}\n{}", result.summary(), result.message)
                });
                self.reconciliation = None;
                self.pending_sheet = None;
                self.import_state = ImportState::Completed;
                self.last_result = Some(result);
                true
            }
            ImportProgress::UploadFailed {
                employees_created,
                error,
            } => {
                tracing::error!("Upload failed after creating {} employees: {}", employees_created, error);
                self.log_success(format!("{employees_created} employees created"));
                self.log_error(format!("Upload failed: {error}"));
                self.error_message = Some(format!(
                    "{employees_created} employees were created, but the upload failed:\n{error}\n\nUse Retry Upload to send the rows again."
                ));
                // The candidates exist now; only the sheet is kept.
                self.reconciliation = None;
                self.import_state = ImportState::UploadFailed(error);
                true
            }
            ImportProgress::Error(e) => {
                tracing::error!("Import failed: {}", e);
                self.log_error(format!("Import failed: {}", e));
                self.error_message = Some(e.clone());
                // A failed confirmation leaves the window open with its dates.
                match &mut self.reconciliation {
                    Some(dialog) => {
                        dialog.finish_confirm();
                        self.import_state = ImportState::AwaitingConfirmation;
                    }
                    None if self.pending_sheet.is_some() => self.import_state = ImportState::UploadFailed(e),
                    None => self.import_state = ImportState::Error(e),
                }
                true
            }
        }
    }

    /// Poll async operation results.
    fn poll_async_results(&mut self) {
        if let Some(mut rx) = self.import_rx.take() {
            let mut done = false;
            loop {
                match rx.try_recv() {
                    Ok(progress) => {
                        if self.handle_import_progress(progress) {
                            done = true;
                            break;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        // Task ended without a final message
                        self.handle_import_progress(ImportProgress::Error("Import task stopped unexpectedly".to_string()));
                        done = true;
                        break;
                    }
                }
            }
            if !done {
                self.import_rx = Some(rx);
            }
        }

        if let Some(mut rx) = self.connection_rx.take() {
            match rx.try_recv() {
                Ok(ok) => {
                    self.connection_status = if ok {
                        ConnectionStatus::Connected
                    } else {
                        ConnectionStatus::Error
                    };
                    if ok {
                        self.log_success("Backend connection successful");
                    } else {
                        self.log_error("Backend connection failed");
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => {
                    self.connection_rx = Some(rx);
                }
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.connection_status = ConnectionStatus::Error;
                }
            }
        }
    }

    /// Render menu bar.
    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    let idle = !self.import_state.is_busy() && self.reconciliation.is_none();
                    if ui.add_enabled(idle, egui::Button::new("Open Sheet...")).clicked() {
                        self.pick_file();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });
                ui.menu_button("Tools", |ui| {
                    let enabled = self.connection_status != ConnectionStatus::Testing;
                    if ui.add_enabled(enabled, egui::Button::new("Test Connection")).clicked() {
                        self.test_connection();
                        ui.close();
                    }
                    if ui.button("Clear Log").clicked() {
                        self.clear_log();
                        ui.close();
                    }
                });
            });
        });
    }

    /// Render status bar (display only, no interaction).
    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .min_height(28.0)
            .show(ctx, |ui| {
                ui.disable();
                ui.horizontal(|ui| {
                    let (color, text) = match self.connection_status {
                        ConnectionStatus::Unknown => (colors::NEUTRAL, "Not checked"),
                        ConnectionStatus::Testing => (colors::WARNING, "Checking..."),
                        ConnectionStatus::Connected => (colors::SUCCESS, "Connected"),
                        ConnectionStatus::Error => (colors::ERROR, "Unreachable"),
                    };

                    if matches!(self.connection_status, ConnectionStatus::Testing) {
                        ui.spinner();
                    }
                    ui.colored_label(color, format!("Backend: {}", text));

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let ImportState::InProgress { progress, message } = &self.import_state {
                            ui.add(
                                ProgressBar::new(*progress)
                                    .desired_width(250.0)
                                    .text(message)
                                    .animate(true),
                            );
                        }
                    });
                });
            });
    }

    /// Render modal dialogs (error, success).
    fn show_dialogs(&mut self, ctx: &egui::Context) {
        // Error dialog
        if let Some(ref error) = self.error_message.clone() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_TOP, [0.0, 40.0])
                .show(ctx, |ui| {
                    ui.colored_label(colors::ERROR, error);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.error_message = None;
                    }
                });
        }

        // Success dialog
        if let Some(ref msg) = self.success_message.clone() {
            egui::Window::new("Success")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_TOP, [0.0, 40.0])
                .show(ctx, |ui| {
                    ui.colored_label(colors::SUCCESS, msg);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.success_message = None;
                    }
                });
        }
    }

    /// Render the missing-employee window and act on its result.
    fn show_reconciliation(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &mut self.reconciliation else {
            return;
        };

        match missing_employees::show(dialog, ctx) {
            missing_employees::Action::None => {}
            missing_employees::Action::Confirm(confirmed) => self.resume_import(confirmed),
            missing_employees::Action::Cancel => self.cancel_import(),
            missing_employees::Action::Export(candidates) => self.export_candidates(&candidates),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll async results
        self.poll_async_results();

        // Request repaint during async operations
        if self.import_state.is_busy() || matches!(self.connection_status, ConnectionStatus::Testing) {
            ctx.request_repaint();
        }

        // Menu bar
        self.show_menu_bar(ctx);

        // Status bar
        self.show_status_bar(ctx);

        // Main content
        egui::CentralPanel::default().show(ctx, |ui| {
            import_panel::show(self, ui);
        });

        // Missing-employee confirmation
        self.show_reconciliation(ctx);

        // Modal dialogs (error, success)
        self.show_dialogs(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportPlan;
    use crate::upload::{find_missing, parse_sheet};
    use chrono::NaiveDate;

    fn app() -> App {
        let rt = tokio::runtime::Runtime::new().unwrap();
        App::new(AppConfig::default(), rt)
    }

    fn plan() -> ImportPlan {
        let sheet = parse_sheet(
            "Employee ID,Name\nE-1,Anil Mehta\nE-2,Sara Khan\n",
            UploadKind::Attendance,
            "march.csv",
        )
        .unwrap();
        let missing = find_missing(&sheet.rows, &["E-1".to_string()].into_iter().collect());
        ImportPlan { sheet, missing }
    }

    fn awaiting_confirmation() -> App {
        let mut app = app();
        app.handle_import_progress(ImportProgress::NeedsConfirmation(plan()));
        let dialog = app.reconciliation.as_mut().unwrap();
        dialog.set_date("E-2", NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert!(dialog.begin_confirm().is_some());
        app
    }

    #[test]
    fn test_upload_failure_after_creation_drops_dialog_keeps_sheet() {
        let mut app = awaiting_confirmation();

        app.handle_import_progress(ImportProgress::UploadFailed {
            employees_created: 1,
            error: "API error (502): Bad Gateway".to_string(),
        });

        assert!(app.reconciliation.is_none());
        assert!(app.pending_sheet.is_some());
        assert!(matches!(app.import_state, ImportState::UploadFailed(_)));
        assert!(app.can_retry_upload());
    }

    #[test]
    fn test_creation_failure_keeps_dialog_and_dates() {
        let mut app = awaiting_confirmation();

        app.handle_import_progress(ImportProgress::Error("Employee creation failed".to_string()));

        let dialog = app.reconciliation.as_ref().unwrap();
        assert!(!dialog.is_submitting());
        assert_eq!(dialog.pending_date("E-2"), NaiveDate::from_ymd_opt(2025, 3, 3));
        assert!(matches!(app.import_state, ImportState::AwaitingConfirmation));
        assert!(!app.can_retry_upload());
    }

    #[test]
    fn test_failed_retry_keeps_sheet_for_another_retry() {
        let mut app = awaiting_confirmation();
        app.handle_import_progress(ImportProgress::UploadFailed {
            employees_created: 1,
            error: "timeout".to_string(),
        });

        app.handle_import_progress(ImportProgress::Error("timeout again".to_string()));

        assert!(app.can_retry_upload());
    }

    #[test]
    fn test_recheck_keeps_dates() {
        let mut app = app();
        app.handle_import_progress(ImportProgress::NeedsConfirmation(plan()));
        app.reconciliation
            .as_mut()
            .unwrap()
            .set_date("E-2", NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());

        app.handle_import_progress(ImportProgress::NeedsConfirmation(plan()));

        let dialog = app.reconciliation.as_ref().unwrap();
        assert_eq!(dialog.pending_date("E-2"), NaiveDate::from_ymd_opt(2025, 3, 3));
    }
}
