//! Import orchestration: reconcile a sheet against the backend, create
//! missing employees and upload the rows.

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::TallyClient;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{CreateEmployee, EmployeeDefaults, MissingEmployeeCandidate, UploadKind, UploadReceipt};
use crate::upload::{UploadSheet, find_missing, read_sheet};

/// A parsed sheet together with the employees it references but the
/// backend does not know.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub sheet: UploadSheet,
    pub missing: Vec<MissingEmployeeCandidate>,
}

/// Result of a finished import.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub kind: UploadKind,
    pub source: String,
    pub employees_created: usize,
    pub rows_accepted: usize,
    pub message: String,
    pub duration_secs: f64,
}

impl ImportResult {
    /// Get summary message.
    pub fn summary(&self) -> String {
        let base = format!(
            "{} upload of {}: {} rows accepted (took {:.1}s)",
            self.kind.title(),
            self.source,
            self.rows_accepted,
            self.duration_secs
        );
        if self.employees_created > 0 {
            format!("{base} - {} employees created", self.employees_created)
        } else {
            base
        }
    }
}

/// Failure of [`ImportService::create_and_resume`], by stage.
#[derive(Debug, Error)]
pub enum ResumeError {
    /// Nothing was created; the confirmed list is still valid.
    #[error("Employee creation failed: {0}")]
    Create(#[source] AppError),

    /// The employees exist now; only the upload needs retrying.
    #[error("{employees_created} employees created, but the upload failed: {error}")]
    Upload {
        employees_created: usize,
        #[source]
        error: AppError,
    },
}

/// Progress message from an import task.
#[derive(Debug)]
pub enum ImportProgress {
    Progress { percent: f32, message: String },
    /// Employees are missing; the upload waits for confirmation.
    NeedsConfirmation(ImportPlan),
    Completed(ImportResult),
    /// Confirmed employees were created but the rows were not uploaded.
    UploadFailed { employees_created: usize, error: String },
    Error(String),
}

/// Import service for orchestrating sheet uploads.
#[derive(Clone)]
pub struct ImportService {
    client: TallyClient,
    defaults: EmployeeDefaults,
}

impl ImportService {
    /// Create a new import service.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: TallyClient::new(&config.api)?,
            defaults: EmployeeDefaults::from(&config.import),
        })
    }

    /// Parse the sheet and find employees missing from the backend.
    pub async fn prepare(&self, path: PathBuf, kind: UploadKind) -> Result<ImportPlan> {
        let sheet = tokio::task::spawn_blocking(move || read_sheet(&path, kind))
            .await
            .map_err(|e| AppError::parse(format!("Task join error: {e}")))??;

        if sheet.rows.is_empty() {
            return Err(AppError::validation(format!("{} contains no data rows", sheet.source)));
        }

        let known = self.client.employee_ids().await?;
        let missing = find_missing(&sheet.rows, &known);

        info!(
            "Prepared {} upload of {}: {} rows, {} missing employees",
            kind.label(),
            sheet.source,
            sheet.rows.len(),
            missing.len()
        );

        Ok(ImportPlan { sheet, missing })
    }

    /// Upload a sheet whose employees all exist.
    pub async fn upload(&self, sheet: &UploadSheet) -> Result<UploadReceipt> {
        self.client.upload_rows(sheet.kind, &sheet.source, &sheet.rows).await
    }

    /// Create the confirmed employees, then resume the upload.
    ///
    /// Nothing is uploaded when creation fails.
    pub async fn create_and_resume<F>(
        &self,
        sheet: &UploadSheet,
        confirmed: &[MissingEmployeeCandidate],
        mut on_progress: F,
    ) -> std::result::Result<ImportResult, ResumeError>
    where
        F: FnMut(f32, &str),
    {
        let start = Instant::now();

        let payloads = create_payloads(confirmed, &self.defaults);
        on_progress(0.2, &format!("Creating {} employees...", payloads.len()));
        let created = if payloads.is_empty() {
            0
        } else {
            self.client
                .create_employees(&payloads)
                .await
                .map_err(ResumeError::Create)?
                .created
        };
        if created < payloads.len() {
            warn!("Backend created {created} of {} employees", payloads.len());
        }

        on_progress(0.6, &format!("Uploading {} rows...", sheet.rows.len()));
        let receipt = self.upload(sheet).await.map_err(|error| ResumeError::Upload {
            employees_created: created,
            error,
        })?;

        on_progress(1.0, &format!("Done! {} rows accepted", receipt.accepted));

        Ok(ImportResult {
            kind: sheet.kind,
            source: sheet.source.clone(),
            employees_created: created,
            rows_accepted: receipt.accepted,
            message: receipt.message,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Test backend connection.
    pub async fn test_connection(&self) -> Result<bool> {
        self.client.test_connection().await
    }
}

/// Creation payloads for confirmed candidates.
pub fn create_payloads(confirmed: &[MissingEmployeeCandidate], defaults: &EmployeeDefaults) -> Vec<CreateEmployee> {
    confirmed
        .iter()
        .map(|c| CreateEmployee::from_candidate(c, defaults))
        .collect()
}

/// Prepare an import in background. Uploads straight away when nothing is
/// missing, otherwise asks the UI for confirmation.
pub async fn run_prepare_background(
    service: ImportService,
    path: PathBuf,
    kind: UploadKind,
    tx: mpsc::UnboundedSender<ImportProgress>,
) {
    let start = Instant::now();
    let _ = tx.send(ImportProgress::Progress {
        percent: 0.1,
        message: "Reading sheet...".to_string(),
    });

    let plan = match service.prepare(path, kind).await {
        Ok(plan) => plan,
        Err(e) => {
            let _ = tx.send(ImportProgress::Error(e.to_string()));
            return;
        }
    };

    if !plan.missing.is_empty() {
        let _ = tx.send(ImportProgress::NeedsConfirmation(plan));
        return;
    }

    upload_and_report(&service, plan.sheet, start, &tx).await;
}

/// Upload a sheet kept after a failed upload, in background.
pub async fn run_upload_background(service: ImportService, sheet: UploadSheet, tx: mpsc::UnboundedSender<ImportProgress>) {
    upload_and_report(&service, sheet, Instant::now(), &tx).await;
}

async fn upload_and_report(
    service: &ImportService,
    sheet: UploadSheet,
    start: Instant,
    tx: &mpsc::UnboundedSender<ImportProgress>,
) {
    let _ = tx.send(ImportProgress::Progress {
        percent: 0.6,
        message: format!("Uploading {} rows...", sheet.rows.len()),
    });

    match service.upload(&sheet).await {
        Ok(receipt) => {
            let _ = tx.send(ImportProgress::Completed(ImportResult {
                kind: sheet.kind,
                source: sheet.source,
                employees_created: 0,
                rows_accepted: receipt.accepted,
                message: receipt.message,
                duration_secs: start.elapsed().as_secs_f64(),
            }));
        }
        Err(e) => {
            let _ = tx.send(ImportProgress::Error(e.to_string()));
        }
    }
}

/// Create confirmed employees and resume the upload in background.
pub async fn run_resume_background(
    service: ImportService,
    sheet: UploadSheet,
    confirmed: Vec<MissingEmployeeCandidate>,
    tx: mpsc::UnboundedSender<ImportProgress>,
) {
    let result = service
        .create_and_resume(&sheet, &confirmed, |percent, message| {
            let _ = tx.send(ImportProgress::Progress {
                percent,
                message: message.to_string(),
            });
        })
        .await;

    let message = match result {
        Ok(import_result) => ImportProgress::Completed(import_result),
        Err(ResumeError::Upload {
            employees_created,
            error,
        }) => ImportProgress::UploadFailed {
            employees_created,
            error: error.to_string(),
        },
        Err(e) => ImportProgress::Error(e.to_string()),
    };
    let _ = tx.send(message);
}
