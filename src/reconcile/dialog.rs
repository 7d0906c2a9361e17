//! State of the missing-employee confirmation dialog.

use std::future::Future;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::dates::{PendingDates, merge_pending_dates};
use crate::models::{MissingEmployeeCandidate, UploadKind};

/// Screen rectangle a date picker popup is anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub top: f32,
    pub left: f32,
    pub width: f32,
}

/// The single open date picker.
#[derive(Debug, Clone, PartialEq)]
pub struct DateEditor {
    pub employee_id: String,
    pub anchor: Anchor,
}

/// One rendered row of the dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRow<'a> {
    pub row_number: usize,
    pub employee_id: &'a str,
    pub name: &'a str,
    pub department: &'a str,
    pub date_of_joining: Option<NaiveDate>,
}

/// Resets the submitting flag on every exit path of [`ReconciliationDialog::confirm`].
struct SubmitGuard<'a> {
    flag: &'a mut bool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

/// Confirmation dialog for employees referenced by an upload but missing
/// from the system.
///
/// The candidate list is never mutated in place: confirmation hands out an
/// annotated copy carrying the chosen joining dates.
#[derive(Debug)]
pub struct ReconciliationDialog {
    candidates: Vec<MissingEmployeeCandidate>,
    upload_kind: UploadKind,
    is_submitting: bool,
    pending_dates: PendingDates,
    active_editor: Option<DateEditor>,
}

impl ReconciliationDialog {
    pub fn new(upload_kind: UploadKind, candidates: Vec<MissingEmployeeCandidate>) -> Self {
        let mut dialog = Self {
            candidates: Vec::new(),
            upload_kind,
            is_submitting: false,
            pending_dates: PendingDates::new(),
            active_editor: None,
        };
        dialog.set_candidates(candidates);
        dialog
    }

    pub fn candidates(&self) -> &[MissingEmployeeCandidate] {
        &self.candidates
    }

    pub fn upload_kind(&self) -> UploadKind {
        self.upload_kind
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn active_editor(&self) -> Option<&DateEditor> {
        self.active_editor.as_ref()
    }

    /// Date currently chosen for a candidate.
    pub fn pending_date(&self, employee_id: &str) -> Option<NaiveDate> {
        self.pending_dates.get(employee_id).copied().flatten()
    }

    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = DialogRow<'_>> {
        self.candidates.iter().map(|c| DialogRow {
            row_number: c.row_number,
            employee_id: &c.employee_id,
            name: &c.name,
            department: c.department_label(),
            date_of_joining: self.pending_date(&c.employee_id),
        })
    }

    /// Replace the candidate set, keeping dates already chosen for ids that
    /// are still present.
    pub fn set_candidates(&mut self, candidates: Vec<MissingEmployeeCandidate>) {
        self.pending_dates =
            merge_pending_dates(&self.pending_dates, candidates.iter().map(|c| c.employee_id.as_str()));

        let editor_gone = self
            .active_editor
            .as_ref()
            .is_some_and(|editor| !self.pending_dates.contains_key(&editor.employee_id));
        if editor_gone {
            self.active_editor = None;
        }

        debug!("Reconciliation dialog holds {} candidates", candidates.len());
        self.candidates = candidates;
    }

    /// Open the date picker for a candidate, replacing any open one.
    pub fn open_date_editor(&mut self, employee_id: &str, anchor: Anchor) {
        if !self.pending_dates.contains_key(employee_id) {
            warn!("Ignoring date editor for unknown candidate {employee_id}");
            return;
        }
        self.active_editor = Some(DateEditor {
            employee_id: employee_id.to_string(),
            anchor,
        });
    }

    pub fn close_date_editor(&mut self) {
        self.active_editor = None;
    }

    /// Record a joining date. The editor stays open.
    pub fn set_date(&mut self, employee_id: &str, date: NaiveDate) {
        match self.pending_dates.get_mut(employee_id) {
            Some(slot) => *slot = Some(date),
            None => warn!("Ignoring date for unknown candidate {employee_id}"),
        }
    }

    /// Reset a candidate's joining date to unset.
    pub fn clear_date(&mut self, employee_id: &str) {
        if let Some(slot) = self.pending_dates.get_mut(employee_id) {
            *slot = None;
        }
    }

    /// Copy of the candidates with chosen dates attached.
    pub fn enriched(&self) -> Vec<MissingEmployeeCandidate> {
        self.candidates
            .iter()
            .map(|c| MissingEmployeeCandidate {
                date_of_joining: self.pending_date(&c.employee_id),
                ..c.clone()
            })
            .collect()
    }

    /// Start a confirmation.
    ///
    /// Returns the enriched list, or `None` while a previous confirmation is
    /// still in flight. Pair with [`finish_confirm`](Self::finish_confirm)
    /// once the caller's work settles.
    pub fn begin_confirm(&mut self) -> Option<Vec<MissingEmployeeCandidate>> {
        if self.is_submitting {
            debug!("Confirmation already in flight");
            return None;
        }
        self.is_submitting = true;
        self.active_editor = None;
        Some(self.enriched())
    }

    /// Mark the in-flight confirmation as settled, whatever its outcome.
    pub fn finish_confirm(&mut self) {
        self.is_submitting = false;
    }

    /// Hand the enriched list to `on_confirm` and await it.
    ///
    /// The submitting flag is cleared when the callback settles, fails,
    /// panics or is dropped. Errors are returned to the caller as-is.
    pub async fn confirm<F, Fut, T>(&mut self, on_confirm: F) -> Option<T>
    where
        F: FnOnce(Vec<MissingEmployeeCandidate>) -> Fut,
        Fut: Future<Output = T>,
    {
        let enriched = self.begin_confirm()?;
        let _guard = SubmitGuard {
            flag: &mut self.is_submitting,
        };
        Some(on_confirm(enriched).await)
    }

    /// Invoke `on_cancel` unless a confirmation is in flight.
    ///
    /// Returns whether the callback ran.
    pub fn cancel<F: FnOnce()>(&mut self, on_cancel: F) -> bool {
        if self.is_submitting {
            return false;
        }
        self.active_editor = None;
        on_cancel();
        true
    }
}
