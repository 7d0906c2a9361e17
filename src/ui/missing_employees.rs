//! Confirmation window for employees missing from an upload.

use chrono::{Datelike, Local, Months, NaiveDate};
use eframe::egui::{self, Align, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use egui_phosphor::regular::{CALENDAR_BLANK, CARET_LEFT, CARET_RIGHT, FILE_XLS, USER_PLUS, WARNING};

use super::components::{colors, primary_button_with_icon, styled_button, styled_button_with_icon};
use crate::models::MissingEmployeeCandidate;
use crate::reconcile::{Anchor, ReconciliationDialog};

const POPUP_MIN_WIDTH: f32 = 220.0;

/// Action requested by the operator this frame.
#[derive(Debug)]
pub enum Action {
    None,
    /// Create these employees, then resume the upload.
    Confirm(Vec<MissingEmployeeCandidate>),
    Cancel,
    /// Save the current list, dates included, to Excel.
    Export(Vec<MissingEmployeeCandidate>),
}

/// Show the missing-employee window.
pub fn show(dialog: &mut ReconciliationDialog, ctx: &egui::Context) -> Action {
    let mut action = Action::None;
    let count = dialog.candidates().len();

    egui::Window::new(format!("{WARNING} Missing Employees"))
        .collapsible(false)
        .resizable(false)
        .default_width(640.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(6.0);
            ui.label(format!(
                "{count} employee{} referenced in this {} file {} not exist yet.",
                if count == 1 { "" } else { "s" },
                dialog.upload_kind().label(),
                if count == 1 { "does" } else { "do" },
            ));
            ui.label(
                RichText::new("They will be created before the upload continues. Leave the joining date blank to use the default.")
                    .weak(),
            );
            ui.add_space(12.0);

            show_table(dialog, ui);

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            let submitting = dialog.is_submitting();
            ui.horizontal(|ui| {
                if styled_button(ui, "Cancel", !submitting).clicked() {
                    dialog.cancel(|| action = Action::Cancel);
                }

                ui.add_space(10.0);

                if styled_button_with_icon(ui, FILE_XLS, "Export").clicked() {
                    action = Action::Export(dialog.enriched());
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if primary_button_with_icon(ui, USER_PLUS, "Create & Continue", !submitting).clicked()
                        && let Some(enriched) = dialog.begin_confirm()
                    {
                        action = Action::Confirm(enriched);
                    }
                    if submitting {
                        ui.spinner();
                        ui.label("Creating employees...");
                    }
                });
            });
        });

    show_date_popup(dialog, ctx);

    action
}

fn show_table(dialog: &mut ReconciliationDialog, ui: &mut Ui) {
    let mut open_request = None;
    let submitting = dialog.is_submitting();

    TableBuilder::new(ui)
        .id_salt("missing_employees_table")
        .striped(true)
        .max_scroll_height(360.0)
        .cell_layout(Layout::left_to_right(Align::Center))
        .column(Column::auto().at_least(40.0))
        .column(Column::auto().at_least(90.0))
        .column(Column::initial(180.0).resizable(true))
        .column(Column::auto().at_least(100.0))
        .column(Column::remainder().at_least(130.0))
        .header(22.0, |mut header| {
            for title in ["Row", "Employee ID", "Name", "Department", "Date of Joining"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in dialog.rows() {
                body.row(28.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(row.row_number.to_string());
                    });
                    table_row.col(|ui| {
                        ui.label(row.employee_id);
                    });
                    table_row.col(|ui| {
                        ui.label(row.name);
                    });
                    table_row.col(|ui| {
                        ui.label(row.department);
                    });
                    table_row.col(|ui| {
                        let text = match row.date_of_joining {
                            Some(date) => format!("{CALENDAR_BLANK} {}", date.format("%Y-%m-%d")),
                            None => format!("{CALENDAR_BLANK} Set date"),
                        };
                        let response = ui.add_enabled(!submitting, egui::Button::new(text));
                        if response.clicked() {
                            let rect = response.rect;
                            open_request = Some((
                                row.employee_id.to_string(),
                                Anchor {
                                    top: rect.bottom(),
                                    left: rect.left(),
                                    width: rect.width(),
                                },
                            ));
                        }
                    });
                });
            }
        });

    if let Some((employee_id, anchor)) = open_request {
        dialog.open_date_editor(&employee_id, anchor);
    }
}

/// Date picker popup anchored under the button that opened it.
fn show_date_popup(dialog: &mut ReconciliationDialog, ctx: &egui::Context) {
    let Some(editor) = dialog.active_editor().cloned() else {
        return;
    };

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        dialog.close_date_editor();
        return;
    }

    let id = editor.employee_id.as_str();
    let today = Local::now().date_naive();

    egui::Area::new(egui::Id::new("join_date_popup"))
        .order(egui::Order::Foreground)
        .fixed_pos(egui::pos2(editor.anchor.left, editor.anchor.top))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_min_width(editor.anchor.width.max(POPUP_MIN_WIDTH));
                ui.label(RichText::new(format!("Joining date for {id}")).strong());
                ui.add_space(6.0);

                let selected = dialog.pending_date(id);
                if let Some(date) = calendar(ui, egui::Id::new(("join_date_month", id)), selected, today) {
                    dialog.set_date(id, date);
                }

                ui.add_space(4.0);
                match dialog.pending_date(id) {
                    Some(date) => ui.label(format!("Selected: {}", date.format("%Y-%m-%d"))),
                    None => ui.colored_label(colors::NEUTRAL, "Not set - default joining date applies"),
                };

                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.button("Today").clicked() {
                        dialog.set_date(id, today);
                    }
                    if ui.button("Clear").clicked() {
                        dialog.clear_date(id);
                    }
                    if ui.button("Close").clicked() {
                        dialog.close_date_editor();
                    }
                });
            });
        });
}

/// Month view with day buttons. Returns the day clicked this frame.
///
/// The shown month lives in egui temp memory under `id`.
fn calendar(ui: &mut Ui, id: egui::Id, selected: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
    let shown = ui
        .data(|d| d.get_temp::<NaiveDate>(id))
        .or(selected)
        .unwrap_or(today);
    let month_start = shown.with_day(1).unwrap_or(shown);
    let mut view = month_start;
    let mut picked = None;

    ui.horizontal(|ui| {
        if ui.small_button(CARET_LEFT).clicked() {
            view = month_start.checked_sub_months(Months::new(1)).unwrap_or(month_start);
        }
        ui.label(RichText::new(month_start.format("%B %Y").to_string()).strong());
        if ui.small_button(CARET_RIGHT).clicked() {
            view = month_start.checked_add_months(Months::new(1)).unwrap_or(month_start);
        }
    });

    egui::Grid::new(id.with("days"))
        .spacing([2.0, 2.0])
        .min_col_width(26.0)
        .show(ui, |ui| {
            for name in ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"] {
                ui.weak(name);
            }
            ui.end_row();

            for week in month_cells(month_start).chunks(7) {
                for cell in week {
                    let Some(day) = *cell else {
                        ui.label("");
                        continue;
                    };
                    let mut text = RichText::new(day.day().to_string());
                    if day == today {
                        text = text.underline();
                    }
                    if ui.add(egui::Button::selectable(selected == Some(day), text)).clicked() {
                        picked = Some(day);
                    }
                }
                ui.end_row();
            }
        });

    ui.data_mut(|d| d.insert_temp(id, view));
    picked
}

/// Days of a month laid out Monday-first, with leading blanks.
fn month_cells(month_start: NaiveDate) -> Vec<Option<NaiveDate>> {
    let lead = month_start.weekday().num_days_from_monday() as usize;
    let days = month_start
        .iter_days()
        .take_while(|d| d.month() == month_start.month());
    std::iter::repeat_n(None, lead).chain(days.map(Some)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadKind;

    fn candidate(id: &str) -> MissingEmployeeCandidate {
        MissingEmployeeCandidate {
            employee_id: id.to_string(),
            name: "Asha Rao".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            department: None,
            row_number: 2,
            date_of_joining: None,
        }
    }

    #[test]
    fn test_frame_without_clicks_requests_nothing() {
        let ctx = egui::Context::default();
        let mut dialog = ReconciliationDialog::new(UploadKind::Attendance, vec![candidate("E-1")]);
        dialog.open_date_editor(
            "E-1",
            Anchor {
                top: 40.0,
                left: 20.0,
                width: 120.0,
            },
        );

        let mut action = Action::None;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            action = show(&mut dialog, ctx);
        });

        assert!(matches!(action, Action::None));
        assert!(dialog.active_editor().is_some());
        assert!(!dialog.is_submitting());
    }

    #[test]
    fn test_month_cells_start_on_monday_column() {
        let february = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let cells = month_cells(february);

        // 1 Feb 2025 is a Saturday
        assert_eq!(cells.iter().take_while(|c| c.is_none()).count(), 5);
        assert_eq!(cells.iter().flatten().count(), 28);
        assert_eq!(cells.last().copied().flatten(), NaiveDate::from_ymd_opt(2025, 2, 28));
    }

    #[test]
    fn test_month_cells_handle_december() {
        let december = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let cells = month_cells(december);

        assert_eq!(cells[0], Some(december));
        assert_eq!(cells.iter().flatten().count(), 31);
    }
}
