//! Excel export of missing-employee lists.

use crate::error::Result;
use crate::models::MissingEmployeeCandidate;
use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use std::path::{Path, PathBuf};

/// Export candidates, with any chosen joining dates, to an Excel file.
pub fn export_candidates_to_excel(candidates: &[MissingEmployeeCandidate], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Missing Employees")?;

    // Header format
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    // Headers
    let headers = [
        "Row",
        "Employee ID",
        "Name",
        "First Name",
        "Last Name",
        "Department",
        "Date of Joining",
    ];

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    // Column widths
    worksheet.set_column_width(0, 6)?; // Row
    worksheet.set_column_width(1, 15)?; // Employee ID
    worksheet.set_column_width(2, 30)?; // Name
    worksheet.set_column_width(3, 18)?; // First Name
    worksheet.set_column_width(4, 18)?; // Last Name
    worksheet.set_column_width(5, 25)?; // Department
    worksheet.set_column_width(6, 15)?; // Date of Joining

    // Data rows
    for (idx, candidate) in candidates.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_number(row, 0, candidate.row_number as f64)?;
        worksheet.write_string(row, 1, &candidate.employee_id)?;
        worksheet.write_string(row, 2, &candidate.name)?;
        worksheet.write_string(row, 3, &candidate.first_name)?;
        worksheet.write_string(row, 4, &candidate.last_name)?;
        worksheet.write_string(row, 5, candidate.department.as_deref().unwrap_or(""))?;

        // Unset dates stay blank; the backend default applies on creation
        if let Some(date) = candidate.date_of_joining {
            worksheet.write_string(row, 6, date.format("%Y-%m-%d").to_string())?;
        } else {
            worksheet.write_string(row, 6, "")?;
        }
    }

    // Autofilter
    if !candidates.is_empty() {
        let last_row = candidates.len() as u32;
        worksheet.autofilter(0, 0, last_row, 6)?;
    }

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Open save file dialog and return selected path.
pub fn show_save_dialog(default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_file_name(default_name)
        .add_filter("Excel Files", &["xlsx"])
        .save_file()
}

/// Open file dialog for an upload sheet.
pub fn show_open_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Sheets", &["xlsx", "xls", "xlsm", "xlsb", "ods", "csv", "tsv", "txt"])
        .add_filter("Excel Files", &["xlsx", "xls", "xlsm", "xlsb"])
        .add_filter("Text Files", &["csv", "tsv", "txt"])
        .pick_file()
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}
