//! Parser for uploaded attendance and salary sheets.
//!
//! Text exports (comma- or tab-separated) go through the `csv` reader,
//! workbooks through `calamine`. Both yield numbered records that share the
//! same header detection and row building. The first non-blank record is
//! the header.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::UploadKind;

const EMPLOYEE_ID_HEADERS: &[&str] = &["employeeid", "empid", "employeecode"];
const NAME_HEADERS: &[&str] = &["name", "employeename", "fullname"];
const DEPARTMENT_HEADERS: &[&str] = &["department", "dept"];

/// Extensions read as workbooks rather than delimited text.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One data row of an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRow {
    /// 1-based line (or worksheet row) number in the source file.
    pub row_number: usize,
    pub employee_id: String,
    pub name: String,
    pub department: Option<String>,
    /// Every cell of the row keyed by its header, in column order.
    pub cells: Vec<(String, String)>,
}

/// A parsed sheet ready for reconciliation and upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSheet {
    pub kind: UploadKind,
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<UploadRow>,
}

/// A raw record and the line it starts on.
type Record = (usize, Vec<String>);

/// Whether a path is read as a workbook.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Read and parse a sheet from disk.
pub fn read_sheet(path: &Path, kind: UploadKind) -> Result<UploadSheet> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if is_workbook(path) {
        // calamine reports a missing file as its own error; keep it an Io error
        if !path.exists() {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string()).into());
        }
        let records = workbook_records(path, &source)?;
        return build_sheet(records, kind, &source);
    }

    let content = std::fs::read_to_string(path)?;
    parse_sheet(&content, kind, &source)
}

/// Parse delimited sheet text.
pub fn parse_sheet(content: &str, kind: UploadKind, source: &str) -> Result<UploadSheet> {
    let records = text_records(content, source)?;
    build_sheet(records, kind, source)
}

fn text_records(content: &str, source: &str) -> Result<Vec<Record>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let header_line = content.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    let delimiter = if header_line.contains('\t') { b'\t' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::parse(format!("{source}: {e}")))?;
        let line = record.position().map_or(records.len() + 1, |p| p.line() as usize);
        records.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(records)
}

fn workbook_records(path: &Path, source: &str) -> Result<Vec<Record>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| AppError::parse(format!("{source}: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::parse(format!("{source}: workbook has no sheets")))?
        .map_err(|e| AppError::parse(format!("{source}: {e}")))?;

    // Range rows are relative to the first used cell
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    debug!("{source}: worksheet data starts at row {}", first_row + 1);

    Ok(range
        .rows()
        .enumerate()
        .map(|(idx, cells)| (first_row + idx + 1, cells.iter().map(cell_text).collect()))
        .collect())
}

/// Render a workbook cell the way it reads in a text export.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

fn build_sheet(records: Vec<Record>, kind: UploadKind, source: &str) -> Result<UploadSheet> {
    let mut records = records
        .into_iter()
        .filter(|(_, fields)| fields.iter().any(|f| !f.trim().is_empty()));

    let (_, header_fields) = records
        .next()
        .ok_or_else(|| AppError::parse(format!("{source}: sheet is empty")))?;
    let headers: Vec<String> = header_fields.iter().map(|h| h.trim().to_string()).collect();

    let id_col = find_column(&headers, EMPLOYEE_ID_HEADERS)
        .ok_or_else(|| AppError::parse(format!("{source}: no employee id column in header")))?;
    let name_col = find_column(&headers, NAME_HEADERS)
        .ok_or_else(|| AppError::parse(format!("{source}: no name column in header")))?;
    let dept_col = find_column(&headers, DEPARTMENT_HEADERS);

    let mut rows = Vec::new();
    for (row_number, fields) in records {
        let cell = |col: usize| fields.get(col).map(|s| s.trim()).unwrap_or("");

        let employee_id = cell(id_col);
        if employee_id.is_empty() {
            warn!("{source}: line {row_number} has no employee id, skipping");
            continue;
        }

        let department = dept_col.map(cell).filter(|d| !d.is_empty()).map(str::to_string);
        let cells = headers
            .iter()
            .enumerate()
            .map(|(col, header)| (header.clone(), cell(col).to_string()))
            .collect();

        rows.push(UploadRow {
            row_number,
            employee_id: employee_id.to_string(),
            name: cell(name_col).to_string(),
            department,
            cells,
        });
    }

    Ok(UploadSheet {
        kind,
        source: source.to_string(),
        headers,
        rows,
    })
}

/// Normalize a header for matching: lowercase, no spaces, underscores or dashes.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.contains(&normalize_header(h).as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_parse_csv_sheet() {
        let data = "Employee ID,Name,Department,Present Days\nE-1,Anil Mehta,Warehouse,22\nE-2,Sara Khan,,20\n";
        let sheet = parse_sheet(data, UploadKind::Attendance, "march.csv").unwrap();

        assert_eq!(sheet.headers, vec!["Employee ID", "Name", "Department", "Present Days"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(sheet.rows[0].employee_id, "E-1");
        assert_eq!(sheet.rows[0].department.as_deref(), Some("Warehouse"));
        assert_eq!(sheet.rows[1].department, None);
        assert_eq!(
            sheet.rows[1].cells[3],
            ("Present Days".to_string(), "20".to_string())
        );
    }

    #[test]
    fn test_parse_tsv_sheet() {
        let data = "emp_id\tfull_name\tbasic\nS-10\tJoe\t15000\n";
        let sheet = parse_sheet(data, UploadKind::Salary, "salary.tsv").unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].employee_id, "S-10");
        assert_eq!(sheet.rows[0].name, "Joe");
        assert_eq!(sheet.rows[0].department, None);
    }

    #[test]
    fn test_quoted_fields() {
        let data = "Employee Code,Name,Dept\n7,\"Rao, Asha\",\"R&D \"\"Labs\"\"\"\n";
        let sheet = parse_sheet(data, UploadKind::Attendance, "q.csv").unwrap();

        assert_eq!(sheet.rows[0].name, "Rao, Asha");
        assert_eq!(sheet.rows[0].department.as_deref(), Some("R&D \"Labs\""));
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_record() {
        let data = "Employee ID,Name,Department\nE-1,\"Asha\nRao\",Stores\nE-2,Joe,HR\n";
        let sheet = parse_sheet(data, UploadKind::Attendance, "multiline.csv").unwrap();

        let ids: Vec<_> = sheet.rows.iter().map(|r| r.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E-1", "E-2"]);
        assert_eq!(sheet.rows[0].name, "Asha\nRao");
        assert_eq!(sheet.rows[0].department.as_deref(), Some("Stores"));

        let numbers: Vec<_> = sheet.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn test_row_numbers_follow_file_lines() {
        let data = "\u{feff}Employee ID,Name\n\nE-1,A\n\n,Nobody\nE-2,B\n";
        let sheet = parse_sheet(data, UploadKind::Attendance, "gaps.csv").unwrap();

        assert_eq!(sheet.headers[0], "Employee ID");
        let numbers: Vec<_> = sheet.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![3, 6]);
    }

    #[test]
    fn test_missing_id_column() {
        let data = "Name,Department\nA,B\n";
        let err = parse_sheet(data, UploadKind::Attendance, "bad.csv").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_missing_name_column() {
        let data = "Employee ID,Department\nE-1,B\n";
        assert!(parse_sheet(data, UploadKind::Attendance, "bad.csv").is_err());
    }

    #[test]
    fn test_empty_sheet() {
        assert!(parse_sheet("\n  \n", UploadKind::Salary, "empty.csv").is_err());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let data = "Employee ID,Name,Department\nE-1\n";
        let sheet = parse_sheet(data, UploadKind::Attendance, "short.csv").unwrap();

        assert_eq!(sheet.rows[0].name, "");
        assert_eq!(sheet.rows[0].cells.len(), 3);
    }

    #[test]
    fn test_is_workbook() {
        assert!(is_workbook(Path::new("march.xlsx")));
        assert!(is_workbook(Path::new("OLD.XLS")));
        assert!(!is_workbook(Path::new("march.csv")));
        assert!(!is_workbook(Path::new("noext")));
    }

    #[test]
    fn test_read_xlsx_sheet() {
        let path = std::env::temp_dir().join(format!("tally-import-sheet-{}.xlsx", std::process::id()));
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Employee ID").unwrap();
        worksheet.write_string(0, 1, "Name").unwrap();
        worksheet.write_string(0, 2, "Department").unwrap();
        worksheet.write_string(0, 3, "Basic").unwrap();
        worksheet.write_number(1, 0, 101.0).unwrap();
        worksheet.write_string(1, 1, "Anil Mehta").unwrap();
        worksheet.write_string(1, 2, "Warehouse").unwrap();
        worksheet.write_number(1, 3, 15000.5).unwrap();
        worksheet.write_string(3, 0, "E-7").unwrap();
        worksheet.write_string(3, 1, "Sara Khan").unwrap();
        workbook.save(&path).unwrap();

        let sheet = read_sheet(&path, UploadKind::Salary).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(sheet.source, path.file_name().unwrap().to_string_lossy());
        assert_eq!(sheet.headers, vec!["Employee ID", "Name", "Department", "Basic"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].employee_id, "101");
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(sheet.rows[0].cells[3].1, "15000.5");
        assert_eq!(sheet.rows[1].employee_id, "E-7");
        assert_eq!(sheet.rows[1].row_number, 4);
        assert_eq!(sheet.rows[1].department, None);
    }

    #[test]
    fn test_read_missing_workbook() {
        let err = read_sheet(Path::new("/nonexistent/sheet.xlsx"), UploadKind::Attendance).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
