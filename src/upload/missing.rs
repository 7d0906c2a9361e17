//! Detection of employees referenced by a sheet but unknown to the system.

use std::collections::HashSet;

use super::parser::UploadRow;
use crate::models::MissingEmployeeCandidate;

/// Split a full name into first name and the remainder.
pub fn split_name(full: &str) -> (String, String) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (full.to_string(), String::new()),
    }
}

/// Collect candidates for every employee id in `rows` absent from `known_ids`.
///
/// Each id appears once, at its first row, in order of first appearance.
pub fn find_missing(rows: &[UploadRow], known_ids: &HashSet<String>) -> Vec<MissingEmployeeCandidate> {
    let mut seen = HashSet::new();

    rows.iter()
        .filter(|row| !known_ids.contains(row.employee_id.trim()))
        .filter(|row| seen.insert(row.employee_id.trim().to_string()))
        .map(|row| {
            let (first_name, last_name) = split_name(&row.name);
            MissingEmployeeCandidate {
                employee_id: row.employee_id.trim().to_string(),
                name: row.name.trim().to_string(),
                first_name,
                last_name,
                department: row.department.clone(),
                row_number: row.row_number,
                date_of_joining: None,
            }
        })
        .collect()
}
