//! Missing-employee candidates produced while reconciling an upload.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of sheet being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    #[default]
    Attendance,
    Salary,
}

impl UploadKind {
    /// Lowercase name, used in dialog text and as the upload endpoint segment.
    pub fn label(&self) -> &'static str {
        match self {
            UploadKind::Attendance => "attendance",
            UploadKind::Salary => "salary",
        }
    }

    /// Capitalized name for headings and selectors.
    pub fn title(&self) -> &'static str {
        match self {
            UploadKind::Attendance => "Attendance",
            UploadKind::Salary => "Salary",
        }
    }
}

/// An employee referenced by an uploaded sheet but absent from the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEmployeeCandidate {
    pub employee_id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    /// 1-based line number in the source file.
    pub row_number: usize,
    /// Joining date chosen by the operator; omitted when unset so the
    /// backend applies its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_joining: Option<NaiveDate>,
}

impl MissingEmployeeCandidate {
    /// Department label with a placeholder for missing values.
    pub fn department_label(&self) -> &str {
        self.department.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> MissingEmployeeCandidate {
        MissingEmployeeCandidate {
            employee_id: "E-104".to_string(),
            name: "Asha Rao".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            department: None,
            row_number: 7,
            date_of_joining: None,
        }
    }

    #[test]
    fn test_unset_joining_date_is_omitted() {
        let json = serde_json::to_value(candidate()).unwrap();
        assert!(json.get("date_of_joining").is_none());
    }

    #[test]
    fn test_joining_date_serializes_as_iso() {
        let mut c = candidate();
        c.date_of_joining = NaiveDate::from_ymd_opt(2025, 3, 1);
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(json["date_of_joining"], "2025-03-01");
    }

    #[test]
    fn test_department_placeholder() {
        let mut c = candidate();
        assert_eq!(c.department_label(), "-");
        c.department = Some("Stores".to_string());
        assert_eq!(c.department_label(), "Stores");
    }

    #[test]
    fn test_upload_kind_serde() {
        assert_eq!(serde_json::to_string(&UploadKind::Salary).unwrap(), "\"salary\"");
        let kind: UploadKind = serde_json::from_str("\"attendance\"").unwrap();
        assert_eq!(kind, UploadKind::Attendance);
    }
}
