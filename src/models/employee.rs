//! Employee DTOs exchanged with the tally backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::candidate::MissingEmployeeCandidate;
use crate::config::ImportConfig;

/// DTO for creating an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEmployee {
    pub employee_id: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_joining: Option<NaiveDate>,
    pub shift_start_time: String,
    pub shift_end_time: String,
    pub basic_salary: String,
    pub is_active: bool,
}

/// Values filled in for fields the uploaded sheet does not carry.
#[derive(Debug, Clone)]
pub struct EmployeeDefaults {
    pub shift_start_time: String,
    pub shift_end_time: String,
}

impl From<&ImportConfig> for EmployeeDefaults {
    fn from(config: &ImportConfig) -> Self {
        Self {
            shift_start_time: config.shift_start_time.trim().to_string(),
            shift_end_time: config.shift_end_time.trim().to_string(),
        }
    }
}

impl CreateEmployee {
    /// Build the creation payload for a confirmed candidate.
    pub fn from_candidate(candidate: &MissingEmployeeCandidate, defaults: &EmployeeDefaults) -> Self {
        let first_name = if candidate.first_name.trim().is_empty() {
            candidate.employee_id.clone()
        } else {
            candidate.first_name.trim().to_string()
        };
        let last_name = Some(candidate.last_name.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let department = candidate
            .department
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            employee_id: candidate.employee_id.clone(),
            first_name,
            last_name,
            department,
            date_of_joining: candidate.date_of_joining,
            shift_start_time: defaults.shift_start_time.clone(),
            shift_end_time: defaults.shift_end_time.clone(),
            basic_salary: "0".to_string(),
            is_active: true,
        }
    }
}

/// Response of the bulk-create endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedEmployees {
    pub created: usize,
    #[serde(default)]
    pub employee_ids: Vec<String>,
}

/// Response of the upload endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub accepted: usize,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> EmployeeDefaults {
        EmployeeDefaults::from(&ImportConfig::default())
    }

    fn candidate(last_name: &str, department: Option<&str>) -> MissingEmployeeCandidate {
        MissingEmployeeCandidate {
            employee_id: "E-7".to_string(),
            name: "Ravi Kumar".to_string(),
            first_name: "Ravi".to_string(),
            last_name: last_name.to_string(),
            department: department.map(str::to_string),
            row_number: 3,
            date_of_joining: None,
        }
    }

    #[test]
    fn test_from_candidate_applies_defaults() {
        let emp = CreateEmployee::from_candidate(&candidate("Kumar", Some("Finance")), &defaults());
        assert_eq!(emp.employee_id, "E-7");
        assert_eq!(emp.first_name, "Ravi");
        assert_eq!(emp.last_name.as_deref(), Some("Kumar"));
        assert_eq!(emp.department.as_deref(), Some("Finance"));
        assert_eq!(emp.shift_start_time, "09:00");
        assert_eq!(emp.shift_end_time, "18:00");
        assert_eq!(emp.basic_salary, "0");
        assert!(emp.is_active);
    }

    #[test]
    fn test_blank_optional_fields_are_omitted() {
        let emp = CreateEmployee::from_candidate(&candidate("", Some("  ")), &defaults());
        let json = serde_json::to_value(&emp).unwrap();
        assert!(json.get("last_name").is_none());
        assert!(json.get("department").is_none());
        assert!(json.get("date_of_joining").is_none());
    }

    #[test]
    fn test_joining_date_is_carried() {
        let mut c = candidate("Kumar", None);
        c.date_of_joining = NaiveDate::from_ymd_opt(2024, 11, 4);
        let emp = CreateEmployee::from_candidate(&c, &defaults());
        let json = serde_json::to_value(&emp).unwrap();
        assert_eq!(json["date_of_joining"], "2024-11-04");
    }

    #[test]
    fn test_empty_first_name_falls_back_to_id() {
        let mut c = candidate("", None);
        c.first_name = String::new();
        let emp = CreateEmployee::from_candidate(&c, &defaults());
        assert_eq!(emp.first_name, "E-7");
    }
}
