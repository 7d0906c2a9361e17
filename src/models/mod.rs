//! Data models for upload candidates and employee payloads.

pub mod candidate;
pub mod employee;

pub use candidate::{MissingEmployeeCandidate, UploadKind};
pub use employee::{CreateEmployee, CreatedEmployees, EmployeeDefaults, UploadReceipt};
