//! Upload side of the import: sheet parsing and missing-employee detection.

pub mod missing;
pub mod parser;

pub use missing::{find_missing, split_name};
pub use parser::{UploadRow, UploadSheet, parse_sheet, read_sheet};
