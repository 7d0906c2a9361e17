//! Missing-employee reconciliation: the confirmation dialog state and its
//! pending joining dates.

pub mod dates;
pub mod dialog;


pub use dates::{PendingDates, merge_pending_dates};
pub use dialog::{Anchor, DateEditor, DialogRow, ReconciliationDialog};
