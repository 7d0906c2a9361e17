//! GUI panels and application state.

pub mod app;
pub mod components;
pub mod import_panel;
pub mod missing_employees;
pub mod setup_wizard;

pub use app::App;
pub use setup_wizard::{SetupApp, SetupWizard};
