pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod reconcile;
pub mod ui;
pub mod upload;

pub use error::{AppError, Result};
