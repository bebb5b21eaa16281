pub mod accounts;
pub mod billing;
pub mod config;
pub mod error;
pub mod webhooks;

pub use error::{AppError, AppResult, ValidationError};
