use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("billing provider error: {0}")]
    Billing(#[from] reqwest::Error),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Message(String),
}

/// Failures raised before an account row is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name can't be blank")]
    BlankName,
    #[error("slug can't be blank")]
    BlankSlug,
    #[error("email `{0}` has already been taken")]
    EmailTaken(String),
}

pub type AppResult<T> = Result<T, AppError>;
