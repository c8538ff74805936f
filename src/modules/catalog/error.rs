use bookshelf_http::error::AppError;
use thiserror::Error;

use super::models::BookId;

/// Failures surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Missing or empty required field
    #[error("{0}")]
    Validation(String),

    #[error("Book id {0} doesn't exist.")]
    NotFound(BookId),

    #[error("admin privileges required")]
    Forbidden,

    #[error("catalog store failure")]
    Store(#[from] sqlx::Error),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => AppError::validation(message),
            CatalogError::NotFound(_) => AppError::not_found(err.to_string()),
            CatalogError::Forbidden => AppError::forbidden(err.to_string()),
            CatalogError::Store(source) => {
                AppError::Internal(anyhow::Error::new(source).context("catalog store failure"))
            }
        }
    }
}
