use polars::error::PolarsError;
use std::io::Error as IoError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Unsupported file format: {0}")]
    FileFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("None of the selected sheets could be loaded")]
    NoSheetsLoaded,
}
