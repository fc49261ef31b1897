use std::path::PathBuf;

use alloymix_blend::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("{path}, row {row}: {message}")]
    Job { path: PathBuf, row: usize, message: String },
    #[error("Product {0} not found in composition requirements")]
    UnknownProduct(String),
    #[error("Cannot run optimization: batch has no products")]
    EmptyBatch,
    #[error("Cannot write output: {0}")]
    Output(String),
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
