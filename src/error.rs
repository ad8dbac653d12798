use thiserror::Error;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Invalid or missing run-mode prerequisites
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or insufficient dataset/file content
    #[error("Input error: {0}")]
    Input(String),

    #[error("Failed to load model from {0}: {1}")]
    ModelLoadError(PathBuf, String),

    #[error("input argument: {name} not found, valid parameters: {}", .candidates.join(", "))]
    ParameterNotFound {
        name: String,
        candidates: Vec<String>,
    },

    /// Host code tried to read a buffer that lives in device memory
    #[error("Argument {0} is device resident, copy it back before reading")]
    DeviceResident(String),
}

impl Error {
    /// True for errors caused by the run configuration rather than data or model
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
