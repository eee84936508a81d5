use std::path::PathBuf;
use thiserror::Error;

/// Result type for cqprep operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Error types for cqprep operations
#[derive(Error, Debug)]
pub enum PrepError {
    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path expected to be a directory is missing or is a file
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// NIfTI header could not be read
    #[error("NIfTI error: {0}")]
    NiftiError(String),

    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Resource download failed
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Archive could not be opened or extracted
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// External series conversion failed
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// Registration engine reported a failure
    #[error("Registration error: {0}")]
    RegistrationError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<nifti::NiftiError> for PrepError {
    fn from(e: nifti::NiftiError) -> Self {
        PrepError::NiftiError(format!("{}", e))
    }
}

impl From<reqwest::Error> for PrepError {
    fn from(e: reqwest::Error) -> Self {
        PrepError::DownloadError(format!("{}", e))
    }
}

impl From<zip::result::ZipError> for PrepError {
    fn from(e: zip::result::ZipError) -> Self {
        PrepError::ArchiveError(format!("{}", e))
    }
}

impl From<walkdir::Error> for PrepError {
    fn from(e: walkdir::Error) -> Self {
        match e.into_io_error() {
            Some(io) => PrepError::IoError(io),
            None => PrepError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "filesystem loop detected",
            )),
        }
    }
}

impl From<regex::Error> for PrepError {
    fn from(e: regex::Error) -> Self {
        PrepError::InvalidConfig(format!("{}", e))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for PrepError {
    fn from(e: serde_json::Error) -> Self {
        PrepError::InvalidConfig(format!("{}", e))
    }
}
