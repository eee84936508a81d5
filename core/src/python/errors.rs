//! Python exception types for cqprep

// Suppress warnings from PyO3's create_exception! macro about gil-refs feature
#![allow(unexpected_cfgs)]

use crate::error::PrepError;
use pyo3::{create_exception, exceptions::PyException, prelude::*};

// Base exception
create_exception!(
    cqprep,
    PyPrepError,
    PyException,
    "Base exception for all cqprep errors"
);

create_exception!(
    cqprep,
    PyDatasetError,
    PyPrepError,
    "Dataset download or archive extraction error"
);

create_exception!(
    cqprep,
    PyImageError,
    PyPrepError,
    "DICOM or NIfTI reading error"
);

create_exception!(
    cqprep,
    PyConversionError,
    PyPrepError,
    "DICOM to NIfTI conversion error"
);

create_exception!(
    cqprep,
    PyConfigError,
    PyPrepError,
    "Invalid configuration value"
);

/// Convert Rust PrepError to appropriate Python exception
pub fn convert_error(err: PrepError) -> PyErr {
    match err {
        PrepError::DownloadError(msg) | PrepError::ArchiveError(msg) => {
            PyDatasetError::new_err(msg)
        }
        PrepError::NiftiError(msg) | PrepError::DicomError(msg) => PyImageError::new_err(msg),
        PrepError::ConversionError(msg) => PyConversionError::new_err(msg),
        PrepError::InvalidConfig(msg) => PyConfigError::new_err(msg),
        PrepError::NotADirectory(path) => pyo3::exceptions::PyNotADirectoryError::new_err(
            path.display().to_string(),
        ),
        PrepError::IoError(e) => pyo3::exceptions::PyOSError::new_err(e.to_string()),
        PrepError::RegistrationError(msg) => PyPrepError::new_err(msg),
    }
}
