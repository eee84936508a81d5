//! Python bindings for cqprep
//!
//! Exposes the fetch, conversion and selection steps so notebooks can drive
//! the preparation pipeline.

// Suppress false positive warnings from PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

mod config;
mod errors;
mod pipeline;
mod utils;

pub use config::*;
pub use errors::*;
pub use pipeline::*;

/// Python module definition
#[pymodule]
fn _cqprep(py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Register exception classes
    m.add("PrepError", py.get_type_bound::<errors::PyPrepError>())?;
    m.add("DatasetError", py.get_type_bound::<errors::PyDatasetError>())?;
    m.add("ImageError", py.get_type_bound::<errors::PyImageError>())?;
    m.add(
        "ConversionError",
        py.get_type_bound::<errors::PyConversionError>(),
    )?;
    m.add("ConfigError", py.get_type_bound::<errors::PyConfigError>())?;

    m.add_class::<PySelectorConfig>()?;

    // Register functions
    m.add_function(wrap_pyfunction!(py_select_images, m)?)?;
    m.add_function(wrap_pyfunction!(py_selected_volumes, m)?)?;
    m.add_function(wrap_pyfunction!(py_convert_nifti, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_data, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
