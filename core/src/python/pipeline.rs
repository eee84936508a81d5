//! Python wrappers for the preparation steps

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::config::PySelectorConfig;
use super::errors::convert_error;
use super::utils::{optional_pathbuf, path_to_pathbuf, path_to_string};
use crate::selection::VolumeSelector;
use crate::types::SelectorConfig;

/// Select one volume per subject and copy it to the output folder
///
/// Args:
///     images_folder: Folder holding one directory per subject
///     output_folder: Destination folder (default: images_folder/selected)
///     config: SelectorConfig with override lists and threshold
///
/// Returns:
///     str: Path of the output folder
///
/// Example:
///     >>> from cqprep import SelectorConfig, select_images
///     >>> config = SelectorConfig(excluded=["CQ500CT12 CQ500CT12"])
///     >>> out = select_images("converted", config=config)
#[pyfunction]
#[pyo3(name = "select_images", signature = (images_folder, output_folder=None, config=None))]
pub fn py_select_images(
    images_folder: &Bound<'_, PyAny>,
    output_folder: Option<&Bound<'_, PyAny>>,
    config: Option<PySelectorConfig>,
) -> PyResult<String> {
    let images_folder = path_to_pathbuf(images_folder)?;
    let output_folder = optional_pathbuf(output_folder)?;
    let config = config.map(|c| c.inner).unwrap_or_default();

    let output = crate::selection::select_images(&images_folder, output_folder.as_deref(), config)
        .map_err(convert_error)?;
    Ok(path_to_string(&output))
}

/// Select volumes and return the subject to copied-path mapping
///
/// Returns:
///     dict: Subject name to selected volume path; subjects without a
///     selection are absent
#[pyfunction]
#[pyo3(name = "selected_volumes", signature = (images_folder, output_folder=None, config=None))]
pub fn py_selected_volumes(
    py: Python,
    images_folder: &Bound<'_, PyAny>,
    output_folder: Option<&Bound<'_, PyAny>>,
    config: Option<PySelectorConfig>,
) -> PyResult<Py<PyDict>> {
    let images_folder = path_to_pathbuf(images_folder)?;
    let output_folder = optional_pathbuf(output_folder)?;
    let config: SelectorConfig = config.map(|c| c.inner).unwrap_or_default();

    let report = VolumeSelector::new(config)
        .run(&images_folder, output_folder.as_deref())
        .map_err(convert_error)?;

    let dict = PyDict::new_bound(py);
    for (subject, path) in report.selected() {
        dict.set_item(subject, path_to_string(&path))?;
    }
    Ok(dict.unbind())
}

/// Convert every DICOM series under input_folder to NIfTI with dcm2niix
///
/// Returns:
///     str: Path of the output folder
#[pyfunction]
#[pyo3(name = "convert_nifti", signature = (input_folder, output_folder=None))]
pub fn py_convert_nifti(
    input_folder: &Bound<'_, PyAny>,
    output_folder: Option<&Bound<'_, PyAny>>,
) -> PyResult<String> {
    let input_folder = path_to_pathbuf(input_folder)?;
    let output_folder = optional_pathbuf(output_folder)?;

    let output = crate::convert::convert_nifti(&input_folder, output_folder.as_deref())
        .map_err(convert_error)?;
    Ok(path_to_string(&output))
}

/// Download the dataset manifest and archives, extracting each archive
///
/// Returns:
///     list[str]: Paths of resources that failed to download or extract
#[pyfunction]
#[pyo3(name = "get_data")]
pub fn py_get_data(manifest_url: &str, dest: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    let dest = path_to_pathbuf(dest)?;
    let report = crate::fetch::get_data(manifest_url, &dest).map_err(convert_error)?;
    Ok(report
        .problems()
        .map(|item| path_to_string(&item.path))
        .collect())
}
