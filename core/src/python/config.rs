//! Python wrapper for SelectorConfig

use pyo3::prelude::*;

use super::errors::convert_error;
use crate::types::{
    ListingOrder, OverrideLists, OverwritePolicy, SelectorConfig, SubjectFilter,
    DEFAULT_SLICE_THRESHOLD, DEFAULT_SUBJECT_PREFIX,
};

#[pyclass(name = "SelectorConfig", module = "cqprep")]
#[derive(Clone, Debug)]
pub struct PySelectorConfig {
    pub(crate) inner: SelectorConfig,
}

#[pymethods]
impl PySelectorConfig {
    #[new]
    #[pyo3(signature = (
        preselected=Vec::new(),
        in_observation=Vec::new(),
        excluded=Vec::new(),
        subject_prefix=Some(DEFAULT_SUBJECT_PREFIX.to_string()),
        subject_pattern=None,
        slice_threshold=DEFAULT_SLICE_THRESHOLD,
        skip_existing=false,
        sorted=true
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        preselected: Vec<String>,
        in_observation: Vec<String>,
        excluded: Vec<String>,
        subject_prefix: Option<String>,
        subject_pattern: Option<String>,
        slice_threshold: u16,
        skip_existing: bool,
        sorted: bool,
    ) -> PyResult<Self> {
        let overrides = OverrideLists::default()
            .with_preselected(preselected)
            .with_in_observation(in_observation)
            .with_excluded(excluded);

        let mut filter = SubjectFilter::accept_all();
        if let Some(prefix) = subject_prefix.filter(|p| !p.is_empty()) {
            filter = filter.with_prefix(prefix);
        }
        if let Some(pattern) = subject_pattern {
            filter = filter.with_pattern(&pattern).map_err(convert_error)?;
        }

        let inner = SelectorConfig::default()
            .with_overrides(overrides)
            .with_subject_filter(filter)
            .with_slice_threshold(slice_threshold)
            .with_overwrite(if skip_existing {
                OverwritePolicy::SkipExisting
            } else {
                OverwritePolicy::Always
            })
            .with_listing_order(if sorted {
                ListingOrder::Sorted
            } else {
                ListingOrder::Native
            });

        Ok(Self { inner })
    }

    #[staticmethod]
    fn default() -> Self {
        Self {
            inner: SelectorConfig::default(),
        }
    }

    /// Loads a configuration from a JSON file
    #[cfg(feature = "json")]
    #[staticmethod]
    fn from_json_file(path: &Bound<'_, PyAny>) -> PyResult<Self> {
        let path = super::utils::path_to_pathbuf(path)?;
        let inner = SelectorConfig::from_json_file(&path).map_err(convert_error)?;
        Ok(Self { inner })
    }

    #[getter]
    fn slice_threshold(&self) -> u16 {
        self.inner.slice_threshold
    }

    #[getter]
    fn skip_existing(&self) -> bool {
        !self.inner.overwrite.allows_overwrite()
    }

    #[getter]
    fn subject_prefix(&self) -> Option<String> {
        self.inner.subject_filter.prefix.clone()
    }

    #[getter]
    fn preselected(&self) -> Vec<String> {
        sorted_tokens(self.inner.overrides.preselected.iter())
    }

    #[getter]
    fn in_observation(&self) -> Vec<String> {
        sorted_tokens(self.inner.overrides.in_observation.iter())
    }

    #[getter]
    fn excluded(&self) -> Vec<String> {
        sorted_tokens(self.inner.overrides.excluded.iter())
    }

    fn __repr__(&self) -> String {
        format!(
            "SelectorConfig(slice_threshold={}, overwrite={}, listing_order={}, preselected={}, in_observation={}, excluded={})",
            self.inner.slice_threshold,
            self.inner.overwrite,
            self.inner.listing_order,
            self.inner.overrides.preselected.len(),
            self.inner.overrides.in_observation.len(),
            self.inner.overrides.excluded.len()
        )
    }
}

fn sorted_tokens<'a>(tokens: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut tokens: Vec<String> = tokens.cloned().collect();
    tokens.sort();
    tokens
}
