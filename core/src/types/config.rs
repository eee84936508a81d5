use super::{ListingOrder, OverrideLists, OverwritePolicy, SubjectFilter};

/// Slice count at or above which a volume is assumed to extend beyond the head
pub const DEFAULT_SLICE_THRESHOLD: u16 = 300;

/// Configuration of a volume selection run
///
/// # Example
///
/// ```
/// use cqprep_core::{OverrideLists, OverwritePolicy, SelectorConfig};
///
/// let config = SelectorConfig::default()
///     .with_overrides(OverrideLists::default().with_excluded(["CQ500CT5"]))
///     .with_overwrite(OverwritePolicy::SkipExisting)
///     .with_slice_threshold(250);
///
/// assert_eq!(config.slice_threshold, 250);
/// assert!(config.overrides.excluded.contains("CQ500CT5"));
/// ```
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Override lists
    pub overrides: OverrideLists,

    /// Which directories count as subjects
    pub subject_filter: SubjectFilter,

    /// A heuristic candidate must have strictly fewer slices than this
    pub slice_threshold: u16,

    /// What to do when the destination file exists
    pub overwrite: OverwritePolicy,

    /// Order of subjects and candidates
    pub listing_order: ListingOrder,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            overrides: OverrideLists::default(),
            subject_filter: SubjectFilter::default(),
            slice_threshold: DEFAULT_SLICE_THRESHOLD,
            overwrite: OverwritePolicy::Always,
            listing_order: ListingOrder::Sorted,
        }
    }
}

impl SelectorConfig {
    /// Builder: set override lists
    pub fn with_overrides(mut self, overrides: OverrideLists) -> Self {
        self.overrides = overrides;
        self
    }

    /// Builder: set the subject filter
    pub fn with_subject_filter(mut self, filter: SubjectFilter) -> Self {
        self.subject_filter = filter;
        self
    }

    /// Builder: set the slice threshold
    pub fn with_slice_threshold(mut self, threshold: u16) -> Self {
        self.slice_threshold = threshold;
        self
    }

    /// Builder: set the overwrite policy
    pub fn with_overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Builder: set the listing order
    pub fn with_listing_order(mut self, order: ListingOrder) -> Self {
        self.listing_order = order;
        self
    }
}

#[cfg(feature = "json")]
mod file {
    use super::*;
    use crate::error::Result;
    use std::path::Path;

    /// On-disk form of [`SelectorConfig`]
    ///
    /// Every field is optional; missing fields keep their defaults.
    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct SelectorConfigFile {
        overrides: OverrideLists,
        subject_prefix: Option<String>,
        subject_pattern: Option<String>,
        slice_threshold: Option<u16>,
        overwrite: Option<OverwritePolicy>,
        listing_order: Option<ListingOrder>,
    }

    impl SelectorConfig {
        /// Loads a configuration from a JSON file
        ///
        /// # Errors
        ///
        /// Returns an error if the file cannot be read, is not valid JSON,
        /// or holds an invalid subject pattern
        pub fn from_json_file(path: &Path) -> Result<Self> {
            let content = std::fs::read_to_string(path)?;
            Self::from_json_str(&content)
        }

        /// Parses a configuration from a JSON string
        pub fn from_json_str(content: &str) -> Result<Self> {
            let file: SelectorConfigFile = serde_json::from_str(content)?;
            let defaults = SelectorConfig::default();

            let mut filter = SubjectFilter::default();
            if let Some(prefix) = file.subject_prefix {
                filter.prefix = if prefix.is_empty() { None } else { Some(prefix) };
            }
            if let Some(pattern) = file.subject_pattern {
                filter = filter.with_pattern(&pattern)?;
            }

            Ok(Self {
                overrides: file.overrides,
                subject_filter: filter,
                slice_threshold: file.slice_threshold.unwrap_or(defaults.slice_threshold),
                overwrite: file.overwrite.unwrap_or(defaults.overwrite),
                listing_order: file.listing_order.unwrap_or(defaults.listing_order),
            })
        }
    }
}
