use std::fmt;

/// Policy applied when a destination file already exists
///
/// The selector copies unconditionally by default so that a changed
/// selection overwrites a previous run. The converter keeps the first
/// output it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum OverwritePolicy {
    /// Always write, replacing any existing file
    #[default]
    Always,

    /// Leave an existing destination untouched
    SkipExisting,
}

impl OverwritePolicy {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            OverwritePolicy::Always => "always",
            OverwritePolicy::SkipExisting => "skip-existing",
        }
    }

    /// Whether a write to an existing destination should proceed
    pub fn allows_overwrite(&self) -> bool {
        matches!(self, OverwritePolicy::Always)
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Order in which directory entries are visited
///
/// `read_dir` order depends on the filesystem, so `Sorted` is the default
/// to keep override tie-breaks and subject iteration reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum ListingOrder {
    /// Lexicographic by file name
    #[default]
    Sorted,

    /// Whatever order the filesystem returns
    Native,
}

impl ListingOrder {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            ListingOrder::Sorted => "sorted",
            ListingOrder::Native => "native",
        }
    }

    /// Applies this ordering to a list of entry names in place
    pub fn apply(&self, names: &mut [String]) {
        if let ListingOrder::Sorted = self {
            names.sort();
        }
    }
}

impl fmt::Display for ListingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}
