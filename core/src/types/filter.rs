use crate::error::Result;
use regex::Regex;

/// Default prefix of CQ500 subject directories
pub const DEFAULT_SUBJECT_PREFIX: &str = "CQ500";

/// Predicate deciding which directories under the images folder are subjects
///
/// A directory is a subject when its name starts with `prefix` (if set),
/// matches `pattern` (if set), and does not start with any of the
/// `skip_prefixes`. The output folder's base name is added to
/// `skip_prefixes` by the selector so a destination nested inside the
/// images folder is never rescanned as a subject.
///
/// # Example
///
/// ```
/// use cqprep_core::SubjectFilter;
///
/// let filter = SubjectFilter::default().skip_prefix("selected");
/// assert!(filter.accepts("CQ500CT12 CQ500CT12"));
/// assert!(!filter.accepts("selected"));
/// assert!(!filter.accepts("notes"));
/// ```
#[derive(Debug, Clone)]
pub struct SubjectFilter {
    /// Required name prefix
    pub prefix: Option<String>,

    /// Optional regular expression the name must match
    pub pattern: Option<Regex>,

    /// Prefixes that disqualify a directory
    pub skip_prefixes: Vec<String>,
}

impl Default for SubjectFilter {
    fn default() -> Self {
        Self {
            prefix: Some(DEFAULT_SUBJECT_PREFIX.to_string()),
            pattern: None,
            skip_prefixes: Vec::new(),
        }
    }
}

impl SubjectFilter {
    /// Creates a filter that accepts every directory
    pub fn accept_all() -> Self {
        Self {
            prefix: None,
            pattern: None,
            skip_prefixes: Vec::new(),
        }
    }

    /// Builder: set the required prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builder: set a regular expression the name must match
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the expression does not compile
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Builder: add a prefix that disqualifies a directory
    pub fn skip_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.is_empty() && !self.skip_prefixes.contains(&prefix) {
            self.skip_prefixes.push(prefix);
        }
        self
    }

    /// Checks whether a directory name is a subject
    pub fn accepts(&self, name: &str) -> bool {
        if let Some(prefix) = &self.prefix {
            if !name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(name) {
                return false;
            }
        }
        !self
            .skip_prefixes
            .iter()
            .any(|skip| name.starts_with(skip.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let filter = SubjectFilter::default();
        assert!(filter.accepts("CQ500CT0 CQ500CT0"));
        assert!(!filter.accepts("cq500_files.txt"));
        assert!(!filter.accepts("converted"));
    }

    #[test]
    fn test_skip_prefix_wins() {
        let filter = SubjectFilter::default().skip_prefix("CQ500_selected");
        assert!(filter.accepts("CQ500CT3"));
        assert!(!filter.accepts("CQ500_selected"));
    }

    #[test]
    fn test_skip_prefix_ignores_empty_and_duplicates() {
        let filter = SubjectFilter::accept_all()
            .skip_prefix("")
            .skip_prefix("out")
            .skip_prefix("out");
        assert_eq!(filter.skip_prefixes, vec!["out".to_string()]);
        assert!(filter.accepts("anything"));
    }

    #[test]
    fn test_pattern() {
        let filter = SubjectFilter::accept_all()
            .with_pattern(r"^S\d+$")
            .unwrap();
        assert!(filter.accepts("S1"));
        assert!(filter.accepts("S42"));
        assert!(!filter.accepts("S1_old"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(SubjectFilter::accept_all().with_pattern("(").is_err());
    }
}
