use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;

/// Caller-supplied lists that bypass the size/slice heuristic
///
/// Tokens are matched by exact name. `excluded` is checked against both the
/// subject directory name and the candidate file names; the two forcing
/// lists are checked against candidate file names only.
///
/// Precedence, highest first: excluded, preselected/in-observation,
/// heuristic.
///
/// # Example
///
/// ```
/// use cqprep_core::OverrideLists;
///
/// let overrides = OverrideLists::default()
///     .with_preselected(["CQ500CT1_CT PLAIN.nii.gz"])
///     .with_excluded(["CQ500CT7"]);
///
/// assert!(overrides.is_excluded("CQ500CT7", &["CQ500CT7_CT PLAIN.nii.gz"]));
/// assert_eq!(
///     overrides.first_forced(&["a.nii.gz", "CQ500CT1_CT PLAIN.nii.gz"]),
///     Some("CQ500CT1_CT PLAIN.nii.gz")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct OverrideLists {
    /// Files forced as the subject's selection
    pub preselected: HashSet<String>,

    /// Files under observation, forced the same way as preselected ones
    pub in_observation: HashSet<String>,

    /// Subjects or files whose subject produces no output at all
    pub excluded: HashSet<String>,
}

impl OverrideLists {
    /// Builder: add preselected tokens
    pub fn with_preselected<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preselected.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Builder: add in-observation tokens
    pub fn with_in_observation<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_observation.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Builder: add excluded tokens
    pub fn with_excluded<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Whether the subject, or any of its candidate files, is excluded
    pub fn is_excluded<S: AsRef<str>>(&self, subject: &str, candidates: &[S]) -> bool {
        self.excluded.contains(subject)
            || candidates
                .iter()
                .any(|name| self.excluded.contains(name.as_ref()))
    }

    /// Whether a file name is in either forcing list
    pub fn is_forced(&self, name: &str) -> bool {
        self.preselected.contains(name) || self.in_observation.contains(name)
    }

    /// Returns the first candidate (in the given order) found in either forcing list
    pub fn first_forced<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Option<&'a str> {
        candidates
            .iter()
            .map(|name| name.as_ref())
            .find(|name| self.is_forced(name))
    }

    /// Tokens present in `excluded` and in one of the forcing lists
    ///
    /// Exclusion wins for these, which is usually a mistake in the lists.
    pub fn conflicts(&self) -> Vec<&str> {
        let mut conflicts: Vec<&str> = self
            .excluded
            .iter()
            .filter(|token| self.is_forced(token))
            .map(String::as_str)
            .collect();
        conflicts.sort_unstable();
        conflicts
    }

    /// Returns true if no list holds any token
    pub fn is_empty(&self) -> bool {
        self.preselected.is_empty() && self.in_observation.is_empty() && self.excluded.is_empty()
    }
}

/// Reads a token list file: one name per line, blank lines and `#` comments ignored
pub fn read_token_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_tokens(&content))
}

fn parse_tokens(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_excluded_by_subject_name() {
        let overrides = OverrideLists::default().with_excluded(["S3"]);
        let none: [&str; 0] = [];
        assert!(overrides.is_excluded("S3", &none));
        assert!(!overrides.is_excluded("S4", &none));
    }

    #[test]
    fn test_excluded_by_file_name() {
        let overrides = OverrideLists::default().with_excluded(["bad.nii.gz"]);
        assert!(overrides.is_excluded("S1", &["good.nii.gz", "bad.nii.gz"]));
        assert!(!overrides.is_excluded("S1", &["good.nii.gz"]));
    }

    #[test]
    fn test_first_forced_follows_candidate_order() {
        let overrides = OverrideLists::default()
            .with_preselected(["c.nii.gz"])
            .with_in_observation(["b.nii.gz"]);

        let candidates = ["a.nii.gz", "b.nii.gz", "c.nii.gz"];
        assert_eq!(overrides.first_forced(&candidates), Some("b.nii.gz"));

        let reversed = ["c.nii.gz", "b.nii.gz", "a.nii.gz"];
        assert_eq!(overrides.first_forced(&reversed), Some("c.nii.gz"));
    }

    #[test]
    fn test_first_forced_none() {
        let overrides = OverrideLists::default().with_preselected(["x.nii.gz"]);
        assert_eq!(overrides.first_forced(&["a.nii.gz"]), None);
    }

    #[test]
    fn test_conflicts() {
        let overrides = OverrideLists::default()
            .with_preselected(["a", "b"])
            .with_in_observation(["c"])
            .with_excluded(["b", "c", "d"]);

        assert_eq!(overrides.conflicts(), vec!["b", "c"]);
    }

    #[test]
    fn test_read_token_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# preselected volumes").unwrap();
        writeln!(file, "CQ500CT1_CT 4cc sec 150cc D3D on.nii.gz").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  CQ500CT9_CT PLAIN THIN.nii.gz  ").unwrap();

        let tokens = read_token_file(file.path()).unwrap();
        assert_eq!(
            tokens,
            vec![
                "CQ500CT1_CT 4cc sec 150cc D3D on.nii.gz",
                "CQ500CT9_CT PLAIN THIN.nii.gz"
            ]
        );
    }
}
