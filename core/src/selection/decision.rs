use crate::types::{CandidateVolume, VolumeDims};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How a subject's volume was chosen, or why none was
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum Decision {
    /// Subject name or one of its files is in the excluded list
    Excluded,

    /// Subject directory holds no files
    Empty,

    /// A file from the preselected or in-observation list
    Forced { candidate: CandidateVolume },

    /// Largest file whose slice count is under the threshold
    Heuristic {
        candidate: CandidateVolume,
        dims: VolumeDims,
    },

    /// No file was under the threshold; the largest one was taken
    Fallback { candidate: CandidateVolume },

    /// Listing, probing or copying failed for this subject
    Failed { reason: String },
}

impl Decision {
    /// The chosen candidate, if any
    pub fn candidate(&self) -> Option<&CandidateVolume> {
        match self {
            Decision::Forced { candidate }
            | Decision::Heuristic { candidate, .. }
            | Decision::Fallback { candidate } => Some(candidate),
            Decision::Excluded | Decision::Empty | Decision::Failed { .. } => None,
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            Decision::Excluded => "excluded",
            Decision::Empty => "empty",
            Decision::Forced { .. } => "preselected",
            Decision::Heuristic { .. } => "heuristic",
            Decision::Fallback { .. } => "fallback",
            Decision::Failed { .. } => "failed",
        }
    }
}

/// Selection result of one subject
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SubjectOutcome {
    /// Subject identifier (directory name)
    pub subject: String,

    /// What was decided
    pub decision: Decision,

    /// Path of the file in the output folder
    pub output: Option<PathBuf>,

    /// Whether bytes were written to `output` during this run
    pub copied: bool,
}

impl SubjectOutcome {
    /// Creates an outcome that produced no output file
    pub fn without_output(subject: impl Into<String>, decision: Decision) -> Self {
        Self {
            subject: subject.into(),
            decision,
            output: None,
            copied: false,
        }
    }
}

/// Result of a selection run over an images folder
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SelectionReport {
    /// Folder that was scanned for subjects
    pub images_folder: PathBuf,

    /// Folder that received the selected volumes
    pub output_folder: PathBuf,

    /// One entry per subject, in processing order
    pub outcomes: Vec<SubjectOutcome>,
}

impl SelectionReport {
    /// Subject identifier to copied output path
    ///
    /// Excluded, empty and failed subjects have no entry.
    pub fn selected(&self) -> BTreeMap<String, PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| o.output.clone().map(|path| (o.subject.clone(), path)))
            .collect()
    }

    /// Outcome of one subject
    pub fn outcome(&self, subject: &str) -> Option<&SubjectOutcome> {
        self.outcomes.iter().find(|o| o.subject == subject)
    }

    /// Number of outcomes with the given decision name
    pub fn count(&self, simple_name: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision.simple_name() == simple_name)
            .count()
    }

    /// Subjects whose processing failed
    pub fn failures(&self) -> impl Iterator<Item = &SubjectOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.decision, Decision::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, size: u64) -> CandidateVolume {
        CandidateVolume {
            path: PathBuf::from(format!("/in/S1/{}", name)),
            file_name: name.to_string(),
            size_bytes: size,
        }
    }

    #[test]
    fn test_decision_candidate() {
        let forced = Decision::Forced {
            candidate: candidate("pre.nii.gz", 5),
        };
        assert_eq!(forced.candidate().unwrap().file_name, "pre.nii.gz");
        assert!(Decision::Excluded.candidate().is_none());
        assert!(Decision::Failed {
            reason: "io".to_string()
        }
        .candidate()
        .is_none());
    }

    #[test]
    fn test_report_selected_skips_missing_outputs() {
        let report = SelectionReport {
            images_folder: PathBuf::from("/in"),
            output_folder: PathBuf::from("/out"),
            outcomes: vec![
                SubjectOutcome {
                    subject: "S1".to_string(),
                    decision: Decision::Fallback {
                        candidate: candidate("a.nii.gz", 10),
                    },
                    output: Some(PathBuf::from("/out/a.nii.gz")),
                    copied: true,
                },
                SubjectOutcome::without_output("S3", Decision::Excluded),
            ],
        };

        let selected = report.selected();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected["S1"], PathBuf::from("/out/a.nii.gz"));
        assert_eq!(report.count("excluded"), 1);
        assert_eq!(report.count("fallback"), 1);
        assert_eq!(report.failures().count(), 0);
    }
}
