use crate::convert::{ConversionReport, ConversionStatus};
use crate::fetch::{DownloadStatus, ExtractionStatus, FetchReport};
use crate::registration::{EstimationKind, RegistrationJob};
use crate::selection::{Decision, SelectionReport};
use std::fmt;

/// Text report formatter for a selection run
pub struct TextReport<'a> {
    report: &'a SelectionReport,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a SelectionReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Volume Selection")?;
        writeln!(f, "================")?;
        writeln!(f)?;
        writeln!(f, "Images:   {}", self.report.images_folder.display())?;
        writeln!(f, "Output:   {}", self.report.output_folder.display())?;
        writeln!(f)?;

        for outcome in &self.report.outcomes {
            write!(f, "{}: ", outcome.subject)?;
            match &outcome.decision {
                Decision::Excluded => writeln!(f, "excluded")?,
                Decision::Empty => writeln!(f, "no candidate volumes")?,
                Decision::Forced { candidate } => {
                    writeln!(f, "{} (preselected)", candidate.file_name)?
                }
                Decision::Heuristic { candidate, dims } => {
                    writeln!(f, "{} ({})", candidate.file_name, dims)?
                }
                Decision::Fallback { candidate } => {
                    writeln!(f, "{} (largest, over threshold)", candidate.file_name)?
                }
                Decision::Failed { reason } => writeln!(f, "FAILED: {}", reason)?,
            }
            if outcome.output.is_some() && !outcome.copied {
                writeln!(f, "  kept existing copy")?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Selected {} of {} subjects ({} failed)",
            self.report.selected().len(),
            self.report.outcomes.len(),
            self.report.failures().count()
        )?;

        Ok(())
    }
}

/// Text report formatter for a fetch run
pub struct FetchTextReport<'a> {
    report: &'a FetchReport,
}

impl<'a> FetchTextReport<'a> {
    pub fn new(report: &'a FetchReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for FetchTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset Fetch")?;
        writeln!(f, "=============")?;
        writeln!(f)?;
        writeln!(f, "Manifest: {}", self.report.manifest.display())?;
        writeln!(f)?;

        for item in &self.report.items {
            let name = item
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.url.clone());
            let download = match &item.download {
                DownloadStatus::Downloaded { bytes } => format!("downloaded {} bytes", bytes),
                DownloadStatus::AlreadyPresent => "already present".to_string(),
                DownloadStatus::Failed { reason } => format!("download FAILED: {}", reason),
            };
            write!(f, "{}: {}", name, download)?;
            match &item.extraction {
                Some(ExtractionStatus::Extracted { entries }) => {
                    writeln!(f, ", extracted {} entries", entries)?
                }
                Some(ExtractionStatus::AlreadyExtracted) => writeln!(f, ", already extracted")?,
                Some(ExtractionStatus::Corrupt { reason }) => {
                    writeln!(f, ", corrupt archive: {}", reason)?
                }
                None => writeln!(f)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "{} downloaded, {} extracted, {} problems",
            self.report.downloaded(),
            self.report.extracted(),
            self.report.problems().count()
        )?;

        Ok(())
    }
}

/// Text report formatter for a conversion run
pub struct ConversionTextReport<'a> {
    report: &'a ConversionReport,
}

impl<'a> ConversionTextReport<'a> {
    pub fn new(report: &'a ConversionReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for ConversionTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series Conversion")?;
        writeln!(f, "=================")?;
        writeln!(f)?;
        writeln!(f, "Output:   {}", self.report.output_dir.display())?;
        writeln!(f)?;

        for converted in &self.report.series {
            write!(f, "{}: ", converted.job.output.display())?;
            match &converted.status {
                ConversionStatus::Converted { series } => match series
                    .as_ref()
                    .and_then(|s| s.series_instance_uid.as_deref())
                {
                    Some(uid) => writeln!(f, "converted (series {})", uid)?,
                    None => writeln!(f, "converted")?,
                },
                ConversionStatus::AlreadyExists => writeln!(f, "already exists")?,
                ConversionStatus::Failed { reason } => writeln!(f, "FAILED: {}", reason)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "{} converted, {} skipped, {} failed",
            self.report.converted(),
            self.report.skipped(),
            self.report.failures().count()
        )?;

        Ok(())
    }
}

/// Text report formatter for an assembled registration job
pub struct JobTextReport<'a> {
    kind: EstimationKind,
    job: &'a RegistrationJob,
}

impl<'a> JobTextReport<'a> {
    pub fn new(kind: EstimationKind, job: &'a RegistrationJob) -> Self {
        Self { kind, job }
    }
}

impl<'a> fmt::Display for JobTextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registration Job")?;
        writeln!(f, "================")?;
        writeln!(f)?;
        writeln!(f, "Estimation:     {}", self.kind)?;
        writeln!(f, "Output:         {}", self.job.output_dir.display())?;
        writeln!(f, "Verbosity:      {}", self.job.verbosity)?;
        writeln!(f)?;

        writeln!(f, "Template")?;
        writeln!(f, "--------")?;
        for (name, object) in &self.job.template.objects {
            writeln!(f, "{}: {}", name, object.filename.display())?;
            writeln!(f, "  Type:         {}", object.deformable_object_type)?;
            writeln!(
                f,
                "  Kernel:       {} (width {})",
                object.kernel_type, object.kernel_width
            )?;
            writeln!(f, "  Noise std:    {}", object.noise_std)?;
            writeln!(f, "  Attachment:   {}", object.attachment_type)?;
        }
        writeln!(f)?;

        writeln!(f, "Dataset ({} subjects)", self.job.dataset.len())?;
        writeln!(f, "-------")?;
        for (id, groups) in self
            .job
            .dataset
            .subject_ids
            .iter()
            .zip(&self.job.dataset.dataset_filenames)
        {
            for group in groups {
                for (object, path) in group {
                    writeln!(f, "{} [{}]: {}", id, object, path.display())?;
                }
            }
        }
        writeln!(f)?;

        let model = &self.job.model;
        writeln!(f, "Model")?;
        writeln!(f, "-----")?;
        writeln!(
            f,
            "Deformation:    {} (width {})",
            model.deformation_kernel_type, model.deformation_kernel_width
        )?;
        writeln!(f, "Dtype:          {}", model.dtype)?;
        writeln!(f)?;

        let estimator = &self.job.estimator;
        writeln!(f, "Estimator")?;
        writeln!(f, "---------")?;
        writeln!(f, "Method:         {}", estimator.optimization_method_type)?;
        writeln!(f, "Initial step:   {}", estimator.initial_step_size)?;
        writeln!(f, "Max iterations: {}", estimator.max_iterations)?;
        writeln!(
            f,
            "Line search:    {}",
            estimator.max_line_search_iterations
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::RegistrationRequest;
    use crate::selection::SubjectOutcome;
    use crate::types::{CandidateVolume, VolumeDims};
    use std::path::PathBuf;

    fn candidate(name: &str) -> CandidateVolume {
        CandidateVolume {
            path: PathBuf::from("/images/S").join(name),
            file_name: name.to_string(),
            size_bytes: 10,
        }
    }

    #[test]
    fn test_selection_text_report() {
        let report = SelectionReport {
            images_folder: PathBuf::from("/images"),
            output_folder: PathBuf::from("/images/selected"),
            outcomes: vec![
                SubjectOutcome {
                    subject: "CQ500CT1".to_string(),
                    decision: Decision::Heuristic {
                        candidate: candidate("CQ500CT1_CT PLAIN.nii.gz"),
                        dims: VolumeDims::new(512, 512, 240),
                    },
                    output: Some(PathBuf::from("/images/selected/CQ500CT1_CT PLAIN.nii.gz")),
                    copied: true,
                },
                SubjectOutcome::without_output("CQ500CT2", Decision::Excluded),
            ],
        };

        let output = format!("{}", TextReport::new(&report));

        assert!(output.contains("Volume Selection"));
        assert!(output.contains("CQ500CT1: CQ500CT1_CT PLAIN.nii.gz (512x512x240)"));
        assert!(output.contains("CQ500CT2: excluded"));
        assert!(output.contains("Selected 1 of 2 subjects (0 failed)"));
    }

    #[test]
    fn test_job_text_report() {
        let job = RegistrationRequest::new("/t/skull.vtk", ["/t/s1.vtk"])
            .assemble(EstimationKind::Registration);

        let output = format!("{}", JobTextReport::new(EstimationKind::Registration, &job));

        assert!(output.contains("Estimation:     registration"));
        assert!(output.contains("Output:         /t/reg_skull"));
        assert!(output.contains("  Type:         SurfaceMesh"));
        assert!(output.contains("s1 [skull]: /t/s1.vtk"));
        assert!(output.contains("Max iterations: 25"));
    }
}
