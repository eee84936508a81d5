//! DICOM series to NIfTI conversion
//!
//! Walks a downloaded dataset tree, treats every leaf directory (files and
//! no subdirectories) as one series, and converts it into
//! `{output}/{subject}/{subject}_{leaf}.nii.gz`, where `subject` is the
//! first path component below the input root.

mod dcm2niix;
mod series;

pub use dcm2niix::{Dcm2NiixConverter, SeriesConverter, VOLUME_EXTENSION};
pub use series::SeriesInfo;

use crate::error::{PrepError, Result};
use crate::types::OverwritePolicy;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the output folder created inside the input folder by default
pub const DEFAULT_CONVERTED_DIR: &str = "converted";

/// A leaf directory scheduled for conversion
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SeriesJob {
    /// First path component below the input root
    pub subject: String,

    /// Directory holding the slices
    pub source: PathBuf,

    /// Volume file to produce
    pub output: PathBuf,
}

/// What happened to one series
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "kebab-case"))]
pub enum ConversionStatus {
    Converted { series: Option<SeriesInfo> },
    AlreadyExists,
    Failed { reason: String },
}

/// Result of converting one series
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ConvertedSeries {
    pub job: SeriesJob,
    pub status: ConversionStatus,
}

/// Result of a conversion run
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ConversionReport {
    pub output_dir: PathBuf,
    pub series: Vec<ConvertedSeries>,
}

impl ConversionReport {
    /// Number of series converted during this run
    pub fn converted(&self) -> usize {
        self.series
            .iter()
            .filter(|s| matches!(s.status, ConversionStatus::Converted { .. }))
            .count()
    }

    /// Number of series whose output already existed
    pub fn skipped(&self) -> usize {
        self.series
            .iter()
            .filter(|s| s.status == ConversionStatus::AlreadyExists)
            .count()
    }

    /// Series that failed to convert
    pub fn failures(&self) -> impl Iterator<Item = &ConvertedSeries> {
        self.series
            .iter()
            .filter(|s| matches!(s.status, ConversionStatus::Failed { .. }))
    }
}

/// Converts every series of a dataset tree
pub struct VolumeConverter<C = Dcm2NiixConverter> {
    converter: C,
    overwrite: OverwritePolicy,
}

impl VolumeConverter<Dcm2NiixConverter> {
    /// Creates a converter running `dcm2niix` from `PATH`
    pub fn new() -> Self {
        Self::with_converter(Dcm2NiixConverter::default())
    }
}

impl Default for VolumeConverter<Dcm2NiixConverter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SeriesConverter> VolumeConverter<C> {
    /// Creates a converter over a custom series converter
    ///
    /// Existing outputs are kept by default.
    pub fn with_converter(converter: C) -> Self {
        Self {
            converter,
            overwrite: OverwritePolicy::SkipExisting,
        }
    }

    /// Builder: set the overwrite policy
    pub fn with_overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Lists the series under `input`, excluding anything inside `output_dir`
    ///
    /// Jobs are returned in path order.
    pub fn plan(&self, input: &Path, output_dir: &Path) -> Result<Vec<SeriesJob>> {
        let mut jobs = Vec::new();
        let walker = WalkDir::new(input)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != output_dir);

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() || !is_leaf(entry.path())? {
                continue;
            }
            if let Some(job) = series_job(input, entry.path(), output_dir) {
                jobs.push(job);
            }
        }

        Ok(jobs)
    }

    /// Converts every series under `input`
    ///
    /// `output_dir` defaults to `{input}/converted`. One series failing is
    /// logged and recorded; the walk continues.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is not a directory, the output folder
    /// cannot be created, or the tree cannot be walked
    pub fn run(&self, input: &Path, output_dir: Option<&Path>) -> Result<ConversionReport> {
        if !input.is_dir() {
            return Err(PrepError::NotADirectory(input.to_path_buf()));
        }
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.join(DEFAULT_CONVERTED_DIR));
        std::fs::create_dir_all(&output_dir)?;

        let jobs = self.plan(input, &output_dir)?;
        info!("Found {} series under {}", jobs.len(), input.display());

        let series = jobs.into_iter().map(|job| self.convert_job(input, job)).collect();

        Ok(ConversionReport { output_dir, series })
    }

    fn convert_job(&self, input: &Path, job: SeriesJob) -> ConvertedSeries {
        let rel = job.source.strip_prefix(input).unwrap_or(&job.source);
        info!("Converting {}", rel.display());

        if job.output.exists() && !self.overwrite.allows_overwrite() {
            info!("  File already exists, skipping...");
            return ConvertedSeries {
                job,
                status: ConversionStatus::AlreadyExists,
            };
        }

        let series = match SeriesInfo::from_dir(&job.source) {
            Ok(info) => {
                info!(
                    "  Series {} ({}, {} files)",
                    info.series_instance_uid.as_deref().unwrap_or("?"),
                    info.series_description.as_deref().unwrap_or("no description"),
                    info.file_count
                );
                Some(info)
            }
            Err(e) => {
                warn!("  Cannot describe series: {}", e);
                None
            }
        };

        let status = match self.prepare_and_convert(&job) {
            Ok(()) => {
                info!("  Converted to {}", job.output.display());
                ConversionStatus::Converted { series }
            }
            Err(e) => {
                error!("  Conversion of {} failed: {}", rel.display(), e);
                ConversionStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        ConvertedSeries { job, status }
    }

    fn prepare_and_convert(&self, job: &SeriesJob) -> Result<()> {
        if let Some(parent) = job.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.converter.convert(&job.source, &job.output)
    }
}

/// A directory with at least one file and no subdirectories
fn is_leaf(dir: &Path) -> Result<bool> {
    let mut has_file = false;
    for entry in std::fs::read_dir(dir)? {
        let file_type = entry?.file_type()?;
        if file_type.is_dir() {
            return Ok(false);
        }
        has_file |= file_type.is_file();
    }
    Ok(has_file)
}

/// Builds the job for a leaf, or `None` if its path is not valid UTF-8
fn series_job(input: &Path, leaf: &Path, output_dir: &Path) -> Option<SeriesJob> {
    let rel = leaf.strip_prefix(input).ok()?;
    let subject = rel.components().next()?.as_os_str().to_str()?.to_string();
    let leaf_name = leaf.file_name()?.to_str()?;
    let file_name = format!("{}_{}{}", subject, leaf_name, VOLUME_EXTENSION);

    Some(SeriesJob {
        output: output_dir.join(&subject).join(file_name),
        source: leaf.to_path_buf(),
        subject,
    })
}

/// Converts a dataset tree with `dcm2niix`, returning the output folder
pub fn convert_nifti(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let report = VolumeConverter::new().run(input, output_dir)?;
    Ok(report.output_dir)
}

#[cfg(test)]
mod tests {
    use super::series::tests::write_dicom;
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Writes the series' file list as the "volume" and records calls
    #[derive(Default)]
    struct ListingConverter {
        calls: RefCell<Vec<PathBuf>>,
        fail_on: Option<String>,
    }

    impl SeriesConverter for ListingConverter {
        fn convert(&self, series_dir: &Path, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push(series_dir.to_path_buf());
            if let Some(fail) = &self.fail_on {
                if series_dir.ends_with(fail) {
                    return Err(PrepError::ConversionError("bad series".to_string()));
                }
            }
            let count = fs::read_dir(series_dir).unwrap().count();
            fs::write(output, format!("{} slices", count))?;
            Ok(())
        }
    }

    /// input/
    ///   CQ500CT1 CQ500CT1/Unknown Study/CT PLAIN/{IM1, IM2}
    ///   CQ500CT1 CQ500CT1/Unknown Study/CT BONE/{IM1}
    ///   CQ500CT2 CQ500CT2/Unknown Study/CT 0.625mm/{IM1}
    ///   CQ500CT3 CQ500CT3/           (empty)
    ///   cq500_files.txt
    fn dataset(root: &Path) -> PathBuf {
        let input = root.join("cq500");
        let series = [
            ("CQ500CT1 CQ500CT1/Unknown Study/CT PLAIN", 2),
            ("CQ500CT1 CQ500CT1/Unknown Study/CT BONE", 1),
            ("CQ500CT2 CQ500CT2/Unknown Study/CT 0.625mm", 1),
        ];
        for (dir, files) in series {
            let dir = input.join(dir);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..files {
                write_dicom(&dir.join(format!("IM{}", i + 1)), "1.2.3", "CT");
            }
        }
        fs::create_dir_all(input.join("CQ500CT3 CQ500CT3")).unwrap();
        fs::write(input.join("cq500_files.txt"), b"").unwrap();
        input
    }

    #[test]
    fn test_plan_finds_leaves_and_names_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        let out = input.join(DEFAULT_CONVERTED_DIR);

        let jobs = VolumeConverter::with_converter(ListingConverter::default())
            .plan(&input, &out)
            .unwrap();

        let outputs: Vec<_> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                out.join("CQ500CT1 CQ500CT1/CQ500CT1 CQ500CT1_CT BONE.nii.gz"),
                out.join("CQ500CT1 CQ500CT1/CQ500CT1 CQ500CT1_CT PLAIN.nii.gz"),
                out.join("CQ500CT2 CQ500CT2/CQ500CT2 CQ500CT2_CT 0.625mm.nii.gz"),
            ]
        );
        assert_eq!(jobs[0].subject, "CQ500CT1 CQ500CT1");
    }

    #[test]
    fn test_run_converts_and_describes() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        let converter = VolumeConverter::with_converter(ListingConverter::default());

        let report = converter.run(&input, None).unwrap();

        assert_eq!(report.output_dir, input.join("converted"));
        assert_eq!(report.converted(), 3);
        let plain = report.output_dir.join("CQ500CT1 CQ500CT1/CQ500CT1 CQ500CT1_CT PLAIN.nii.gz");
        assert_eq!(fs::read_to_string(plain).unwrap(), "2 slices");
        match &report.series[0].status {
            ConversionStatus::Converted { series: Some(info) } => {
                assert_eq!(info.series_instance_uid.as_deref(), Some("1.2.3"));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_rerun_skips_existing_outputs_and_output_tree() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        VolumeConverter::with_converter(ListingConverter::default())
            .run(&input, None)
            .unwrap();

        let converter = VolumeConverter::with_converter(ListingConverter::default());
        let report = converter.run(&input, None).unwrap();

        assert_eq!(report.series.len(), 3);
        assert_eq!(report.skipped(), 3);
        assert!(converter.converter.calls.borrow().is_empty());
    }

    #[test]
    fn test_overwrite_policy_reconverts() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        VolumeConverter::with_converter(ListingConverter::default())
            .run(&input, None)
            .unwrap();

        let report = VolumeConverter::with_converter(ListingConverter::default())
            .with_overwrite(OverwritePolicy::Always)
            .run(&input, None)
            .unwrap();

        assert_eq!(report.converted(), 3);
    }

    #[test]
    fn test_failure_does_not_stop_the_walk() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        let converter = VolumeConverter::with_converter(ListingConverter {
            fail_on: Some("CT BONE".to_string()),
            ..Default::default()
        });

        let report = converter.run(&input, None).unwrap();

        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.converted(), 2);
        assert_eq!(converter.converter.calls.borrow().len(), 3);
    }

    #[test]
    fn test_external_output_dir_is_not_walked() {
        let temp_dir = TempDir::new().unwrap();
        let input = dataset(temp_dir.path());
        let out = temp_dir.path().join("nifti");

        let report = VolumeConverter::with_converter(ListingConverter::default())
            .run(&input, Some(&out))
            .unwrap();

        assert_eq!(report.converted(), 3);
        assert!(out.join("CQ500CT2 CQ500CT2").is_dir());
        assert!(!input.join(DEFAULT_CONVERTED_DIR).exists());
    }

    #[test]
    fn test_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let result = VolumeConverter::with_converter(ListingConverter::default())
            .run(&temp_dir.path().join("missing"), None);

        assert!(matches!(result, Err(PrepError::NotADirectory(_))));
    }
}
