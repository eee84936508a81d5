use super::decision::{Decision, SelectionReport, SubjectOutcome};
use super::probe::{NiftiProbe, VolumeProbe};
use crate::error::{PrepError, Result};
use crate::store::{copy_into, CopyOutcome};
use crate::types::{SelectorConfig, Subject, SubjectFilter};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

/// Name of the output folder created inside the images folder by default
pub const DEFAULT_OUTPUT_DIR: &str = "selected";

/// Picks one volume per subject and copies it to an output folder
///
/// Per subject, in order of precedence:
/// 1. excluded subject or file: no output
/// 2. a preselected or in-observation file: the first one in listing order
/// 3. the largest file (by bytes) whose slice count is under the threshold
/// 4. the largest file, when none is under the threshold
pub struct VolumeSelector<P = NiftiProbe> {
    config: SelectorConfig,
    probe: P,
}

impl VolumeSelector<NiftiProbe> {
    /// Creates a selector probing NIfTI headers
    pub fn new(config: SelectorConfig) -> Self {
        Self::with_probe(config, NiftiProbe)
    }
}

impl<P: VolumeProbe> VolumeSelector<P> {
    /// Creates a selector with a custom volume probe
    pub fn with_probe(config: SelectorConfig, probe: P) -> Self {
        Self { config, probe }
    }

    /// Returns the configuration
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Decides which candidate of a subject to keep
    ///
    /// Exclusion and override checks only use the listing. The probe is
    /// called on the heuristic path only, largest file first, and stops at
    /// the first file under the threshold.
    ///
    /// # Errors
    ///
    /// Returns the probe's error if a visited candidate cannot be read
    pub fn decide(&self, subject: &Subject) -> Result<Decision> {
        let names = subject.file_names();
        let overrides = &self.config.overrides;

        if overrides.is_excluded(&subject.name, names.as_slice()) {
            return Ok(Decision::Excluded);
        }

        if let Some(forced) = overrides.first_forced(names.as_slice()) {
            let candidate = subject
                .candidates
                .iter()
                .find(|c| c.file_name == forced)
                .cloned()
                .ok_or_else(|| PrepError::InvalidConfig(format!("{} vanished", forced)))?;
            return Ok(Decision::Forced { candidate });
        }

        let by_size = subject.by_size_desc();
        let Some(largest) = by_size.first() else {
            return Ok(Decision::Empty);
        };

        for candidate in &by_size {
            let dims = self.probe.dims(&candidate.path)?;
            debug!(
                "{}: {} bytes, {} voxels",
                candidate.file_name, candidate.size_bytes, dims
            );
            if dims.slices < self.config.slice_threshold {
                return Ok(Decision::Heuristic {
                    candidate: (*candidate).clone(),
                    dims,
                });
            }
        }

        Ok(Decision::Fallback {
            candidate: (*largest).clone(),
        })
    }

    /// Runs the selection over every subject under `images_folder`
    ///
    /// `output_folder` defaults to `{images_folder}/selected` and is created
    /// if absent. Failures of one subject are logged and recorded in the
    /// report; the remaining subjects are still processed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the images folder cannot be listed or the
    /// output folder cannot be created
    pub fn run(&self, images_folder: &Path, output_folder: Option<&Path>) -> Result<SelectionReport> {
        if !images_folder.is_dir() {
            return Err(PrepError::NotADirectory(images_folder.to_path_buf()));
        }
        let output_folder = output_folder
            .map(Path::to_path_buf)
            .unwrap_or_else(|| images_folder.join(DEFAULT_OUTPUT_DIR));
        std::fs::create_dir_all(&output_folder)?;

        for token in self.config.overrides.conflicts() {
            warn!("{} is both excluded and forced; exclusion wins", token);
        }

        let filter = self.subject_filter_for(&output_folder);
        let subjects = self.list_subjects(images_folder, &filter)?;
        info!(
            "Selecting volumes for {} subjects into {}",
            subjects.len(),
            output_folder.display()
        );

        let outcomes = subjects
            .iter()
            .map(|dir| self.process_subject(dir, &output_folder))
            .collect();

        Ok(SelectionReport {
            images_folder: images_folder.to_path_buf(),
            output_folder,
            outcomes,
        })
    }

    /// Adds the output folder's base name to the configured skip prefixes
    fn subject_filter_for(&self, output_folder: &Path) -> SubjectFilter {
        let filter = self.config.subject_filter.clone();
        match output_folder.file_name().and_then(|n| n.to_str()) {
            Some(base) => filter.skip_prefix(base),
            None => filter,
        }
    }

    fn list_subjects(&self, images_folder: &Path, filter: &SubjectFilter) -> Result<Vec<PathBuf>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(images_folder)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if filter.accepts(&name) {
                    names.push(name);
                } else {
                    debug!("Skipping non-subject directory {}", name);
                }
            }
        }
        self.config.listing_order.apply(&mut names);
        Ok(names.into_iter().map(|n| images_folder.join(n)).collect())
    }

    fn process_subject(&self, dir: &Path, output_folder: &Path) -> SubjectOutcome {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match Subject::list_file_names(dir, self.config.listing_order) {
            Ok(names) => self.process_listing(name, dir, names, output_folder),
            Err(e) => {
                error!("Subject {}: cannot list directory: {}", name, e);
                SubjectOutcome::without_output(name, failed(e))
            }
        }
    }

    /// Decides and copies for a listed subject
    ///
    /// Exclusion is checked on the bare listing before any file is read.
    fn process_listing(
        &self,
        name: String,
        dir: &Path,
        names: Vec<String>,
        output_folder: &Path,
    ) -> SubjectOutcome {
        if self.config.overrides.is_excluded(&name, names.as_slice()) {
            log_decision(&name, &Decision::Excluded);
            return SubjectOutcome::without_output(name, Decision::Excluded);
        }

        let subject = match Subject::from_file_names(dir, names) {
            Ok(subject) => subject,
            Err(e) => {
                error!("Subject {}: cannot read candidates: {}", name, e);
                return SubjectOutcome::without_output(name, failed(e));
            }
        };

        let decision = match self.decide(&subject) {
            Ok(decision) => decision,
            Err(e) => {
                error!("Subject {}: cannot probe candidates: {}", name, e);
                return SubjectOutcome::without_output(name, failed(e));
            }
        };

        log_decision(&name, &decision);

        let Some(source) = decision.candidate().map(|c| c.path.clone()) else {
            return SubjectOutcome::without_output(name, decision);
        };

        match copy_into(&source, output_folder, self.config.overwrite) {
            Ok(outcome) => {
                let copied = outcome.was_copied();
                if let CopyOutcome::KeptExisting(path) = &outcome {
                    info!("  Keeping existing {}", path.display());
                } else {
                    info!(
                        "  Copied {} to {}",
                        source.display(),
                        outcome.path().display()
                    );
                }
                SubjectOutcome {
                    subject: name,
                    decision,
                    output: Some(outcome.path().to_path_buf()),
                    copied,
                }
            }
            Err(e) => {
                error!("Subject {}: copy failed: {}", name, e);
                SubjectOutcome::without_output(name, failed(e))
            }
        }
    }
}

fn failed(e: PrepError) -> Decision {
    Decision::Failed {
        reason: e.to_string(),
    }
}

fn log_decision(subject: &str, decision: &Decision) {
    match decision {
        Decision::Excluded => info!("Subject {}: excluded", subject),
        Decision::Empty => warn!("Subject {}: no candidate volumes", subject),
        Decision::Forced { candidate } => {
            info!("Subject {}: preselected {}", subject, candidate.file_name)
        }
        Decision::Heuristic { candidate, dims } => info!(
            "Subject {}: selected {} ({})",
            subject, candidate.file_name, dims
        ),
        Decision::Fallback { candidate } => warn!(
            "Subject {}: no volume under the slice threshold, taking largest {}",
            subject, candidate.file_name
        ),
        Decision::Failed { reason } => error!("Subject {}: {}", subject, reason),
    }
}

/// Selects one volume per subject with the default NIfTI probe
///
/// Convenience wrapper over [`VolumeSelector::run`]; returns the output folder.
pub fn select_images(
    images_folder: &Path,
    output_folder: Option<&Path>,
    config: SelectorConfig,
) -> Result<PathBuf> {
    let report = VolumeSelector::new(config).run(images_folder, output_folder)?;
    Ok(report.output_folder)
}
