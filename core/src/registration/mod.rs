//! Registration and atlas estimation orchestration
//!
//! Assembles the parameters of an estimation from presets and caller
//! overrides, prepares the output folder and hands the job to a
//! [`RegistrationEngine`]. The engine itself is external.

mod engine;
mod job;

pub use engine::{
    EstimationKind, IterationStatus, RegistrationEngine, RegistrationRun, RunOutcome,
};
pub use job::{
    subject_id, AttachmentType, DatasetOverrides, DatasetSpec, DeformableObjectType, Dtype,
    EstimatorOptions, EstimatorOverrides, JobOverrides, KernelType, ModelOptions,
    ModelOverrides, OptimizationMethod, RegistrationJob, TemplateObject, TemplateSpec,
    Verbosity, DEFAULT_OBJECT_NAME,
};

use crate::convert::VOLUME_EXTENSION;
use crate::error::{PrepError, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// An existing output folder with more entries than this counts as a
/// finished run
pub const POPULATED_OUTPUT_ENTRIES: usize = 5;

/// Inputs of one estimation
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub template_path: PathBuf,
    pub dataset_paths: Vec<PathBuf>,

    /// Defaults to a sibling of the template, see [`Self::output_dir`]
    pub output_dir: Option<PathBuf>,

    pub overrides: JobOverrides,
    pub verbosity: Verbosity,

    /// Run even if the output folder is already populated
    pub overwrite: bool,
}

impl RegistrationRequest {
    pub fn new<P: Into<PathBuf>>(
        template_path: impl Into<PathBuf>,
        dataset_paths: impl IntoIterator<Item = P>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            dataset_paths: dataset_paths.into_iter().map(Into::into).collect(),
            output_dir: None,
            overrides: JobOverrides::default(),
            verbosity: Verbosity::default(),
            overwrite: true,
        }
    }

    /// Builder: set the output folder
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builder: set the parameter overrides
    pub fn with_overrides(mut self, overrides: JobOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Builder: replace or add one template object
    pub fn with_template_object(mut self, name: impl Into<String>, object: TemplateObject) -> Self {
        self.overrides.template.objects.insert(name.into(), object);
        self
    }

    /// Builder: set the engine verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Builder: set whether a populated output folder is run again
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Output folder for `kind`
    ///
    /// Without an explicit folder this is `{template dir}/reg_{stem}` or
    /// `{template dir}/atlas_{stem}`.
    pub fn output_dir(&self, kind: EstimationKind) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let name = format!("{}{}", kind.output_prefix(), subject_id(&self.template_path));
        self.template_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(name)
    }

    /// Builds the job: presets first, then the overrides on top
    pub fn assemble(&self, kind: EstimationKind) -> RegistrationJob {
        let mut job = RegistrationJob {
            output_dir: self.output_dir(kind),
            verbosity: self.verbosity,
            template: TemplateSpec::single(
                DEFAULT_OBJECT_NAME,
                TemplateObject::surface_mesh(&self.template_path),
            ),
            dataset: DatasetSpec::from_paths(DEFAULT_OBJECT_NAME, self.dataset_paths.as_slice()),
            model: ModelOptions::default(),
            estimator: EstimatorOptions::default(),
        };
        job.apply(self.overrides.clone());
        job
    }
}

/// Runs one estimation of `kind`
///
/// Every status the engine reports is kept in the returned run and also
/// passed to `observer`, which may stop the run by returning `false`.
///
/// # Errors
///
/// Returns an error if the output folder cannot be prepared or the engine
/// fails
pub fn deform_atlas_reg<E, F>(
    mut engine: E,
    kind: EstimationKind,
    request: &RegistrationRequest,
    mut observer: F,
) -> Result<RunOutcome<E::Model>>
where
    E: RegistrationEngine,
    F: FnMut(&IterationStatus) -> bool,
{
    let job = request.assemble(kind);
    info!("Output path: {}", job.output_dir.display());

    if !request.overwrite && is_populated(&job.output_dir)? {
        warn!(
            "  Output folder {} already exists and contains files. Delete it or enable overwrite.",
            job.output_dir.display()
        );
        return Ok(RunOutcome::Skipped {
            output_dir: job.output_dir,
        });
    }
    std::fs::create_dir_all(&job.output_dir)?;

    info!(
        "Estimating {} of {} subjects against {}",
        kind,
        job.dataset.len(),
        request.template_path.display()
    );

    let mut statuses = Vec::new();
    let mut stopped_early = false;
    let model = engine.estimate(kind, &job, &mut |status: &IterationStatus| {
        log::debug!(
            "  iteration {}: log-likelihood {}",
            status.iteration,
            status.log_likelihood
        );
        statuses.push(status.clone());
        let keep_going = observer(status);
        stopped_early |= !keep_going;
        keep_going
    })?;

    Ok(RunOutcome::Completed(RegistrationRun {
        kind,
        job,
        model,
        statuses,
        stopped_early,
    }))
}

/// Whether `dir` exists and holds more than [`POPULATED_OUTPUT_ENTRIES`] entries
fn is_populated(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(std::fs::read_dir(dir)?.count() > POPULATED_OUTPUT_ENTRIES)
}

/// Registers every dataset object onto the template
pub fn estimate_registration<E: RegistrationEngine>(
    engine: E,
    request: &RegistrationRequest,
) -> Result<RunOutcome<E::Model>> {
    deform_atlas_reg(engine, EstimationKind::Registration, request, |_| true)
}

/// Estimates a deterministic atlas from the template and the dataset
pub fn estimate_atlas<E: RegistrationEngine>(
    engine: E,
    request: &RegistrationRequest,
) -> Result<RunOutcome<E::Model>> {
    deform_atlas_reg(engine, EstimationKind::DeterministicAtlas, request, |_| true)
}

/// `.nii.gz` volumes in `folder` other than `fixed_image`, sorted by name
pub fn collect_moving_images(folder: &Path, fixed_image: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PrepError::NotADirectory(folder.to_path_buf()));
    }
    let fixed_name = fixed_image.file_name();

    let mut images = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name();
        if Some(name.as_os_str()) == fixed_name {
            continue;
        }
        if name.to_string_lossy().ends_with(VOLUME_EXTENSION) && entry.file_type()?.is_file() {
            images.push(entry.path());
        }
    }
    images.sort();
    Ok(images)
}

/// Registers the volumes of `folder` onto `fixed_image`
///
/// `fixed_image` may be a bare file name inside `folder`. The template is an
/// image object with varifold attachment.
///
/// Subject ids are the moving file names with `.nii.gz`, `.nii` or `.vtk`
/// stripped (`a.nii.gz` becomes `a`), not the raw file names.
pub fn register_images<E: RegistrationEngine>(
    engine: E,
    folder: &Path,
    fixed_image: &Path,
    output_dir: &Path,
) -> Result<RunOutcome<E::Model>> {
    let fixed = if fixed_image.components().count() == 1 {
        folder.join(fixed_image)
    } else {
        fixed_image.to_path_buf()
    };
    let moving = collect_moving_images(folder, &fixed)?;
    info!(
        "Registering {} images onto {}",
        moving.len(),
        fixed.display()
    );

    let request = RegistrationRequest::new(&fixed, moving)
        .with_output_dir(output_dir)
        .with_template_object(DEFAULT_OBJECT_NAME, TemplateObject::image(&fixed));
    estimate_registration(engine, &request)
}
