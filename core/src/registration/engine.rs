use super::job::RegistrationJob;
use crate::error::Result;
use std::fmt;
use std::path::PathBuf;

/// Which estimation the engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum EstimationKind {
    /// Deform the template onto each subject
    Registration,

    /// Fit an average template plus per-subject deformations
    DeterministicAtlas,
}

impl EstimationKind {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            EstimationKind::Registration => "registration",
            EstimationKind::DeterministicAtlas => "deterministic-atlas",
        }
    }

    /// Prefix of the default output folder name
    pub fn output_prefix(&self) -> &'static str {
        match self {
            EstimationKind::Registration => "reg_",
            EstimationKind::DeterministicAtlas => "atlas_",
        }
    }
}

impl fmt::Display for EstimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Progress record reported once per optimizer iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct IterationStatus {
    pub iteration: u32,
    pub log_likelihood: f64,
    pub step_size: Option<f64>,
}

/// External deformable registration and atlas estimation toolkit
///
/// Implementations write their results into `job.output_dir` and call
/// `on_iteration` once per iteration; a `false` return asks the engine to
/// stop after the current iteration.
pub trait RegistrationEngine {
    /// Fitted deformation model
    type Model;

    fn estimate(
        &mut self,
        kind: EstimationKind,
        job: &RegistrationJob,
        on_iteration: &mut dyn FnMut(&IterationStatus) -> bool,
    ) -> Result<Self::Model>;
}

impl<E: RegistrationEngine + ?Sized> RegistrationEngine for &mut E {
    type Model = E::Model;

    fn estimate(
        &mut self,
        kind: EstimationKind,
        job: &RegistrationJob,
        on_iteration: &mut dyn FnMut(&IterationStatus) -> bool,
    ) -> Result<Self::Model> {
        (**self).estimate(kind, job, on_iteration)
    }
}

/// One completed estimation and the status records it produced
#[derive(Debug, Clone)]
pub struct RegistrationRun<M> {
    pub kind: EstimationKind,
    pub job: RegistrationJob,
    pub model: M,

    /// Every status reported during this run, in order
    pub statuses: Vec<IterationStatus>,

    /// The observer asked the engine to stop
    pub stopped_early: bool,
}

impl<M> RegistrationRun<M> {
    pub fn output_dir(&self) -> &PathBuf {
        &self.job.output_dir
    }

    /// Log-likelihood reported by the last iteration
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.statuses.last().map(|s| s.log_likelihood)
    }
}

/// Result of asking for an estimation
#[derive(Debug, Clone)]
pub enum RunOutcome<M> {
    /// The output folder is already populated and overwriting is disabled
    Skipped { output_dir: PathBuf },

    Completed(RegistrationRun<M>),
}

impl<M> RunOutcome<M> {
    /// The completed run, if any
    pub fn run(&self) -> Option<&RegistrationRun<M>> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            RunOutcome::Skipped { .. } => None,
        }
    }

    pub fn into_run(self) -> Option<RegistrationRun<M>> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            RunOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped { .. })
    }
}
