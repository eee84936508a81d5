use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the single deformable object used by the presets
pub const DEFAULT_OBJECT_NAME: &str = "skull";

/// Extensions stripped when deriving identifiers from file names
const KNOWN_EXTENSIONS: &[&str] = &[".nii.gz", ".nii", ".vtk"];

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $simple:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[cfg_attr(feature = "json", serde(rename = $simple))]
                $variant,
            )+
        }

        impl $name {
            /// Returns the name the engine expects
            pub fn simple_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $simple,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.simple_name())
            }
        }
    };
}

named_enum! {
    /// Kind of geometry a template object describes
    DeformableObjectType {
        SurfaceMesh => "SurfaceMesh",
        PolyLine => "PolyLine",
        PointCloud => "PointCloud",
        Landmark => "Landmark",
        Image => "image",
    }
}

named_enum! {
    /// Data attachment term comparing a deformed object to its target
    AttachmentType {
        Current => "current",
        Varifold => "varifold",
        Landmark => "landmark",
    }
}

named_enum! {
    /// Kernel implementation used by the engine
    KernelType {
        Torch => "torch",
        Keops => "keops",
    }
}

named_enum! {
    /// Floating point precision of the computation
    Dtype {
        Float32 => "float32",
        Float64 => "float64",
    }
}

named_enum! {
    OptimizationMethod {
        GradientAscent => "GradientAscent",
        ScipyLbfgs => "ScipyLBFGS",
    }
}

named_enum! {
    /// Log level handed to the engine
    Verbosity {
        Debug => "DEBUG",
        Info => "INFO",
        Warning => "WARNING",
        Error => "ERROR",
        Critical => "CRITICAL",
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Info
    }
}

/// One deformable object of the template
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateObject {
    pub deformable_object_type: DeformableObjectType,
    pub kernel_type: KernelType,
    pub kernel_width: f64,
    pub noise_std: f64,
    pub filename: PathBuf,
    pub attachment_type: AttachmentType,
}

impl TemplateObject {
    /// Surface mesh object compared with currents
    pub fn surface_mesh(filename: impl Into<PathBuf>) -> Self {
        Self {
            deformable_object_type: DeformableObjectType::SurfaceMesh,
            kernel_type: KernelType::Torch,
            kernel_width: 20.0,
            noise_std: 10.0,
            filename: filename.into(),
            attachment_type: AttachmentType::Current,
        }
    }

    /// Image object compared with varifolds
    pub fn image(filename: impl Into<PathBuf>) -> Self {
        Self {
            deformable_object_type: DeformableObjectType::Image,
            noise_std: 1.0,
            attachment_type: AttachmentType::Varifold,
            ..Self::surface_mesh(filename)
        }
    }
}

/// Template objects keyed by object name
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
pub struct TemplateSpec {
    pub objects: BTreeMap<String, TemplateObject>,
}

impl TemplateSpec {
    /// Template holding one object
    pub fn single(name: impl Into<String>, object: TemplateObject) -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(name.into(), object);
        Self { objects }
    }

    /// Replaces objects by name; objects not named in `overrides` are kept
    pub fn merge(&mut self, overrides: TemplateSpec) {
        self.objects.extend(overrides.objects);
    }
}

/// Moving objects, one group list per subject
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct DatasetSpec {
    pub dataset_filenames: Vec<Vec<BTreeMap<String, PathBuf>>>,
    pub subject_ids: Vec<String>,
}

impl DatasetSpec {
    /// One `{object: path}` group per path, identified by the file stem
    pub fn from_paths<P: AsRef<Path>>(object: &str, paths: &[P]) -> Self {
        let dataset_filenames = paths
            .iter()
            .map(|p| {
                let mut group = BTreeMap::new();
                group.insert(object.to_string(), p.as_ref().to_path_buf());
                vec![group]
            })
            .collect();
        let subject_ids = paths.iter().map(|p| subject_id(p.as_ref())).collect();

        Self {
            dataset_filenames,
            subject_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.subject_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject_ids.is_empty()
    }
}

/// Caller replacements for dataset fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct DatasetOverrides {
    pub dataset_filenames: Option<Vec<Vec<BTreeMap<String, PathBuf>>>>,
    pub subject_ids: Option<Vec<String>>,
}

/// Deformation model hyperparameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelOptions {
    pub deformation_kernel_type: KernelType,
    pub deformation_kernel_width: f64,
    pub dtype: Dtype,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            deformation_kernel_type: KernelType::Torch,
            deformation_kernel_width: 40.0,
            dtype: Dtype::Float32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct ModelOverrides {
    pub deformation_kernel_type: Option<KernelType>,
    pub deformation_kernel_width: Option<f64>,
    pub dtype: Option<Dtype>,
}

/// Optimizer settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorOptions {
    pub optimization_method_type: OptimizationMethod,
    pub initial_step_size: f64,
    pub max_iterations: u32,
    pub max_line_search_iterations: u32,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            optimization_method_type: OptimizationMethod::GradientAscent,
            initial_step_size: 1.0,
            max_iterations: 25,
            max_line_search_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct EstimatorOverrides {
    pub optimization_method_type: Option<OptimizationMethod>,
    pub initial_step_size: Option<f64>,
    pub max_iterations: Option<u32>,
    pub max_line_search_iterations: Option<u32>,
}

/// Caller-supplied replacements, applied key by key over the defaults
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default, deny_unknown_fields))]
pub struct JobOverrides {
    pub template: TemplateSpec,
    pub dataset: DatasetOverrides,
    pub model: ModelOverrides,
    pub estimator: EstimatorOverrides,
}

#[cfg(feature = "json")]
impl JobOverrides {
    /// Parses overrides from a JSON document with optional `template`,
    /// `dataset`, `model` and `estimator` sections
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Everything an engine needs for one estimation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct RegistrationJob {
    pub output_dir: PathBuf,
    pub verbosity: Verbosity,
    pub template: TemplateSpec,
    pub dataset: DatasetSpec,
    pub model: ModelOptions,
    pub estimator: EstimatorOptions,
}

impl RegistrationJob {
    /// Applies `overrides` over this job's parameters
    pub fn apply(&mut self, overrides: JobOverrides) {
        self.template.merge(overrides.template);

        if let Some(filenames) = overrides.dataset.dataset_filenames {
            self.dataset.dataset_filenames = filenames;
        }
        if let Some(ids) = overrides.dataset.subject_ids {
            self.dataset.subject_ids = ids;
        }

        let model = overrides.model;
        if let Some(kernel) = model.deformation_kernel_type {
            self.model.deformation_kernel_type = kernel;
        }
        if let Some(width) = model.deformation_kernel_width {
            self.model.deformation_kernel_width = width;
        }
        if let Some(dtype) = model.dtype {
            self.model.dtype = dtype;
        }

        let estimator = overrides.estimator;
        if let Some(method) = estimator.optimization_method_type {
            self.estimator.optimization_method_type = method;
        }
        if let Some(step) = estimator.initial_step_size {
            self.estimator.initial_step_size = step;
        }
        if let Some(n) = estimator.max_iterations {
            self.estimator.max_iterations = n;
        }
        if let Some(n) = estimator.max_line_search_iterations {
            self.estimator.max_line_search_iterations = n;
        }
    }
}

/// File name without directory and known volume or mesh extension
pub fn subject_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for ext in KNOWN_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ext) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }

    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}
