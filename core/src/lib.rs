pub mod cli;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod registration;
pub mod selection;
pub mod store;
pub mod types;

#[cfg(feature = "python")]
pub mod python;

pub use cli::report::TextReport;
pub use convert::{
    convert_nifti, ConversionReport, ConversionStatus, ConvertedSeries, Dcm2NiixConverter,
    SeriesConverter, SeriesInfo, VolumeConverter,
};
pub use error::{PrepError, Result};
pub use fetch::{get_data, DatasetFetcher, Downloader, FetchReport, HttpDownloader};
pub use registration::{
    deform_atlas_reg, estimate_atlas, estimate_registration, register_images, EstimationKind,
    IterationStatus, JobOverrides, RegistrationEngine, RegistrationJob, RegistrationRequest,
    RegistrationRun, RunOutcome,
};
pub use selection::{
    select_images, Decision, NiftiProbe, SelectionReport, SubjectOutcome, VolumeProbe,
    VolumeSelector,
};
pub use types::*;
