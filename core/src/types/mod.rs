//! Core type definitions for volume selection
//!
//! - [`Subject`] and [`CandidateVolume`]: a subject directory and its files
//! - [`VolumeDims`]: voxel dimensions reported by a volume probe
//! - [`OverrideLists`]: preselected, in-observation and excluded tokens
//! - [`SubjectFilter`]: which directories are subjects
//! - [`OverwritePolicy`] and [`ListingOrder`]: explicit run policies
//! - [`SelectorConfig`]: everything a selection run needs besides its paths

mod config;
mod enums;
mod filter;
mod overrides;
mod subject;

pub use config::{SelectorConfig, DEFAULT_SLICE_THRESHOLD};
pub use enums::{ListingOrder, OverwritePolicy};
pub use filter::{SubjectFilter, DEFAULT_SUBJECT_PREFIX};
pub use overrides::{read_token_file, OverrideLists};
pub use subject::{CandidateVolume, Subject, VolumeDims};
