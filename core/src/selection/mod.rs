//! Per-subject volume selection
//!
//! Picks one converted volume per subject using override lists and a
//! size-then-slice-count heuristic, then copies it to an output folder.

mod decision;
mod probe;
mod selector;

pub use decision::{Decision, SelectionReport, SubjectOutcome};
pub use probe::{NiftiProbe, VolumeProbe};
pub use selector::{select_images, VolumeSelector, DEFAULT_OUTPUT_DIR};
