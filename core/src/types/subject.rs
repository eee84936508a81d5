use super::ListingOrder;
use crate::error::{PrepError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Voxel dimensions of a volume: width, height and slice count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct VolumeDims {
    pub width: u16,
    pub height: u16,
    pub slices: u16,
}

impl VolumeDims {
    /// Creates new dimensions
    pub fn new(width: u16, height: u16, slices: u16) -> Self {
        Self {
            width,
            height,
            slices,
        }
    }
}

impl fmt::Display for VolumeDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.slices)
    }
}

/// One candidate volume file of a subject
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct CandidateVolume {
    /// Full path to the file
    pub path: PathBuf,

    /// File name, used for override matching
    pub file_name: String,

    /// Size on disk in bytes
    pub size_bytes: u64,
}

/// A subject directory and its candidate volumes in listing order
#[derive(Debug, Clone)]
pub struct Subject {
    /// Directory name, used as the subject identifier
    pub name: String,

    /// Subject directory
    pub dir: PathBuf,

    /// Regular files found in the directory
    pub candidates: Vec<CandidateVolume>,
}

impl Subject {
    /// Lists and measures a subject directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or an entry's metadata cannot be read
    pub fn scan(dir: &Path, order: ListingOrder) -> Result<Self> {
        let names = Self::list_file_names(dir, order)?;
        Self::from_file_names(dir, names)
    }

    /// File names of a subject directory in `order`, without any metadata
    ///
    /// Only files become candidates; symbolic links are followed, nested
    /// directories and entries with non UTF-8 names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read
    pub fn list_file_names(dir: &Path, order: ListingOrder) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(file_name) => names.push(file_name),
                Err(raw) => log::debug!("Ignoring non UTF-8 entry {:?}", raw),
            }
        }
        order.apply(&mut names);
        Ok(names)
    }

    /// Builds a subject from an earlier listing, reading each file's size
    ///
    /// # Errors
    ///
    /// Returns an error if a listed file can no longer be read
    pub fn from_file_names(dir: &Path, names: Vec<String>) -> Result<Self> {
        let name = subject_name(dir)?;

        let mut candidates = Vec::with_capacity(names.len());
        for file_name in names {
            let path = dir.join(&file_name);
            let size_bytes = std::fs::metadata(&path)?.len();
            candidates.push(CandidateVolume {
                path,
                file_name,
                size_bytes,
            });
        }

        Ok(Self {
            name,
            dir: dir.to_path_buf(),
            candidates,
        })
    }

    /// Candidate file names in listing order
    pub fn file_names(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .map(|c| c.file_name.as_str())
            .collect()
    }

    /// Candidates sorted by size, largest first
    ///
    /// The sort is stable, so equal sizes keep listing order.
    pub fn by_size_desc(&self) -> Vec<&CandidateVolume> {
        let mut sorted: Vec<&CandidateVolume> = self.candidates.iter().collect();
        sorted.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        sorted
    }

    /// Returns true if the directory holds no candidate files
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Directory name of a subject
fn subject_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PrepError::NotADirectory(dir.to_path_buf()))
}
