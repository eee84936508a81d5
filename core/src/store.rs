//! Writing finished artifacts into output folders
//!
//! Every writer in the crate goes through a staging path next to the final
//! destination and renames it into place once complete, so an existence
//! check on the destination never sees a half-written file.

use crate::error::{PrepError, Result};
use crate::types::OverwritePolicy;
use log::debug;
use std::path::{Path, PathBuf};

/// Suffix appended to in-progress files and directories
pub const STAGING_SUFFIX: &str = ".partial";

/// Outcome of placing a file into a destination folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The file was written to this path
    Copied(PathBuf),

    /// The destination already existed and the policy kept it
    KeptExisting(PathBuf),
}

impl CopyOutcome {
    /// Destination path, whether or not it was written
    pub fn path(&self) -> &Path {
        match self {
            CopyOutcome::Copied(p) | CopyOutcome::KeptExisting(p) => p,
        }
    }

    /// Returns true if bytes were written
    pub fn was_copied(&self) -> bool {
        matches!(self, CopyOutcome::Copied(_))
    }
}

/// Hidden sibling path used while `target` is being produced
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}{}", name, STAGING_SUFFIX))
}

/// Renames a finished staging path onto its target
///
/// An existing target file is replaced. A leftover target directory is
/// removed first since `rename` cannot replace a non-empty directory.
pub fn commit(staging: &Path, target: &Path) -> Result<()> {
    if target.is_dir() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(staging, target)?;
    Ok(())
}

/// Produces `target` by writing its staging path and committing it
///
/// `write` receives the staging path. If writing or the final rename fails,
/// the staging path is removed and `target` is left as it was.
pub fn write_staged<T, F>(target: &Path, write: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let staging = staging_path(target);
    let result = write(&staging).and_then(|value| {
        commit(&staging, target)?;
        Ok(value)
    });
    if result.is_err() {
        discard(&staging);
    }
    result
}

fn discard(staging: &Path) {
    let removed = if staging.is_dir() {
        std::fs::remove_dir_all(staging)
    } else {
        std::fs::remove_file(staging)
    };
    if let Err(e) = removed {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Cannot remove {}: {}", staging.display(), e);
        }
    }
}

/// Copies `source` into `dest_dir` keeping its file name
///
/// # Errors
///
/// Returns an error if the source has no file name or the copy fails. A
/// failed copy leaves no file at the destination.
pub fn copy_into(source: &Path, dest_dir: &Path, policy: OverwritePolicy) -> Result<CopyOutcome> {
    let file_name = source.file_name().ok_or_else(|| {
        PrepError::InvalidConfig(format!("{} has no file name", source.display()))
    })?;
    let target = dest_dir.join(file_name);

    if target.exists() && !policy.allows_overwrite() {
        debug!("Keeping existing {}", target.display());
        return Ok(CopyOutcome::KeptExisting(target));
    }

    write_staged(&target, |staging| {
        std::fs::copy(source, staging)?;
        Ok(())
    })?;

    Ok(CopyOutcome::Copied(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_staging_path() {
        let staging = staging_path(Path::new("/out/S1_CT PLAIN.nii.gz"));
        assert_eq!(staging, PathBuf::from("/out/.S1_CT PLAIN.nii.gz.partial"));
    }

    #[test]
    fn test_copy_into_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.nii.gz");
        fs::write(&source, b"volume").unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let outcome = copy_into(&source, &dest, OverwritePolicy::Always).unwrap();

        assert!(outcome.was_copied());
        assert_eq!(outcome.path(), dest.join("a.nii.gz"));
        assert_eq!(fs::read(dest.join("a.nii.gz")).unwrap(), b"volume");
        assert!(!staging_path(&dest.join("a.nii.gz")).exists());
    }

    #[test]
    fn test_copy_into_overwrites_when_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.nii.gz");
        fs::write(&source, b"new").unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("a.nii.gz"), b"old").unwrap();

        let outcome = copy_into(&source, &dest, OverwritePolicy::Always).unwrap();

        assert!(outcome.was_copied());
        assert_eq!(fs::read(dest.join("a.nii.gz")).unwrap(), b"new");
    }

    #[test]
    fn test_copy_into_keeps_existing() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.nii.gz");
        fs::write(&source, b"new").unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("a.nii.gz"), b"old").unwrap();

        let outcome = copy_into(&source, &dest, OverwritePolicy::SkipExisting).unwrap();

        assert!(!outcome.was_copied());
        assert_eq!(fs::read(dest.join("a.nii.gz")).unwrap(), b"old");
    }

    #[test]
    fn test_copy_into_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let result = copy_into(&temp_dir.path().join("gone"), &dest, OverwritePolicy::Always);

        assert!(result.is_err());
        assert!(!dest.join("gone").exists());
        assert!(!staging_path(&dest.join("gone")).exists());
    }

    #[test]
    fn test_write_staged_discards_staging_when_commit_fails() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.nii.gz");
        fs::write(&target, b"old").unwrap();

        // a staged directory cannot be renamed onto an existing file
        let result = write_staged(&target, |staging| {
            fs::create_dir(staging)?;
            fs::write(staging.join("part"), b"new")?;
            Ok(())
        });

        assert!(result.is_err());
        assert!(!staging_path(&target).exists());
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn test_write_staged_discards_staging_when_write_fails() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("b.nii.gz");

        let result: Result<()> = write_staged(&target, |staging| {
            fs::write(staging, b"half")?;
            Err(PrepError::ConversionError("interrupted".to_string()))
        });

        assert!(result.is_err());
        assert!(!staging_path(&target).exists());
        assert!(!target.exists());
    }
}
