use crate::error::Result;
use crate::store::{staging_path, write_staged};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Returns true if the file name has a `.zip` extension
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Sibling directory an archive extracts into: its path without the extension
pub fn extraction_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Extracts a zip archive into `target`, returning the number of entries
///
/// Entries are written to a staging directory that is renamed onto
/// `target` only after every entry was extracted, so a corrupt archive
/// never leaves a directory that later runs would take as finished.
///
/// # Errors
///
/// Returns `ArchiveError` if the archive is unreadable or corrupt, or
/// `IoError` if the staging directory cannot be written or renamed
pub fn extract_zip(archive: &Path, target: &Path) -> Result<usize> {
    let staging = staging_path(target);
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }

    write_staged(target, |staging| {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let entries = zip.len();
        std::fs::create_dir_all(staging)?;
        zip.extract(staging)?;
        Ok(entries)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Builds an in-memory zip with the given entries
    pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_is_zip() {
        assert!(is_zip(Path::new("/data/CQ500-CT-1.zip")));
        assert!(is_zip(Path::new("/data/CQ500-CT-1.ZIP")));
        assert!(!is_zip(Path::new("/data/reads.csv")));
        assert!(!is_zip(Path::new("/data/noext")));
    }

    #[test]
    fn test_extraction_dir() {
        assert_eq!(
            extraction_dir(Path::new("/data/CQ500-CT-1.zip")),
            PathBuf::from("/data/CQ500-CT-1")
        );
    }

    #[test]
    fn test_extract_zip() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("S1.zip");
        std::fs::write(
            &archive,
            zip_bytes(&[("S1/CT PLAIN/IM1.dcm", b"one"), ("S1/CT PLAIN/IM2.dcm", b"two")]),
        )
        .unwrap();
        let target = extraction_dir(&archive);

        let entries = extract_zip(&archive, &target).unwrap();

        assert_eq!(entries, 2);
        assert_eq!(
            std::fs::read(target.join("S1/CT PLAIN/IM2.dcm")).unwrap(),
            b"two"
        );
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn test_extract_corrupt_zip_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("bad.zip");
        std::fs::write(&archive, b"PK this is not really a zip").unwrap();
        let target = extraction_dir(&archive);

        let result = extract_zip(&archive, &target);

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!staging_path(&target).exists());
    }
}
