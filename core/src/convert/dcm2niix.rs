use crate::error::{PrepError, Result};
use crate::store::{commit, staging_path};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Extension of converted volumes
pub const VOLUME_EXTENSION: &str = ".nii.gz";

/// Converts one directory of DICOM slices into one volume file
pub trait SeriesConverter {
    /// Writes the volume for `series_dir` to exactly `output`
    ///
    /// # Errors
    ///
    /// Returns an error if the series cannot be converted; `output` must not
    /// exist afterwards in that case
    fn convert(&self, series_dir: &Path, output: &Path) -> Result<()>;
}

/// Series converter running the external `dcm2niix` tool
#[derive(Debug, Clone)]
pub struct Dcm2NiixConverter {
    executable: PathBuf,
}

impl Default for Dcm2NiixConverter {
    fn default() -> Self {
        Self::new("dcm2niix")
    }
}

impl Dcm2NiixConverter {
    /// Creates a converter using the given executable path
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Checks whether the executable can be started
    pub fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("-h")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl SeriesConverter for Dcm2NiixConverter {
    fn convert(&self, series_dir: &Path, output: &Path) -> Result<()> {
        let staging = staging_path(output);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let result = self.convert_into(series_dir, &staging, output);
        let _ = std::fs::remove_dir_all(&staging);
        result
    }
}

impl Dcm2NiixConverter {
    fn convert_into(&self, series_dir: &Path, staging: &Path, output: &Path) -> Result<()> {
        let stem = volume_stem(output);

        // dcm2niix -z y -b n -f <stem> -o <staging> <series_dir>
        let run = Command::new(&self.executable)
            .args(["-z", "y", "-b", "n", "-f"])
            .arg(&stem)
            .arg("-o")
            .arg(staging)
            .arg(series_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                PrepError::ConversionError(format!(
                    "cannot run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !run.status.success() {
            let stderr = String::from_utf8_lossy(&run.stderr);
            let stdout = String::from_utf8_lossy(&run.stdout);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(PrepError::ConversionError(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                run.status,
                message.trim()
            )));
        }

        // dcm2niix exits 0 even when it writes nothing, and may split a
        // series into suffixed volumes (_e2, _ROI1, ...); keep the first
        let produced = find_volumes(staging)?;
        let Some(first) = produced.first() else {
            return Err(PrepError::ConversionError(format!(
                "no volume produced for {}",
                series_dir.display()
            )));
        };
        if produced.len() > 1 {
            debug!(
                "{} produced {} volumes, keeping {}",
                series_dir.display(),
                produced.len(),
                first.display()
            );
        }

        commit(first, output)
    }
}

/// File name of a volume without its `.nii.gz` extension
fn volume_stem(output: &Path) -> String {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(VOLUME_EXTENSION)
        .map(str::to_string)
        .unwrap_or(name)
}

/// Volumes in `dir`, sorted by name
fn find_volumes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut volumes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if name.ends_with(".nii.gz") || name.ends_with(".nii") {
            volumes.push(path);
        }
    }
    volumes.sort();
    Ok(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_volume_stem() {
        assert_eq!(
            volume_stem(Path::new("/out/S1/S1_CT PLAIN.nii.gz")),
            "S1_CT PLAIN"
        );
        assert_eq!(volume_stem(Path::new("/out/S1/raw.nii")), "raw.nii");
    }

    #[test]
    fn test_find_volumes() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.nii.gz", "a.nii.gz", "a.json", "c.nii"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }

        let volumes = find_volumes(temp_dir.path()).unwrap();
        let names: Vec<_> = volumes
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.nii.gz", "b.nii.gz", "c.nii"]);
    }

    #[test]
    fn test_missing_executable() {
        let temp_dir = TempDir::new().unwrap();
        let converter = Dcm2NiixConverter::new("nonexistent_dcm2niix_binary_xyz");
        let output = temp_dir.path().join("S1_series.nii.gz");

        assert!(!converter.is_available());
        let result = converter.convert(temp_dir.path(), &output);
        assert!(matches!(result, Err(PrepError::ConversionError(_))));
        assert!(!output.exists());
        assert!(!staging_path(&output).exists());
    }
}
