use crate::error::{PrepError, Result};
use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{DefaultDicomObject, InMemDicomObject, OpenFileOptions};
use std::path::{Path, PathBuf};

/// Identifying metadata of a DICOM series directory
///
/// Read from the header of the first readable file so the converted volume
/// can be traced back to its SeriesInstanceUID.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SeriesInfo {
    pub series_instance_uid: Option<String>,
    pub series_description: Option<String>,
    pub modality: Option<String>,

    /// Number of files in the directory
    pub file_count: usize,

    /// File the metadata was read from
    pub source_file: PathBuf,
}

impl SeriesInfo {
    /// Describes the series stored in `dir`
    ///
    /// Files are tried in name order; those that are not DICOM are skipped.
    ///
    /// # Errors
    ///
    /// Returns `DicomError` if no file in the directory is readable DICOM
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for path in &files {
            match read_header(path) {
                Ok(dcm) => {
                    return Ok(Self {
                        series_instance_uid: get_string_value(&dcm, tags::SERIES_INSTANCE_UID),
                        series_description: get_string_value(&dcm, tags::SERIES_DESCRIPTION),
                        modality: get_string_value(&dcm, tags::MODALITY),
                        file_count: files.len(),
                        source_file: path.clone(),
                    })
                }
                Err(e) => log::debug!("{} is not readable DICOM: {}", path.display(), e),
            }
        }

        Err(PrepError::DicomError(format!(
            "no readable DICOM file in {}",
            dir.display()
        )))
    }
}

/// Reads a DICOM file up to, not including, the pixel data
fn read_header(path: &Path) -> Result<DefaultDicomObject> {
    OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path)
        .map_err(|e| PrepError::DicomError(format!("{}", e)))
}

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present, cannot be converted to string,
/// or is blank
fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};
    use dicom_object::meta::FileMetaTableBuilder;
    use tempfile::TempDir;

    /// Writes a minimal CT slice header without pixel data
    pub(crate) fn write_dicom(path: &Path, series_uid: &str, description: &str) {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(
            tags::MODALITY,
            VR::CS,
            PrimitiveValue::from("CT"),
        ));
        dcm.put(DataElement::new(
            tags::SERIES_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(series_uid),
        ));
        dcm.put(DataElement::new(
            tags::SERIES_DESCRIPTION,
            VR::LO,
            PrimitiveValue::from(description),
        ));

        let file = dcm
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax("1.2.840.10008.1.2.1")
                    .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
                    .media_storage_sop_instance_uid("1.2.3.4.5"),
            )
            .unwrap();
        file.write_to_file(path).unwrap();
    }

    #[test]
    fn test_series_info_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("0_readme.txt"), b"not dicom").unwrap();
        write_dicom(&temp_dir.path().join("CT000001.dcm"), "1.2.3.99", "CT PLAIN");
        write_dicom(&temp_dir.path().join("CT000002.dcm"), "1.2.3.99", "CT PLAIN");

        let info = SeriesInfo::from_dir(temp_dir.path()).unwrap();

        assert_eq!(info.series_instance_uid.as_deref(), Some("1.2.3.99"));
        assert_eq!(info.series_description.as_deref(), Some("CT PLAIN"));
        assert_eq!(info.modality.as_deref(), Some("CT"));
        assert_eq!(info.file_count, 3);
        assert!(info.source_file.ends_with("CT000001.dcm"));
    }

    #[test]
    fn test_series_info_without_dicom() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();

        let result = SeriesInfo::from_dir(temp_dir.path());

        assert!(matches!(result, Err(PrepError::DicomError(_))));
    }
}
