//! Dataset download and extraction
//!
//! Downloads a manifest of resource URLs, then every listed resource,
//! extracting zip archives next to themselves. Already-downloaded files and
//! already-extracted directories are left alone, so an interrupted fetch can
//! simply be rerun.

mod archive;
mod download;

pub use archive::{extract_zip, extraction_dir, is_zip};
pub use download::{file_name_from_url, Downloader, HttpDownloader};

use crate::error::Result;
use crate::store::write_staged;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// File name the manifest is saved under
pub const MANIFEST_FILE_NAME: &str = "cq500_files.txt";

/// What happened to one resource's download
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "kebab-case"))]
pub enum DownloadStatus {
    Downloaded { bytes: u64 },
    AlreadyPresent,
    Failed { reason: String },
}

/// What happened to one archive's extraction
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "kebab-case"))]
pub enum ExtractionStatus {
    Extracted { entries: usize },
    AlreadyExtracted,
    Corrupt { reason: String },
}

/// Fetch result of one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FetchedItem {
    pub url: String,
    pub path: PathBuf,
    pub download: DownloadStatus,

    /// `None` for resources that are not archives or failed to download
    pub extraction: Option<ExtractionStatus>,
}

/// Result of a fetch run
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FetchReport {
    pub manifest: PathBuf,
    pub items: Vec<FetchedItem>,
}

impl FetchReport {
    /// Number of resources downloaded during this run
    pub fn downloaded(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.download, DownloadStatus::Downloaded { .. }))
            .count()
    }

    /// Number of archives extracted during this run
    pub fn extracted(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.extraction, Some(ExtractionStatus::Extracted { .. })))
            .count()
    }

    /// Items whose download failed or whose archive was corrupt
    pub fn problems(&self) -> impl Iterator<Item = &FetchedItem> {
        self.items.iter().filter(|i| {
            matches!(i.download, DownloadStatus::Failed { .. })
                || matches!(i.extraction, Some(ExtractionStatus::Corrupt { .. }))
        })
    }
}

/// Downloads and extracts a dataset described by a manifest URL
pub struct DatasetFetcher<D = HttpDownloader> {
    downloader: D,
}

impl<D: Downloader> DatasetFetcher<D> {
    /// Creates a fetcher over a downloader
    pub fn new(downloader: D) -> Self {
        Self { downloader }
    }

    /// Fetches the manifest and every resource it lists into `dest`
    ///
    /// The manifest is fetched on every run. Resource download failures and
    /// corrupt archives are logged and recorded; the run continues with the
    /// next entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` cannot be created or the manifest cannot
    /// be downloaded or read
    pub fn fetch(&self, manifest_url: &str, dest: &Path) -> Result<FetchReport> {
        std::fs::create_dir_all(dest)?;

        info!("Downloading the manifest {}", manifest_url);
        let manifest = dest.join(MANIFEST_FILE_NAME);
        self.download_atomic(manifest_url, &manifest)?;

        let content = std::fs::read_to_string(&manifest)?;
        let urls: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        info!("Manifest lists {} resources", urls.len());

        let mut items = Vec::with_capacity(urls.len());
        for url in urls {
            let Some(file_name) = file_name_from_url(url) else {
                warn!("Skipping manifest line without a file name: {}", url);
                continue;
            };
            info!("File {}", file_name);
            items.push(self.fetch_item(url, &dest.join(file_name)));
        }

        Ok(FetchReport { manifest, items })
    }

    fn fetch_item(&self, url: &str, path: &Path) -> FetchedItem {
        let download = if path.exists() {
            info!("  Already downloaded, skipping...");
            DownloadStatus::AlreadyPresent
        } else {
            match self.download_atomic(url, path) {
                Ok(bytes) => DownloadStatus::Downloaded { bytes },
                Err(e) => {
                    error!("  Download of {} failed: {}", url, e);
                    DownloadStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        let extraction = match download {
            DownloadStatus::Failed { .. } => None,
            _ if is_zip(path) => Some(extract_once(path)),
            _ => None,
        };

        FetchedItem {
            url: url.to_string(),
            path: path.to_path_buf(),
            download,
            extraction,
        }
    }

    fn download_atomic(&self, url: &str, path: &Path) -> Result<u64> {
        write_staged(path, |staging| self.downloader.download(url, staging))
    }
}

fn extract_once(archive: &Path) -> ExtractionStatus {
    let target = extraction_dir(archive);
    if target.exists() {
        info!("  Already extracted, skipping...");
        return ExtractionStatus::AlreadyExtracted;
    }

    info!("  Extracting {}", archive.display());
    match extract_zip(archive, &target) {
        Ok(entries) => ExtractionStatus::Extracted { entries },
        Err(e) => {
            warn!("  Bad zip file {}: {}", archive.display(), e);
            ExtractionStatus::Corrupt {
                reason: e.to_string(),
            }
        }
    }
}

/// Fetches a dataset over HTTP(S) into `dest`
pub fn get_data(manifest_url: &str, dest: &Path) -> Result<FetchReport> {
    DatasetFetcher::new(HttpDownloader::new(None)?).fetch(manifest_url, dest)
}
