use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Fetches a remote resource into a local file
pub trait Downloader {
    /// Writes the resource at `url` to `dest`, creating or truncating it
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with an
    /// error status, or the file cannot be written
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Blocking HTTP(S) downloader
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// Creates a downloader with the given overall request timeout
    ///
    /// CQ500 archives run to hundreds of megabytes, so the timeout should be
    /// generous.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cqprep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut writer = BufWriter::new(File::create(dest)?);
        let bytes = response.copy_to(&mut writer)?;
        writer.flush()?;
        Ok(bytes)
    }
}

/// File name of a resource: the last `/`-separated segment of its URL
///
/// Query strings and fragments are dropped.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.org/cq500/CQ500-CT-0.zip"),
            Some("CQ500-CT-0.zip")
        );
        assert_eq!(
            file_name_from_url("https://example.org/reads.csv?sig=abc#top"),
            Some("reads.csv")
        );
        assert_eq!(file_name_from_url("https://example.org/dir/"), None);
        assert_eq!(file_name_from_url("plain.zip"), Some("plain.zip"));
    }
}
