//! x264 snapshot source: download, verify, extract and rename.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use thiserror::Error;
use url::Url;

use crate::core::recipe::Recipe;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::hash::{digest_matches, sha256_bytes};
use crate::util::shell::{Progress, Shell, Status};

/// Error fetching or laying out the snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to download {url}: HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("checksum mismatch for {url}:\n  expected: {expected}\n  actual:   {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("archive entry escapes destination directory: {0}")]
    UnsafeEntry(String),

    #[error("expected `{expected}` after extracting into {dir}")]
    MissingExtractedDir { expected: String, dir: PathBuf },
}

/// Compression of a tar archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarBz2,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from a file name or URL path.
    pub fn from_name(name: &str) -> Result<Self, SourceError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            Ok(ArchiveFormat::TarBz2)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar") {
            Ok(ArchiveFormat::Tar)
        } else {
            Err(SourceError::UnsupportedArchive(name.to_string()))
        }
    }
}

/// Fetches one x264 snapshot into a recipe directory.
pub struct SnapshotSource<'a> {
    recipe: &'a Recipe,
    cache_dir: Option<PathBuf>,
}

impl<'a> SnapshotSource<'a> {
    pub fn new(recipe: &'a Recipe) -> Self {
        SnapshotSource {
            recipe,
            cache_dir: None,
        }
    }

    /// Keep downloaded archives in `dir` and reuse them on later runs.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Fetch and extract into `dest_dir`, renaming the snapshot folder to
    /// `source_subfolder`. Returns the final source directory.
    pub fn fetch(&self, dest_dir: &Path, source_subfolder: &str, shell: &Shell) -> Result<PathBuf> {
        let url = self.recipe.source_url()?;
        let format = ArchiveFormat::from_name(url.path())?;

        let data = match self.cached_archive(url.path())? {
            Some(data) => match self.verify(url.as_str(), &data) {
                Ok(()) => {
                    shell.status(Status::Fetching, format!("{} (cached)", url));
                    data
                }
                Err(err) => {
                    shell.warn(format!("discarding cached archive: {}", err));
                    self.evict_archive(url.path())?;
                    self.download_verified(url.as_str(), shell)?
                }
            },
            None => self.download_verified(url.as_str(), shell)?,
        };

        shell.status(
            Status::Extracting,
            format!("{} into {}", self.recipe.extracted_dir_name(), dest_dir.display()),
        );
        unpack_and_rename(
            &data,
            format,
            dest_dir,
            &self.recipe.extracted_dir_name(),
            source_subfolder,
        )
    }

    /// Check `data` against the pinned SHA-256, if any.
    fn verify(&self, url: &str, data: &[u8]) -> Result<(), SourceError> {
        let Some(expected) = &self.recipe.sha256 else {
            return Ok(());
        };
        let actual = sha256_bytes(data);
        if !digest_matches(&actual, expected) {
            return Err(SourceError::ChecksumMismatch {
                url: url.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        tracing::debug!("Archive hash verified: {}", &actual[..16]);
        Ok(())
    }

    fn download_verified(&self, url: &str, shell: &Shell) -> Result<Vec<u8>> {
        shell.status(Status::Fetching, url);
        let data = download(url, shell)?;
        self.accept_download(url, data)
    }

    /// Only archives that pass verification reach the cache.
    fn accept_download(&self, url: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        self.verify(url, &data)?;
        let url_path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();
        self.store_archive(&url_path, &data)?;
        Ok(data)
    }

    fn evict_archive(&self, url_path: &str) -> Result<()> {
        if let Some(path) = self.cache_path(url_path) {
            if path.is_file() {
                std::fs::remove_file(&path).with_context(|| {
                    format!("failed to remove cached archive {}", path.display())
                })?;
            }
        }
        Ok(())
    }

    fn cache_path(&self, url_path: &str) -> Option<PathBuf> {
        let name = url_path.rsplit('/').next().filter(|n| !n.is_empty())?;
        self.cache_dir.as_ref().map(|dir| dir.join(name))
    }

    fn cached_archive(&self, url_path: &str) -> Result<Option<Vec<u8>>> {
        match self.cache_path(url_path) {
            Some(path) if path.is_file() => {
                let data = std::fs::read(&path)
                    .with_context(|| format!("failed to read cached archive {}", path.display()))?;
                Ok(Some(data))
            }
            _ => Ok(None),
        }
    }

    fn store_archive(&self, url_path: &str, data: &[u8]) -> Result<()> {
        if let Some(path) = self.cache_path(url_path) {
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            std::fs::write(&path, data)
                .with_context(|| format!("failed to cache archive at {}", path.display()))?;
        }
        Ok(())
    }
}

/// Download a URL into memory with a byte progress bar.
pub fn download(url: &str, shell: &Shell) -> Result<Vec<u8>> {
    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("failed to download {}", url))?;

    if !response.status().is_success() {
        return Err(SourceError::Http {
            url: url.to_string(),
            status: response.status().as_u16(),
        }
        .into());
    }

    let total = response.content_length();
    let mut progress = shell.bytes_progress("x264 snapshot", total);
    let data = read_with_progress(&mut response, &mut progress)
        .with_context(|| format!("failed to read response body from {}", url))?;
    progress.finish();

    tracing::debug!("Downloaded {} bytes from {}", data.len(), url);
    Ok(data)
}

fn read_with_progress(reader: &mut impl Read, progress: &mut Progress) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
        progress.inc(n as u64);
    }
    Ok(data)
}

/// Extract an archive into `dest_dir` and rename `extracted` to `target`.
///
/// An existing `target` directory is replaced.
pub fn unpack_and_rename(
    data: &[u8],
    format: ArchiveFormat,
    dest_dir: &Path,
    extracted: &str,
    target: &str,
) -> Result<PathBuf> {
    ensure_dir(dest_dir)?;
    let extracted_path = dest_dir.join(extracted);
    remove_dir_all_if_exists(&extracted_path)?;

    extract_archive(data, format, dest_dir)?;

    if !extracted_path.is_dir() {
        return Err(SourceError::MissingExtractedDir {
            expected: extracted.to_string(),
            dir: dest_dir.to_path_buf(),
        }
        .into());
    }

    let target_path = dest_dir.join(target);
    remove_dir_all_if_exists(&target_path)?;
    std::fs::rename(&extracted_path, &target_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            extracted_path.display(),
            target_path.display()
        )
    })?;

    Ok(target_path)
}

/// Extract a tar archive (optionally compressed) into `dest`.
pub fn extract_archive(data: &[u8], format: ArchiveFormat, dest: &Path) -> Result<()> {
    let cursor = Cursor::new(data);
    match format {
        ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(cursor), dest),
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(cursor), dest),
        ArchiveFormat::Tar => unpack_tar(cursor, dest),
    }
}

fn unpack_tar(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        let escapes = entry_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            bail!(SourceError::UnsafeEntry(entry_path.display().to_string()));
        }

        let output_path = dest.join(&entry_path);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        entry
            .unpack(&output_path)
            .with_context(|| format!("failed to extract {}", entry_path.display()))?;
    }

    Ok(())
}
