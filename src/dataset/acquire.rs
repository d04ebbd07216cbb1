use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::PrepError;

use super::report::{AcquireOutcome, AcquireReport, ArchiveOrigin, ArchiveOutcome};
use super::{ArchiveKind, DatasetSource, RequiredArtifact};

/// Entries under this top-level directory are macOS resource forks.
const RESOURCE_FORK_DIR: &str = "__MACOSX";

/// Downloads a remote resource to a local file.
pub trait Fetcher {
    /// Fetch `url` and store its body at `dest`, replacing any existing file.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), PrepError>;
}

/// Blocking HTTP(S) fetcher.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), PrepError> {
        let network_error = |message: String| PrepError::Network {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|source| network_error(source.to_string()))?;

        let part = partial_path(dest);
        let file = File::create(&part).map_err(|source| PrepError::fs(&part, source))?;
        let mut writer = BufWriter::new(file);

        let copied = io::copy(&mut response.body_mut().as_reader(), &mut writer)
            .and_then(|bytes| writer.flush().map(|_| bytes));
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(source) => {
                let _ = fs::remove_file(&part);
                return Err(network_error(format!("transfer failed: {source}")));
            }
        };
        drop(writer);

        fs::rename(&part, dest).map_err(|source| PrepError::fs(dest, source))?;
        debug!(url, bytes, path = %dest.display(), "download complete");
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Download and extract the dataset archives into `root` unless the image
/// directory already exists.
///
/// Archives already sitting in `root` are reused when they open as valid zip
/// files. Nothing is retried: the first failure aborts the operation.
pub fn acquire(
    root: &Path,
    source: &DatasetSource,
    fetcher: &dyn Fetcher,
) -> Result<AcquireReport, PrepError> {
    let marker = RequiredArtifact::ImageDir.canonical_path(root);
    if marker.exists() {
        info!(root = %root.display(), "dataset already present");
        return Ok(AcquireReport {
            root: root.to_path_buf(),
            outcome: AcquireOutcome::AlreadyPresent,
        });
    }

    fs::create_dir_all(root).map_err(|source| PrepError::fs(root, source))?;

    let mut archives = Vec::new();
    for kind in [ArchiveKind::Images, ArchiveKind::Text] {
        archives.push(acquire_archive(root, source, kind, fetcher)?);
    }

    info!(root = %root.display(), "dataset and text files downloaded and extracted");
    Ok(AcquireReport {
        root: root.to_path_buf(),
        outcome: AcquireOutcome::Fetched { archives },
    })
}

fn acquire_archive(
    root: &Path,
    source: &DatasetSource,
    kind: ArchiveKind,
    fetcher: &dyn Fetcher,
) -> Result<ArchiveOutcome, PrepError> {
    let url = source.url(kind);
    let file_name = source.archive_file_name(kind)?;
    let archive_path = root.join(&file_name);

    if archive_path.is_dir() {
        return Err(PrepError::fs(
            &archive_path,
            io::Error::other("a directory occupies the archive path; run reconcile first"),
        ));
    }

    let origin = if is_valid_archive(&archive_path) {
        info!(archive = %file_name, "reusing cached archive");
        ArchiveOrigin::Cached
    } else {
        if archive_path.exists() {
            warn!(archive = %file_name, "cached archive is not a readable zip; downloading again");
        }
        info!(url, "downloading archive");
        fetcher.fetch(url, &archive_path)?;
        ArchiveOrigin::Downloaded
    };

    let extracted_entries = extract_archive(&archive_path, root)?;
    info!(archive = %file_name, extracted_entries, "archive extracted");

    Ok(ArchiveOutcome {
        kind,
        file_name,
        origin,
        extracted_entries,
    })
}

/// True if `path` is a file that opens as a non-empty zip archive.
pub fn is_valid_archive(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    File::open(path)
        .ok()
        .and_then(|file| ZipArchive::new(BufReader::new(file)).ok())
        .map(|archive| !archive.is_empty())
        .unwrap_or(false)
}

/// Extract every entry of the zip at `archive_path` into `dest`.
///
/// Returns the number of entries written. Resource-fork entries are skipped.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize, PrepError> {
    let extraction_error = |message: String| PrepError::Extraction {
        path: archive_path.to_path_buf(),
        message,
    };

    let file = File::open(archive_path).map_err(|source| PrepError::fs(archive_path, source))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|source| extraction_error(source.to_string()))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| extraction_error(source.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(extraction_error(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        if is_resource_fork(&relative) {
            debug!(entry = entry.name(), "skipping resource fork entry");
            continue;
        }

        let out_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|source| PrepError::fs(&out_path, source))?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|source| PrepError::fs(parent, source))?;
            }
            let mut out =
                File::create(&out_path).map_err(|source| PrepError::fs(&out_path, source))?;
            io::copy(&mut entry, &mut out).map_err(|source| {
                extraction_error(format!("failed reading '{}': {}", relative.display(), source))
            })?;
        }
        extracted += 1;
    }

    Ok(extracted)
}

fn is_resource_fork(relative: &Path) -> bool {
    matches!(
        relative.components().next(),
        Some(Component::Normal(first)) if first == RESOURCE_FORK_DIR
    )
}
