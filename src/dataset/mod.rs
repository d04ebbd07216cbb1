//! Flickr8k dataset acquisition and layout reconciliation.
//!
//! The dataset is considered usable when every [`RequiredArtifact`] exists at
//! its canonical path under the dataset root:
//!
//! ```text
//! <root>/Flicker8k_Dataset/
//! <root>/Flickr8k_text/Flickr8k.lemma.token.txt
//! <root>/Flickr8k_text/Flickr8k.token.txt
//! <root>/Flickr8k_text/CrowdFlowerAnnotations.txt
//! <root>/Flickr8k_text/Flickr_8k.devImages.txt
//! <root>/Flickr8k_text/Flickr_8k.testImages.txt
//! <root>/Flickr8k_text/Flickr_8k.trainImages.txt
//! ```
//!
//! Note the upstream spelling: the image directory is `Flicker8k_Dataset`
//! while its archive is `Flickr8k_Dataset.zip`.

pub mod acquire;
pub mod reconcile;
pub mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::PrepError;

pub use acquire::{acquire, Fetcher, HttpFetcher};
pub use reconcile::{reconcile, reconcile_with_source};
pub use report::{
    AcquireOutcome, AcquireReport, ArchiveOrigin, ArchiveOutcome, ArtifactState, ArtifactStatus,
    LayoutStatus, ReconcileReport,
};

/// Default dataset root used by the CLI.
pub const DEFAULT_ROOT: &str = "./dataset/flickr8k";

/// Canonical image directory, also the marker for a completed download.
pub const IMAGE_DIR: &str = "Flicker8k_Dataset";

/// Canonical directory holding the annotation text files.
pub const TEXT_DIR: &str = "Flickr8k_text";

pub const DEFAULT_IMAGE_ARCHIVE_URL: &str =
    "https://github.com/jbrownlee/Datasets/releases/download/Flickr8k/Flickr8k_Dataset.zip";
pub const DEFAULT_TEXT_ARCHIVE_URL: &str =
    "https://github.com/jbrownlee/Datasets/releases/download/Flickr8k/Flickr8k_text.zip";

/// One of the remote archives the dataset ships as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Images,
    Text,
}

impl ArchiveKind {
    /// File name the archive is published under.
    pub fn default_file_name(self) -> &'static str {
        match self {
            ArchiveKind::Images => "Flickr8k_Dataset.zip",
            ArchiveKind::Text => "Flickr8k_text.zip",
        }
    }
}

/// A path that must exist under the root for the dataset to be usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredArtifact {
    ImageDir,
    LemmaTokens,
    Tokens,
    CrowdFlowerAnnotations,
    DevImages,
    TestImages,
    TrainImages,
}

impl RequiredArtifact {
    pub const ALL: [RequiredArtifact; 7] = [
        RequiredArtifact::ImageDir,
        RequiredArtifact::LemmaTokens,
        RequiredArtifact::Tokens,
        RequiredArtifact::CrowdFlowerAnnotations,
        RequiredArtifact::DevImages,
        RequiredArtifact::TestImages,
        RequiredArtifact::TrainImages,
    ];

    /// The final path component (directory or file name).
    pub fn file_name(self) -> &'static str {
        match self {
            RequiredArtifact::ImageDir => IMAGE_DIR,
            RequiredArtifact::LemmaTokens => "Flickr8k.lemma.token.txt",
            RequiredArtifact::Tokens => "Flickr8k.token.txt",
            RequiredArtifact::CrowdFlowerAnnotations => "CrowdFlowerAnnotations.txt",
            RequiredArtifact::DevImages => "Flickr_8k.devImages.txt",
            RequiredArtifact::TestImages => "Flickr_8k.testImages.txt",
            RequiredArtifact::TrainImages => "Flickr_8k.trainImages.txt",
        }
    }

    /// Path relative to the dataset root in the canonical layout.
    pub fn relative_path(self) -> PathBuf {
        if self.is_dir() {
            PathBuf::from(self.file_name())
        } else {
            Path::new(TEXT_DIR).join(self.file_name())
        }
    }

    pub fn canonical_path(self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }

    pub fn is_dir(self) -> bool {
        self == RequiredArtifact::ImageDir
    }

    /// The archive this artifact is extracted from.
    pub fn archive(self) -> ArchiveKind {
        if self.is_dir() {
            ArchiveKind::Images
        } else {
            ArchiveKind::Text
        }
    }

    /// Places an extraction may have left this artifact, in search order.
    ///
    /// `archive_file_name` is the local name of the archive this artifact
    /// comes from; a directory with that name may hold the extracted tree.
    pub fn nested_candidates(self, root: &Path, archive_file_name: &str) -> Vec<PathBuf> {
        let archive_dir = root.join(archive_file_name);
        let mut candidates = vec![archive_dir.join(self.relative_path())];
        if !self.is_dir() {
            candidates.push(archive_dir.join(self.file_name()));
            candidates.push(root.join(self.file_name()));
        }
        candidates
    }
}

/// Where to fetch the dataset archives from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSource {
    pub image_archive_url: String,
    pub text_archive_url: String,
    /// Global per-request timeout. `None` leaves transfers unbounded.
    pub timeout: Option<Duration>,
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self {
            image_archive_url: DEFAULT_IMAGE_ARCHIVE_URL.to_string(),
            text_archive_url: DEFAULT_TEXT_ARCHIVE_URL.to_string(),
            timeout: None,
        }
    }
}

impl DatasetSource {
    pub fn url(&self, kind: ArchiveKind) -> &str {
        match kind {
            ArchiveKind::Images => &self.image_archive_url,
            ArchiveKind::Text => &self.text_archive_url,
        }
    }

    /// Local file name for an archive, taken from the last URL path segment.
    pub fn archive_file_name(&self, kind: ArchiveKind) -> Result<String, PrepError> {
        archive_file_name_from_url(self.url(kind))
    }
}

fn archive_file_name_from_url(input: &str) -> Result<String, PrepError> {
    let url = url::Url::parse(input).map_err(|source| PrepError::InvalidUrl {
        url: input.to_string(),
        message: source.to_string(),
    })?;

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| PrepError::InvalidUrl {
            url: input.to_string(),
            message: "URL path has no file name".to_string(),
        })
}

/// Evaluate the canonical layout without touching the filesystem.
pub fn check_layout(root: &Path) -> LayoutStatus {
    let artifacts: Vec<ArtifactStatus> = RequiredArtifact::ALL
        .iter()
        .map(|&artifact| {
            let state = if artifact.canonical_path(root).exists() {
                ArtifactState::Present
            } else {
                ArtifactState::Missing
            };
            ArtifactStatus { artifact, state }
        })
        .collect();

    let image_dir = RequiredArtifact::ImageDir.canonical_path(root);
    let image_count = if image_dir.is_dir() {
        Some(count_images(&image_dir))
    } else {
        None
    };

    LayoutStatus {
        root: root.to_path_buf(),
        artifacts,
        image_count,
    }
}

fn count_images(dir: &Path) -> usize {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .count()
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "bmp"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn canonical_paths_match_expected_layout() {
        let root = Path::new("/data/flickr8k");
        assert_eq!(
            RequiredArtifact::ImageDir.canonical_path(root),
            PathBuf::from("/data/flickr8k/Flicker8k_Dataset")
        );
        assert_eq!(
            RequiredArtifact::Tokens.canonical_path(root),
            PathBuf::from("/data/flickr8k/Flickr8k_text/Flickr8k.token.txt")
        );
    }

    #[test]
    fn required_set_has_no_duplicates() {
        let mut names: Vec<_> = RequiredArtifact::ALL
            .iter()
            .map(|artifact| artifact.file_name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RequiredArtifact::ALL.len());
    }

    #[test]
    fn text_artifacts_search_archive_dir_then_root() {
        let root = Path::new("r");
        assert_eq!(
            RequiredArtifact::DevImages.nested_candidates(root, "Flickr8k_text.zip"),
            vec![
                PathBuf::from("r/Flickr8k_text.zip/Flickr8k_text/Flickr_8k.devImages.txt"),
                PathBuf::from("r/Flickr8k_text.zip/Flickr_8k.devImages.txt"),
                PathBuf::from("r/Flickr_8k.devImages.txt"),
            ]
        );
        assert_eq!(
            RequiredArtifact::ImageDir.nested_candidates(root, "images.zip"),
            vec![PathBuf::from("r/images.zip/Flicker8k_Dataset")]
        );
    }

    #[test]
    fn archive_file_name_comes_from_url_path() {
        let source = DatasetSource::default();
        assert_eq!(
            source.archive_file_name(ArchiveKind::Images).unwrap(),
            "Flickr8k_Dataset.zip"
        );
        assert_eq!(
            source.archive_file_name(ArchiveKind::Text).unwrap(),
            "Flickr8k_text.zip"
        );
    }

    #[test]
    fn archive_file_name_rejects_bad_urls() {
        assert!(matches!(
            archive_file_name_from_url("not a url"),
            Err(PrepError::InvalidUrl { .. })
        ));
        assert!(matches!(
            archive_file_name_from_url("https://example.com/"),
            Err(PrepError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn check_layout_counts_images() {
        let temp = tempfile::tempdir().expect("tempdir");
        let images = temp.path().join(IMAGE_DIR);
        fs::create_dir_all(&images).expect("mkdir");
        fs::write(images.join("1000268201_693b08cb0e.jpg"), b"jpg").expect("write");
        fs::write(images.join("notes.txt"), b"txt").expect("write");

        let status = check_layout(temp.path());
        assert_eq!(status.image_count, Some(1));
        assert_eq!(status.missing(), RequiredArtifact::ALL[1..].to_vec());
        assert!(!status.is_complete());
    }
}
