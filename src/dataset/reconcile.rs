use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::PrepError;

use super::report::{ArtifactState, ArtifactStatus, ReconcileReport};
use super::{ArchiveKind, DatasetSource, RequiredArtifact, TEXT_DIR};

/// Move extracted files into the canonical layout under `root`, assuming the
/// archives carry their published file names.
pub fn reconcile(root: &Path) -> Result<ReconcileReport, PrepError> {
    reconcile_with_source(root, &DatasetSource::default())
}

/// Move extracted files into the canonical layout under `root`.
///
/// Archive-named directories are looked up by the file names `source`'s URLs
/// give the archives, matching what [`super::acquire`] writes.
///
/// Only vacant canonical paths are filled: an artifact already in place is
/// never overwritten, and its nested copy (if any) is left alone. Each
/// artifact is handled independently, so rerunning after a failed move picks
/// up whatever is still missing. Nothing is rolled back on failure.
pub fn reconcile_with_source(
    root: &Path,
    source: &DatasetSource,
) -> Result<ReconcileReport, PrepError> {
    let image_archive = source.archive_file_name(ArchiveKind::Images)?;
    let text_archive = source.archive_file_name(ArchiveKind::Text)?;

    info!(root = %root.display(), "checking dataset layout");

    let vacant: Vec<RequiredArtifact> = RequiredArtifact::ALL
        .iter()
        .copied()
        .filter(|artifact| !artifact.canonical_path(root).exists())
        .collect();

    if vacant.is_empty() {
        info!("all required files and directories exist, no action needed");
    }

    let mut artifacts = Vec::with_capacity(RequiredArtifact::ALL.len());
    for artifact in RequiredArtifact::ALL {
        let state = if vacant.contains(&artifact) {
            let archive_file_name = match artifact.archive() {
                ArchiveKind::Images => image_archive.as_str(),
                ArchiveKind::Text => text_archive.as_str(),
            };
            reconcile_artifact(root, artifact, archive_file_name)?
        } else {
            ArtifactState::Present
        };
        artifacts.push(ArtifactStatus { artifact, state });
    }

    Ok(ReconcileReport {
        root: root.to_path_buf(),
        artifacts,
    })
}

fn reconcile_artifact(
    root: &Path,
    artifact: RequiredArtifact,
    archive_file_name: &str,
) -> Result<ArtifactState, PrepError> {
    let Some(from) = find_nested(root, artifact, archive_file_name) else {
        warn!(
            artifact = artifact.file_name(),
            archive = archive_file_name,
            "not found in canonical or extracted layout"
        );
        return Ok(ArtifactState::Missing);
    };

    let dest = artifact.canonical_path(root);
    if !artifact.is_dir() {
        let text_dir = root.join(TEXT_DIR);
        fs::create_dir_all(&text_dir).map_err(|source| PrepError::fs(&text_dir, source))?;
    }

    fs::rename(&from, &dest).map_err(|source| PrepError::fs(&from, source))?;
    info!(from = %from.display(), to = %dest.display(), "moved");

    Ok(ArtifactState::Moved { from })
}

fn find_nested(
    root: &Path,
    artifact: RequiredArtifact,
    archive_file_name: &str,
) -> Option<PathBuf> {
    artifact
        .nested_candidates(root, archive_file_name)
        .into_iter()
        .find(|candidate| {
            if artifact.is_dir() {
                candidate.is_dir()
            } else {
                candidate.is_file()
            }
        })
}
