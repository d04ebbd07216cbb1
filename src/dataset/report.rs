//! Report types for acquisition and reconciliation.
//!
//! Every operation returns a structured report that renders as text for
//! people and serializes to JSON for scripts.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::{ArchiveKind, RequiredArtifact};

/// Result of [`super::acquire`].
#[derive(Clone, Debug, Serialize)]
pub struct AcquireReport {
    pub root: PathBuf,
    pub outcome: AcquireOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcquireOutcome {
    /// The image directory already existed; nothing was fetched.
    AlreadyPresent,
    /// Archives were obtained and extracted under the root.
    Fetched { archives: Vec<ArchiveOutcome> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchiveOutcome {
    pub kind: ArchiveKind,
    pub file_name: String,
    pub origin: ArchiveOrigin,
    pub extracted_entries: usize,
}

/// Whether an archive came from the network or an earlier run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveOrigin {
    Downloaded,
    Cached,
}

impl AcquireReport {
    pub fn already_present(&self) -> bool {
        self.outcome == AcquireOutcome::AlreadyPresent
    }

    /// Number of archives actually fetched over the network.
    pub fn download_count(&self) -> usize {
        match &self.outcome {
            AcquireOutcome::AlreadyPresent => 0,
            AcquireOutcome::Fetched { archives } => archives
                .iter()
                .filter(|a| a.origin == ArchiveOrigin::Downloaded)
                .count(),
        }
    }
}

impl fmt::Display for AcquireReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AcquireOutcome::AlreadyPresent => {
                writeln!(f, "Dataset already present in {}", self.root.display())
            }
            AcquireOutcome::Fetched { archives } => {
                writeln!(f, "Dataset acquired in {}:", self.root.display())?;
                for archive in archives {
                    let origin = match archive.origin {
                        ArchiveOrigin::Downloaded => "downloaded",
                        ArchiveOrigin::Cached => "cached",
                    };
                    writeln!(
                        f,
                        "  {} ({}, {} entries extracted)",
                        archive.file_name, origin, archive.extracted_entries
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// State of one required artifact after an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactState {
    Present,
    Moved { from: PathBuf },
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub artifact: RequiredArtifact,
    pub state: ArtifactState,
}

impl ArtifactStatus {
    /// True when the artifact now sits at its canonical path.
    pub fn is_available(&self) -> bool {
        !matches!(self.state, ArtifactState::Missing)
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.artifact.relative_path();
        match &self.state {
            ArtifactState::Present => write!(f, "ok       {}", path.display()),
            ArtifactState::Moved { from } => {
                write!(f, "moved    {} (from {})", path.display(), from.display())
            }
            ArtifactState::Missing => write!(f, "missing  {}", path.display()),
        }
    }
}

/// Result of [`super::reconcile`]: the full required-set evaluation.
#[derive(Clone, Debug, Serialize)]
pub struct ReconcileReport {
    pub root: PathBuf,
    pub artifacts: Vec<ArtifactStatus>,
}

impl ReconcileReport {
    /// True when everything was already canonical and nothing moved.
    pub fn no_action_needed(&self) -> bool {
        self.artifacts
            .iter()
            .all(|status| status.state == ArtifactState::Present)
    }

    pub fn moved_count(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|status| matches!(status.state, ArtifactState::Moved { .. }))
            .count()
    }

    /// Artifacts still absent from their canonical path.
    pub fn missing(&self) -> Vec<RequiredArtifact> {
        missing_of(&self.artifacts)
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.no_action_needed() {
            return writeln!(
                f,
                "All required files and directories exist in {}. No action needed.",
                self.root.display()
            );
        }

        writeln!(
            f,
            "Reconciled {}: {} moved, {} missing",
            self.root.display(),
            self.moved_count(),
            self.missing().len()
        )?;
        writeln!(f)?;
        for status in &self.artifacts {
            writeln!(f, "  {}", status)?;
        }
        Ok(())
    }
}

/// Read-only evaluation of the canonical layout.
#[derive(Clone, Debug, Serialize)]
pub struct LayoutStatus {
    pub root: PathBuf,
    pub artifacts: Vec<ArtifactStatus>,
    /// Image files under the image directory, if it exists.
    pub image_count: Option<usize>,
}

impl LayoutStatus {
    pub fn missing(&self) -> Vec<RequiredArtifact> {
        missing_of(&self.artifacts)
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl fmt::Display for LayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self.missing().len();
        if missing == 0 {
            writeln!(f, "Dataset complete in {}", self.root.display())?;
        } else {
            writeln!(
                f,
                "Dataset incomplete in {}: {} of {} artifact(s) missing",
                self.root.display(),
                missing,
                self.artifacts.len()
            )?;
        }
        writeln!(f)?;
        for status in &self.artifacts {
            writeln!(f, "  {}", status)?;
        }
        if let Some(count) = self.image_count {
            writeln!(f)?;
            writeln!(f, "  {} image file(s)", count)?;
        }
        Ok(())
    }
}

fn missing_of(artifacts: &[ArtifactStatus]) -> Vec<RequiredArtifact> {
    artifacts
        .iter()
        .filter(|status| !status.is_available())
        .map(|status| status.artifact)
        .collect()
}
