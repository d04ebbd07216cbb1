use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use flickr8k_prep::dataset::RequiredArtifact;
use safetensors::tensor::TensorView;
use safetensors::Dtype;

/// Where a fixture puts an artifact before reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Canonical,
    /// Under a directory named after the archive, keeping the canonical path.
    ArchiveDir,
    /// Directly under the archive-named directory (text files only).
    ArchiveDirFlat,
    /// Directly under the root (text files only).
    RootFlat,
    Absent,
}

pub fn write_text(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write text file");
}

/// Create `artifact` at the location `placement` describes. Returns the path
/// written, if any.
pub fn place(root: &Path, artifact: RequiredArtifact, placement: Placement) -> Option<PathBuf> {
    let archive_dir = root.join(artifact.archive().default_file_name());
    let path = match placement {
        Placement::Canonical => artifact.canonical_path(root),
        Placement::ArchiveDir => archive_dir.join(artifact.relative_path()),
        Placement::ArchiveDirFlat if !artifact.is_dir() => archive_dir.join(artifact.file_name()),
        Placement::RootFlat if !artifact.is_dir() => root.join(artifact.file_name()),
        Placement::ArchiveDirFlat | Placement::RootFlat => artifact.canonical_path(root),
        Placement::Absent => return None,
    };

    if artifact.is_dir() {
        write_text(&path.join("1000268201_693b08cb0e.jpg"), "jpeg");
    } else {
        write_text(&path, artifact.file_name());
    }
    Some(path)
}

pub fn populate_canonical(root: &Path) {
    for artifact in RequiredArtifact::ALL {
        place(root, artifact, Placement::Canonical);
    }
}

pub fn write_checkpoint(path: &Path) {
    let embedding: Vec<u8> = [0.25f32, 0.5, 0.75, 1.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let steps: Vec<u8> = 1200i64.to_le_bytes().to_vec();
    let tensors = vec![
        (
            "encoder.embedding.weight",
            TensorView::new(Dtype::F32, vec![2, 2], &embedding).expect("embedding view"),
        ),
        (
            "optimizer.step",
            TensorView::new(Dtype::I64, vec![], &steps).expect("step view"),
        ),
    ];
    let bytes = safetensors::serialize(tensors, &None::<HashMap<String, String>>)
        .expect("serialize checkpoint");
    write_bytes(path, &bytes);
}

fn write_bytes(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bytes).expect("write file");
}
