//! Model checkpoint loading.
//!
//! Checkpoints are `safetensors` files. [`load`] reads the whole file and
//! returns every tensor keyed by parameter name. Shapes are not checked
//! against any architecture; that belongs to whoever builds the model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use safetensors::SafeTensors;
use serde::Serialize;
use tracing::debug;

use crate::error::PrepError;

/// One named parameter from a checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TensorEntry {
    /// Element type as named in the safetensors header (`F32`, `I64`, ...).
    pub dtype: String,
    pub shape: Vec<usize>,
    /// Raw little-endian element bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl TensorEntry {
    /// Number of elements (product of the shape; 1 for scalars).
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// A deserialized checkpoint: parameter name to tensor data.
#[derive(Clone, Debug, Serialize)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub tensors: BTreeMap<String, TensorEntry>,
    /// Free-form `__metadata__` strings from the header, if any, sorted by key.
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Checkpoint {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TensorEntry> {
        self.tensors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Total number of scalar parameters across all tensors.
    pub fn parameter_count(&self) -> usize {
        self.tensors.values().map(TensorEntry::element_count).sum()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Checkpoint {}: {} tensor(s), {} parameter(s)",
            self.path.display(),
            self.len(),
            self.parameter_count()
        )?;
        writeln!(f)?;
        for (name, tensor) in &self.tensors {
            writeln!(f, "  {:<40} {:<5} {:?}", name, tensor.dtype, tensor.shape)?;
        }
        Ok(())
    }
}

/// Load a safetensors checkpoint from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Checkpoint, PrepError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PrepError::CheckpointNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| PrepError::fs(path, source))?;
    let deserialization_error = |message: String| PrepError::Deserialization {
        path: path.to_path_buf(),
        message,
    };

    let (_, header) = SafeTensors::read_metadata(&bytes)
        .map_err(|source| deserialization_error(source.to_string()))?;
    let parsed = SafeTensors::deserialize(&bytes)
        .map_err(|source| deserialization_error(source.to_string()))?;

    let tensors: BTreeMap<String, TensorEntry> = parsed
        .tensors()
        .into_iter()
        .map(|(name, view)| {
            let entry = TensorEntry {
                dtype: format!("{:?}", view.dtype()),
                shape: view.shape().to_vec(),
                data: view.data().to_vec(),
            };
            (name, entry)
        })
        .collect();

    let metadata = header.metadata().as_ref().map(|entries| {
        entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    });

    debug!(path = %path.display(), tensors = tensors.len(), "checkpoint loaded");

    Ok(Checkpoint {
        path: path.to_path_buf(),
        tensors,
        metadata,
    })
}
