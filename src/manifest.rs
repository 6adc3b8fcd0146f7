//! Build manifest handed to the host site builder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One copied or extracted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Source file the output came from
    pub input_path: PathBuf,
    /// Directory the output lives under (build dir, or the root for in-place docs)
    pub output_root: PathBuf,
    /// Output path relative to `output_root`, with `/` separators
    pub output_relpath: String,
}

impl FileRecord {
    pub fn output_path(&self) -> PathBuf {
        self.output_root.join(&self.output_relpath)
    }
}

/// Ordered records of one build pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    records: Vec<FileRecord>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl IntoIterator for Manifest {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
