//! Paired index/entries artifacts bound by a BLAKE3 checksum
//!
//! The index artifact records the hash of the entries artifact it was saved
//! with. Both are written through temp files and renamed entries-first, so an
//! interrupted save leaves a checksum mismatch rather than a silently
//! mismatched pair.

use crate::embedding::{Corpus, FlatIndex};
use crate::knowledge::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Bumped whenever either artifact layout changes
pub const FORMAT_VERSION: u32 = 1;

const COMPRESSION_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Persisted index not found: {0}")]
    NotFound(PathBuf),

    #[error("Persisted index is corrupt: {0}")]
    Corrupt(String),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Serialization error: {context}: {source}")]
    Serialization {
        source: serde_json::Error,
        context: String,
    },
}

impl PersistenceError {
    /// Whether this failure means "no valid persisted state" on load
    pub fn is_missing_or_corrupt(&self) -> bool {
        !matches!(self, PersistenceError::Io { .. })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    format_version: u32,
    model: String,
    dimension: usize,
    entry_count: usize,
    entries_checksum: String,
    row_ids: Vec<usize>,
    vectors: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntriesArtifact {
    format_version: u32,
    entries: Vec<Entry>,
}

/// Derive the entries artifact path: same directory, `<stem><suffix>.json`
pub fn entries_path_for(index_path: &Path, suffix: &str) -> PathBuf {
    let stem = index_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    index_path.with_file_name(format!("{}{}.json", stem, suffix))
}

fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(context: String) -> impl FnOnce(std::io::Error) -> PersistenceError {
    move |source| PersistenceError::Io { source, context }
}

fn write_synced(path: &Path, data: &[u8]) -> Result<(), PersistenceError> {
    let mut file = fs::File::create(path)
        .map_err(io_error(format!("Failed to create {}", path.display())))?;
    file.write_all(data)
        .map_err(io_error(format!("Failed to write {}", path.display())))?;
    file.sync_all()
        .map_err(io_error(format!("Failed to sync {}", path.display())))?;
    Ok(())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, PersistenceError> {
    if !path.exists() {
        return Err(PersistenceError::NotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(|e| {
        PersistenceError::Corrupt(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Saves and loads a corpus as an index artifact plus an entries artifact
#[derive(Debug, Clone)]
pub struct IndexStore {
    index_path: PathBuf,
    entries_path: PathBuf,
}

impl IndexStore {
    pub fn new(index_path: PathBuf, entries_suffix: &str) -> Self {
        let entries_path = entries_path_for(&index_path, entries_suffix);
        Self {
            index_path,
            entries_path,
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn entries_path(&self) -> &Path {
        &self.entries_path
    }

    /// Whether both artifacts are on disk (says nothing about validity)
    pub fn exists(&self) -> bool {
        self.index_path.exists() && self.entries_path.exists()
    }

    /// Write both artifacts, creating the parent directory if needed
    pub fn save(&self, corpus: &Corpus) -> Result<(), PersistenceError> {
        if let Some(parent) = self.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error(format!(
                    "Failed to create index directory: {}",
                    parent.display()
                )))?;
            }
        }

        let entries_bytes = serde_json::to_vec_pretty(&EntriesArtifact {
            format_version: FORMAT_VERSION,
            entries: corpus.entries().to_vec(),
        })
        .map_err(|source| PersistenceError::Serialization {
            source,
            context: "Failed to serialize entries".to_string(),
        })?;

        let index = corpus.index();
        let index_json = serde_json::to_vec(&IndexArtifact {
            format_version: FORMAT_VERSION,
            model: corpus.model().to_string(),
            dimension: index.dimension(),
            entry_count: corpus.len(),
            entries_checksum: checksum(&entries_bytes),
            row_ids: index.row_ids().to_vec(),
            vectors: index.to_flat(),
        })
        .map_err(|source| PersistenceError::Serialization {
            source,
            context: "Failed to serialize index".to_string(),
        })?;
        let index_bytes = zstd::encode_all(&index_json[..], COMPRESSION_LEVEL)
            .map_err(io_error("Failed to compress index".to_string()))?;

        let entries_tmp = temp_path(&self.entries_path);
        let index_tmp = temp_path(&self.index_path);
        if let Err(e) = self.commit(&entries_tmp, &entries_bytes, &index_tmp, &index_bytes) {
            for tmp in [&entries_tmp, &index_tmp] {
                if fs::remove_file(tmp).is_ok() {
                    debug!("Removed leftover {}", tmp.display());
                }
            }
            return Err(e);
        }

        info!(
            "Saved index to {} and {} entries to {}",
            self.index_path.display(),
            corpus.len(),
            self.entries_path.display()
        );
        Ok(())
    }

    fn commit(
        &self,
        entries_tmp: &Path,
        entries_bytes: &[u8],
        index_tmp: &Path,
        index_bytes: &[u8],
    ) -> Result<(), PersistenceError> {
        write_synced(entries_tmp, entries_bytes)?;
        write_synced(index_tmp, index_bytes)?;

        // The index is the commit point: it is only valid next to these entries
        fs::rename(entries_tmp, &self.entries_path).map_err(io_error(format!(
            "Failed to move entries into place: {}",
            self.entries_path.display()
        )))?;
        fs::rename(index_tmp, &self.index_path).map_err(io_error(format!(
            "Failed to move index into place: {}",
            self.index_path.display()
        )))?;
        Ok(())
    }

    /// Load both artifacts and verify they belong together.
    ///
    /// `expected_dimension` is the active encoder's dimension; an index built
    /// with a different encoder is reported as corrupt.
    pub fn load(&self, expected_dimension: usize) -> Result<Corpus, PersistenceError> {
        let index_bytes = read_artifact(&self.index_path)?;
        let entries_bytes = read_artifact(&self.entries_path)?;

        let index_json = zstd::decode_all(&index_bytes[..]).map_err(|e| {
            PersistenceError::Corrupt(format!("Failed to decompress index: {}", e))
        })?;
        let artifact: IndexArtifact = serde_json::from_slice(&index_json)
            .map_err(|e| PersistenceError::Corrupt(format!("Failed to parse index: {}", e)))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(PersistenceError::Corrupt(format!(
                "Unsupported index format version {}",
                artifact.format_version
            )));
        }

        let actual_checksum = checksum(&entries_bytes);
        if artifact.entries_checksum != actual_checksum {
            return Err(PersistenceError::Corrupt(format!(
                "Entries checksum mismatch: index expects {}, found {}",
                artifact.entries_checksum, actual_checksum
            )));
        }

        let entries: EntriesArtifact = serde_json::from_slice(&entries_bytes)
            .map_err(|e| PersistenceError::Corrupt(format!("Failed to parse entries: {}", e)))?;

        if artifact.dimension != expected_dimension {
            return Err(PersistenceError::Corrupt(format!(
                "Index dimension {} does not match encoder dimension {}",
                artifact.dimension, expected_dimension
            )));
        }

        let rows = artifact.row_ids.len();
        if rows != artifact.entry_count || rows != entries.entries.len() {
            return Err(PersistenceError::Corrupt(format!(
                "Row count mismatch: {} rows, {} recorded entries, {} stored entries",
                rows,
                artifact.entry_count,
                entries.entries.len()
            )));
        }
        if let Some(bad) = artifact.row_ids.iter().find(|&&id| id >= rows) {
            return Err(PersistenceError::Corrupt(format!(
                "Row maps to entry {} outside {} entries",
                bad, rows
            )));
        }

        let index = FlatIndex::from_parts(artifact.dimension, artifact.vectors, artifact.row_ids)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

        debug!("Verified entries checksum {}", actual_checksum);
        info!(
            "Loaded index with {} vectors and {} entries",
            index.len(),
            entries.entries.len()
        );

        Ok(Corpus::from_parts(index, entries.entries, artifact.model))
    }
}
