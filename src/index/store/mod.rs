#[cfg(test)]
mod tests;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{VectorIndex, read_header_from};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::loader::Page;
use crate::{LoreError, Result};

/// Persists a [`VectorIndex`] to a single file
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
    batch_size: usize,
}

/// Whether [`IndexStore::build_or_load`] built a fresh index or read the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Built,
    Loaded,
}

/// What is known about the index file without loading its entries
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStatus {
    pub file_size: u64,
    pub embedding_model: String,
    pub dimension: u64,
    pub entry_count: u64,
    pub created_at: DateTime<Utc>,
}

impl IndexStore {
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P, batch_size: usize) -> Self {
        Self {
            path: path.into(),
            batch_size: batch_size.max(1),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index_file_path(), config.ollama.batch_size as usize)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the index file if present, otherwise build and save a new one.
    ///
    /// `load_pages` is only called when the file does not exist. A file that
    /// exists but cannot be read is an error; it is never rebuilt silently.
    #[inline]
    pub fn build_or_load<E, F>(&self, embedder: &E, load_pages: F) -> Result<(VectorIndex, IndexOrigin)>
    where
        E: Embedder + ?Sized,
        F: FnOnce() -> Result<Vec<Page>>,
    {
        if self.exists() {
            info!("Loading index from {}", self.path.display());
            let index = self.load(embedder)?;
            return Ok((index, IndexOrigin::Loaded));
        }

        info!(
            "No index at {}, building a new one",
            self.path.display()
        );
        let index = self.build(embedder, load_pages)?;
        Ok((index, IndexOrigin::Built))
    }

    /// Build a fresh index and replace the existing file with it.
    ///
    /// The old file stays in place until the new index has been saved, so a
    /// failed rebuild leaves the previous index usable.
    #[inline]
    pub fn rebuild<E, F>(&self, embedder: &E, load_pages: F) -> Result<VectorIndex>
    where
        E: Embedder + ?Sized,
        F: FnOnce() -> Result<Vec<Page>>,
    {
        if self.exists() {
            info!("Rebuilding index at {}", self.path.display());
        }
        self.build(embedder, load_pages)
    }

    fn build<E, F>(&self, embedder: &E, load_pages: F) -> Result<VectorIndex>
    where
        E: Embedder + ?Sized,
        F: FnOnce() -> Result<Vec<Page>>,
    {
        let pages = load_pages()?;
        let index = VectorIndex::build(pages, embedder, self.batch_size)?;
        self.save(&index)?;
        Ok(index)
    }

    /// Read the index file, bound to `embedder`
    #[inline]
    pub fn load<E: Embedder + ?Sized>(&self, embedder: &E) -> Result<VectorIndex> {
        let bytes = fs::read(&self.path)?;
        let index = VectorIndex::from_bytes(&bytes, embedder)?;
        debug!(
            "Loaded {} entries from {}",
            index.len(),
            self.path.display()
        );
        Ok(index)
    }

    /// Write the index next to its final location, then move it into place
    #[inline]
    pub fn save(&self, index: &VectorIndex) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = index.to_bytes()?;
        let temp_path = self.path.with_extension("partial");
        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, &self.path)?;

        info!(
            "Saved index with {} entries ({} bytes) to {}",
            index.len(),
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Summarize the index file, or `None` if it has not been built yet
    #[inline]
    pub fn status(&self) -> Result<Option<IndexStatus>> {
        if !self.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();
        let header = read_header_from(BufReader::new(file)).map_err(|e| match e {
            LoreError::Index(reason) => {
                LoreError::Index(format!("{}: {}", self.path.display(), reason))
            }
            other => other,
        })?;

        Ok(Some(IndexStatus {
            file_size,
            embedding_model: header.embedding_model,
            dimension: header.dimension,
            entry_count: header.entry_count,
            created_at: header.created_at,
        }))
    }
}
