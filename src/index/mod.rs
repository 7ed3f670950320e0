// Vector index module
// Flat exact nearest-neighbour search over page embeddings

pub mod store;


use std::io::Read;

use bincode::Options;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::loader::Page;
use crate::{LoreError, Result};

pub use store::{IndexOrigin, IndexStatus, IndexStore};

const INDEX_MAGIC: [u8; 4] = *b"LORE";
const FORMAT_VERSION: u32 = 1;
const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// A page together with the vector its content was embedded to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub page: Page,
    pub vector: Vec<f32>,
}

/// Search result; `score` is the squared L2 distance, so lower is closer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub page: &'a Page,
    pub score: f32,
}

/// Leading record of a serialized index, readable without the entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    magic: [u8; 4],
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: u64,
    pub created_at: DateTime<Utc>,
    pub entry_count: u64,
}

/// In-memory vector index, read-only once built
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    embedding_model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every page and collect the results into a new index.
    ///
    /// Either every page is embedded or the build fails; there is no partial
    /// index. An empty page list gives an empty index.
    #[inline]
    pub fn build<E: Embedder + ?Sized>(
        pages: Vec<Page>,
        embedder: &E,
        batch_size: usize,
    ) -> Result<Self> {
        let mut index = Self {
            embedding_model: embedder.model_id().to_string(),
            dimension: 0,
            created_at: Utc::now(),
            entries: Vec::with_capacity(pages.len()),
        };

        if pages.is_empty() {
            info!("No pages to embed, created an empty index");
            return Ok(index);
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(pages.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} pages")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        for batch in &pages.into_iter().chunks(batch_size.max(1)) {
            let batch: Vec<Page> = batch.collect();
            let texts: Vec<String> = batch.iter().map(|page| page.content.clone()).collect();

            let vectors = embedder
                .embed_documents(&texts)
                .map_err(|e| LoreError::Embedding(format!("{:#}", e)))?;

            if vectors.len() != batch.len() {
                return Err(LoreError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (page, vector) in batch.into_iter().zip(vectors) {
                index.push(page, vector)?;
            }
            bar.inc(texts.len() as u64);
        }

        bar.finish_and_clear();
        info!(
            "Built index of {} pages ({} dimensions) with {}",
            index.len(),
            index.dimension,
            index.embedding_model
        );
        Ok(index)
    }

    fn push(&mut self, page: Page, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(LoreError::Embedding(format!(
                "Empty embedding for {} page {}",
                page.source_title, page.page_number
            )));
        }

        if self.entries.is_empty() {
            self.dimension = vector.len();
        } else if vector.len() != self.dimension {
            return Err(LoreError::Embedding(format!(
                "Embedding dimension changed from {} to {}",
                self.dimension,
                vector.len()
            )));
        }

        self.entries.push(IndexEntry { page, vector });
        Ok(())
    }

    /// Return the `k` entries closest to `query`, nearest first.
    ///
    /// Equal distances keep insertion order, so results are fully ordered.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(LoreError::Index(format!(
                "Query has {} dimensions but the index has {}",
                query.len(),
                self.dimension
            )));
        }

        let hits = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, squared_l2(query, &entry.vector), entry))
            .k_smallest_by(k, |a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(_, score, entry)| SearchHit {
                page: &entry.page,
                score,
            })
            .collect::<Vec<_>>();

        debug!("Search returned {} of {} entries", hits.len(), self.len());
        Ok(hits)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[inline]
    pub fn header(&self) -> IndexHeader {
        IndexHeader {
            magic: INDEX_MAGIC,
            format_version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension as u64,
            created_at: self.created_at,
            entry_count: self.entries.len() as u64,
        }
    }

    /// Serialize to the on-disk blob: header record followed by the entries
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = bincode::serialize(&self.header())
            .map_err(|e| LoreError::Index(format!("Failed to serialize index header: {}", e)))?;
        bincode::serialize_into(&mut bytes, &self.entries)
            .map_err(|e| LoreError::Index(format!("Failed to serialize index entries: {}", e)))?;
        Ok(bytes)
    }

    /// Rebuild an index from its blob, bound to the embedder that will query it.
    ///
    /// Fails if the blob is corrupt or was produced by a different embedding
    /// model than `embedder`.
    #[inline]
    pub fn from_bytes<E: Embedder + ?Sized>(bytes: &[u8], embedder: &E) -> Result<Self> {
        let header = read_header(bytes)?;

        if header.embedding_model != embedder.model_id() {
            return Err(LoreError::IndexMismatch {
                expected: embedder.model_id().to_string(),
                found: header.embedding_model,
            });
        }

        let offset = bincode::serialized_size(&header)
            .ok()
            .and_then(|size| usize::try_from(size).ok())
            .filter(|&size| size <= bytes.len())
            .ok_or_else(|| LoreError::Index("Corrupt index header".to_string()))?;

        let entries: Vec<IndexEntry> = bincode::deserialize(&bytes[offset..])
            .map_err(|e| LoreError::Index(format!("Corrupt index entries: {}", e)))?;

        if entries.len() as u64 != header.entry_count {
            return Err(LoreError::Index(format!(
                "Index header promises {} entries but {} were read",
                header.entry_count,
                entries.len()
            )));
        }

        let dimension = usize::try_from(header.dimension)
            .map_err(|_| LoreError::Index(format!("Invalid dimension {}", header.dimension)))?;
        if let Some(entry) = entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(LoreError::Index(format!(
                "Entry for {} page {} has {} dimensions, expected {}",
                entry.page.source_title,
                entry.page.page_number,
                entry.vector.len(),
                dimension
            )));
        }

        Ok(Self {
            embedding_model: header.embedding_model,
            dimension,
            created_at: header.created_at,
            entries,
        })
    }
}

/// Decode and check the header record at the start of an index blob
#[inline]
pub fn read_header(bytes: &[u8]) -> Result<IndexHeader> {
    read_header_from(bytes)
}

/// Decode and check the header from the start of `reader`, leaving the
/// entries unread
#[inline]
pub fn read_header_from<R: Read>(reader: R) -> Result<IndexHeader> {
    let header: IndexHeader = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_HEADER_BYTES)
        .deserialize_from(reader)
        .map_err(|e| LoreError::Index(format!("Corrupt index header: {}", e)))?;

    if header.magic != INDEX_MAGIC {
        return Err(LoreError::Index("Not a lore-rag index file".to_string()));
    }

    if header.format_version != FORMAT_VERSION {
        return Err(LoreError::Index(format!(
            "Unsupported index format version {} (expected {})",
            header.format_version, FORMAT_VERSION
        )));
    }

    Ok(header)
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
