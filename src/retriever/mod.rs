// Retriever module
// Finds the pages closest to a question and renders them as prompt context


use itertools::Itertools;
use tracing::debug;

use crate::embeddings::Embedder;
use crate::index::{SearchHit, VectorIndex};
use crate::{LoreError, Result};

/// Top-k similarity retrieval over a [`VectorIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retriever {
    top_k: usize,
}

impl Default for Retriever {
    fn default() -> Self {
        Self { top_k: 2 }
    }
}

impl Retriever {
    #[inline]
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return the closest pages, nearest first
    #[inline]
    pub fn retrieve<'a, E: Embedder + ?Sized>(
        &self,
        query: &str,
        index: &'a VectorIndex,
        embedder: &E,
    ) -> Result<Vec<SearchHit<'a>>> {
        if index.is_empty() || self.top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = embedder
            .embed_query(query)
            .map_err(|e| LoreError::Embedding(format!("{:#}", e)))?;

        let hits = index.search(&vector, self.top_k)?;
        for hit in &hits {
            debug!(
                "Retrieved {} page {} (distance {:.4})",
                hit.page.source_title, hit.page.page_number, hit.score
            );
        }
        Ok(hits)
    }

    /// Retrieve and render in one step
    #[inline]
    pub fn context_for<E: Embedder + ?Sized>(
        &self,
        query: &str,
        index: &VectorIndex,
        embedder: &E,
    ) -> Result<String> {
        let hits = self.retrieve(query, index, embedder)?;
        Ok(render_context(&hits))
    }
}

/// Join the hits' page contents, separated by a blank line
#[inline]
pub fn render_context(hits: &[SearchHit<'_>]) -> String {
    hits.iter().map(|hit| hit.page.content.as_str()).join("\n\n")
}
