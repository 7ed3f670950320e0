// Embeddings module
// The embedding capability used both to build the index and to query it

use anyhow::Result;

/// Turns text into fixed-length vectors.
///
/// The same model must embed the indexed pages and every later query against
/// that index; [`Embedder::model_id`] is recorded in the index file so a
/// mismatch is caught when the index is loaded.
pub trait Embedder {
    /// Identifier of the underlying model configuration
    fn model_id(&self) -> &str;

    /// Embed a batch of documents, returning one vector per input in order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_documents(texts)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_query(text)
    }
}
