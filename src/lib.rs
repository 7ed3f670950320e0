use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoreError>;

#[derive(Error, Debug)]
pub enum LoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to extract pages from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error(
        "Index was built with embedding model '{found}' but '{expected}' is configured; delete the index file to rebuild it"
    )]
    IndexMismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod loader;
pub mod ollama;
pub mod prompt;
pub mod retriever;
