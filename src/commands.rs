use std::io;

use console::style;
use tracing::{info, warn};

use crate::chat::{ChatSession, write_exchange};
use crate::config::Config;
use crate::index::{IndexOrigin, IndexStore, VectorIndex};
use crate::loader::DocumentLoader;
use crate::ollama::OllamaClient;
use crate::retriever::{Retriever, render_context};
use crate::{LoreError, Result};

/// Build the Ollama client and check the configured models are available.
///
/// A failed check is only a warning; the first real request will report the
/// actual problem.
fn connect(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.ollama)?;

    let models = [
        config.ollama.embedding_model.as_str(),
        config.generation.model.as_str(),
    ];
    if let Err(e) = client.health_check(&models) {
        warn!("Ollama health check failed: {:#}", e);
    }

    Ok(client)
}

/// Load the index file, building it from the books directory first if needed
fn open_index(config: &Config, client: &OllamaClient) -> Result<VectorIndex> {
    let store = IndexStore::from_config(config);
    let books_dir = config.books_dir();

    let (index, origin) = store.build_or_load(client, || {
        DocumentLoader::from_config(config).load(&books_dir)
    })?;

    match origin {
        IndexOrigin::Built => info!(
            "Indexed {} pages from {}",
            index.len(),
            books_dir.display()
        ),
        IndexOrigin::Loaded => info!(
            "Loaded {} pages from {}",
            index.len(),
            store.path().display()
        ),
    }

    if index.is_empty() {
        warn!(
            "The index is empty; add books to {} and run 'lore-rag index --rebuild'",
            books_dir.display()
        );
    }

    Ok(index)
}

/// Interactive question loop on stdin and stdout
#[inline]
pub fn run_chat(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let index = open_index(config, &client)?;

    let session = ChatSession::new(
        &index,
        &client,
        &client,
        Retriever::new(config.retrieval.top_k),
        config.generation_options(),
    );

    let stdin = io::stdin();
    let answered = session.run(stdin.lock(), io::stdout().lock())?;
    info!("Chat ended after {} answered questions", answered);
    Ok(())
}

/// Answer a single question and exit
#[inline]
pub fn ask(config: &Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(LoreError::Config("Question cannot be empty".to_string()));
    }

    let client = connect(config)?;
    let index = open_index(config, &client)?;

    let session = ChatSession::new(
        &index,
        &client,
        &client,
        Retriever::new(config.retrieval.top_k),
        config.generation_options(),
    );

    let exchange = session.answer(question)?;
    write_exchange(&mut io::stdout().lock(), question, &exchange)
}

/// Print the pages that would be sent as context, without calling the LLM
#[inline]
pub fn search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let client = connect(config)?;
    let index = open_index(config, &client)?;

    let retriever = Retriever::new(top_k.unwrap_or(config.retrieval.top_k));
    let hits = retriever.retrieve(query, &index, &client)?;

    if hits.is_empty() {
        println!("No matching pages.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        eprintln!(
            "{} {} page {} (distance {:.4})",
            style(format!("#{}", rank + 1)).bold().cyan(),
            hit.page.source_title,
            hit.page.page_number,
            hit.score
        );
    }
    println!("{}", render_context(&hits));

    Ok(())
}

/// Build the index if missing, or from scratch with `rebuild`
#[inline]
pub fn index(config: &Config, rebuild: bool) -> Result<()> {
    let client = connect(config)?;
    let store = IndexStore::from_config(config);
    let books_dir = config.books_dir();
    let load_pages = || DocumentLoader::from_config(config).load(&books_dir);

    if rebuild {
        let index = store.rebuild(&client, load_pages)?;
        println!(
            "{} Rebuilt index with {} pages",
            style("✓").green(),
            index.len()
        );
        return Ok(());
    }

    let (index, origin) = store.build_or_load(&client, load_pages)?;
    match origin {
        IndexOrigin::Built => println!(
            "{} Built index with {} pages",
            style("✓").green(),
            index.len()
        ),
        IndexOrigin::Loaded => println!(
            "Index already exists with {} pages. Use --rebuild to index the books again.",
            index.len()
        ),
    }

    Ok(())
}

/// Describe the index file and the books directory
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    let store = IndexStore::from_config(config);
    let books_dir = config.books_dir();

    println!("{}", style("Lore RAG Status").bold().cyan());
    println!();

    println!("{}", style("Books").bold().yellow());
    println!("  Directory: {}", books_dir.display());
    match crate::loader::discover_files(&books_dir) {
        Ok(files) => println!("  Files: {}", files.len()),
        Err(e) => println!("  {}", style(e).red()),
    }
    println!();

    println!("{}", style("Index").bold().yellow());
    println!("  File: {}", store.path().display());
    match store.status()? {
        Some(status) => {
            println!("  Pages: {}", status.entry_count);
            println!("  Dimensions: {}", status.dimension);
            println!("  Embedding model: {}", status.embedding_model);
            println!("  Size: {} bytes", status.file_size);
            println!(
                "  Created: {}",
                status.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );

            if status.embedding_model != config.ollama.embedding_model {
                println!(
                    "  {}",
                    style(format!(
                        "Configured embedding model '{}' differs; run 'lore-rag index --rebuild'",
                        config.ollama.embedding_model
                    ))
                    .yellow()
                );
            }
        }
        None => println!("  Not built yet. Run 'lore-rag index' or start a chat."),
    }

    Ok(())
}
