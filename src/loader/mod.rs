// Document loader module
// Walks the books directory and turns every file into annotated pages

pub mod splitting;


use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, ExtractionFailurePolicy, SplitConfig};
use crate::{LoreError, Result};

pub use splitting::split_text;

/// One retrievable unit of text, annotated with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Header plus cleaned page text; this is what gets embedded
    pub content: String,
    /// Source file name without its extension
    pub source_title: String,
    /// Zero-based position of this page within its source file
    pub page_number: usize,
}

impl Page {
    #[inline]
    pub fn new(source_title: &str, page_number: usize, text: &str) -> Self {
        Self {
            content: format!("{}{}", page_header(source_title, page_number), text),
            source_title: source_title.to_string(),
            page_number,
        }
    }
}

/// Splits a source file into its raw page texts, in reading order
pub trait PageExtractor {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>>;
}

impl<T: PageExtractor + ?Sized> PageExtractor for &T {
    #[inline]
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        (**self).extract_pages(path)
    }
}

/// Extracts one text block per PDF page
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    #[inline]
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let document = lopdf::Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;

        document
            .get_pages()
            .keys()
            .map(|&page_number| {
                document
                    .extract_text(&[page_number])
                    .with_context(|| format!("Failed to extract text from page {}", page_number))
            })
            .collect()
    }
}

/// Loads every book under a directory into a flat list of pages
#[derive(Debug, Clone)]
pub struct DocumentLoader<E> {
    extractor: E,
    boilerplate: Vec<String>,
    splitting: SplitConfig,
    on_error: ExtractionFailurePolicy,
}

impl DocumentLoader<PdfExtractor> {
    /// Loader for PDF books configured from the library settings
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(PdfExtractor, config)
    }
}

impl<E: PageExtractor> DocumentLoader<E> {
    #[inline]
    pub fn new(extractor: E, config: &Config) -> Self {
        Self {
            extractor,
            boilerplate: config.library.boilerplate.clone(),
            splitting: config.splitting.clone(),
            on_error: config.library.on_extraction_error,
        }
    }

    /// Walk `root` and return the pages of every file, in walk order.
    ///
    /// With [`ExtractionFailurePolicy::Abort`] the first unreadable file fails
    /// the whole load; with [`ExtractionFailurePolicy::Skip`] it is logged and
    /// left out.
    #[inline]
    pub fn load(&self, root: &Path) -> Result<Vec<Page>> {
        let files = discover_files(root)?;
        info!("Found {} files under {}", files.len(), root.display());

        let mut pages = Vec::new();
        let mut skipped = 0;

        for path in &files {
            match self.load_file(path) {
                Ok(file_pages) => {
                    debug!("{}: {} pages", path.display(), file_pages.len());
                    pages.extend(file_pages);
                }
                Err(e) if self.on_error == ExtractionFailurePolicy::Skip => {
                    warn!("Skipping {}: {}", path.display(), e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Loaded {} pages from {} files ({} skipped)",
            pages.len(),
            files.len() - skipped,
            skipped
        );
        Ok(pages)
    }

    /// Extract, clean, split and annotate the pages of a single file
    #[inline]
    pub fn load_file(&self, path: &Path) -> Result<Vec<Page>> {
        let title = source_title(path);
        let raw_pages = self
            .extractor
            .extract_pages(path)
            .map_err(|e| LoreError::Extraction {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;

        let pages = raw_pages
            .iter()
            .map(|raw| strip_boilerplate(raw, &self.boilerplate))
            .flat_map(|cleaned| split_text(&cleaned, &self.splitting))
            .enumerate()
            .map(|(index, text)| Page::new(&title, index, &text))
            .collect();

        Ok(pages)
    }
}

/// Recursively list the files under `root`.
///
/// Entries are visited in file-name order so the page order is stable across
/// runs. Hidden entries are ignored, and links to directories are not
/// followed.
#[inline]
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(LoreError::Config(format!(
            "Books directory does not exist: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    walk(root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_symlink() {
            // Linked files are read, linked directories are not followed
            if path.is_file() {
                files.push(path);
            } else {
                debug!("Skipping link {}", path.display());
            }
        } else {
            files.push(path);
        }
    }

    Ok(())
}

/// Title of a book: its file name with the extension removed
#[inline]
pub fn source_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Provenance header prepended to every page
#[inline]
pub fn page_header(title: &str, page_number: usize) -> String {
    format!("Book title: {}\nPage: {}\n\n", title, page_number)
}

/// Remove every occurrence of each boilerplate string, leaving the rest intact
#[inline]
pub fn strip_boilerplate(text: &str, boilerplate: &[String]) -> String {
    boilerplate
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .fold(text.to_string(), |acc, pattern| acc.replace(pattern.as_str(), ""))
}
