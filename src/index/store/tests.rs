use super::*;
use std::cell::Cell;
use tempfile::TempDir;

/// Embeds text by its length and vowel count, counting document calls
struct CountingEmbedder {
    model: &'static str,
    document_calls: Cell<usize>,
}

impl CountingEmbedder {
    fn new(model: &'static str) -> Self {
        Self {
            model,
            document_calls: Cell::new(0),
        }
    }

    fn vector(text: &str) -> Vec<f32> {
        let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
        vec![text.len() as f32, vowels as f32]
    }
}

impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.model
    }

    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.document_calls.set(self.document_calls.get() + 1);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(Self::vector(text))
    }
}

fn sample_pages() -> Result<Vec<Page>> {
    Ok(vec![
        Page::new("hobbit", 0, "In a hole in the ground there lived a hobbit"),
        Page::new("hobbit", 1, "Gandalf knocked"),
    ])
}

fn store_in(dir: &TempDir) -> IndexStore {
    IndexStore::new(dir.path().join("embeddings").join("book.embeddings"), 8)
}

#[test]
fn builds_when_missing_and_creates_parent_dirs() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    let (index, origin) = store
        .build_or_load(&embedder, sample_pages)
        .expect("build should succeed");

    assert_eq!(origin, IndexOrigin::Built);
    assert_eq!(index.len(), 2);
    assert!(store.exists());
    assert!(!store.path().with_extension("partial").exists());
}

#[test]
fn second_start_loads_without_touching_books_or_embedder() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    let (built, _) = store
        .build_or_load(&embedder, sample_pages)
        .expect("build should succeed");
    let calls_after_build = embedder.document_calls.get();

    let (loaded, origin) = store
        .build_or_load(&embedder, || panic!("pages must not be reloaded"))
        .expect("load should succeed");

    assert_eq!(origin, IndexOrigin::Loaded);
    assert_eq!(embedder.document_calls.get(), calls_after_build);
    assert_eq!(loaded.entries(), built.entries());

    let query = embedder.embed_query("hobbit").expect("query embeds");
    assert_eq!(
        loaded.search(&query, 2).expect("search should succeed"),
        built.search(&query, 2).expect("search should succeed")
    );
}

#[test]
fn empty_library_gives_an_empty_index_file() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    let (index, _) = store
        .build_or_load(&embedder, || Ok(Vec::new()))
        .expect("build should succeed");

    assert!(index.is_empty());
    assert_eq!(embedder.document_calls.get(), 0);

    let status = store
        .status()
        .expect("status should succeed")
        .expect("index file should exist");
    assert_eq!(status.entry_count, 0);
}

#[test]
fn corrupt_file_is_an_error_and_is_left_alone() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    fs::create_dir_all(store.path().parent().expect("has parent")).expect("should create dir");
    fs::write(store.path(), b"definitely not an index").expect("should write file");

    let result = store.build_or_load(&embedder, || panic!("must not rebuild"));

    assert!(matches!(result, Err(LoreError::Index(_))));
    assert_eq!(
        fs::read(store.path()).expect("file still there"),
        b"definitely not an index"
    );
}

#[test]
fn loader_failure_leaves_no_file_behind() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    let result = store.build_or_load(&embedder, || {
        Err(LoreError::Config("books missing".to_string()))
    });

    assert!(matches!(result, Err(LoreError::Config(_))));
    assert!(!store.exists());
}

#[test]
fn index_from_another_model_is_rejected() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);

    store
        .build_or_load(&CountingEmbedder::new("model-a"), sample_pages)
        .expect("build should succeed");

    let result = store.load(&CountingEmbedder::new("model-b"));
    assert!(matches!(result, Err(LoreError::IndexMismatch { .. })));
}

#[test]
fn rebuild_replaces_the_existing_file() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    store
        .build_or_load(&embedder, sample_pages)
        .expect("build should succeed");

    let rebuilt = store
        .rebuild(&embedder, || Ok(vec![Page::new("silmarillion", 0, "Ainur")]))
        .expect("rebuild should succeed");

    assert_eq!(rebuilt.len(), 1);
    let loaded = store.load(&embedder).expect("load should succeed");
    assert_eq!(loaded.entries()[0].page.source_title, "silmarillion");
}

#[test]
fn failed_rebuild_keeps_the_previous_index() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    store
        .build_or_load(&embedder, sample_pages)
        .expect("build should succeed");

    let result = store.rebuild(&embedder, || {
        Err(LoreError::Extraction {
            path: PathBuf::from("bad.pdf"),
            reason: "corrupt".to_string(),
        })
    });

    assert!(matches!(result, Err(LoreError::Extraction { .. })));
    assert!(store.exists());
    let loaded = store.load(&embedder).expect("previous index should still load");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.entries()[0].page.source_title, "hobbit");
}

#[test]
fn status_reports_header_without_loading() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);
    let embedder = CountingEmbedder::new("counting");

    assert!(store.status().expect("status should succeed").is_none());

    store
        .build_or_load(&embedder, sample_pages)
        .expect("build should succeed");

    let status = store
        .status()
        .expect("status should succeed")
        .expect("index file should exist");

    assert_eq!(status.embedding_model, "counting");
    assert_eq!(status.dimension, 2);
    assert_eq!(status.entry_count, 2);
    assert_eq!(
        status.file_size,
        fs::metadata(store.path()).expect("metadata").len()
    );
}

#[test]
fn status_of_a_garbled_header_is_an_index_error() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let store = store_in(&temp_dir);

    // Valid magic and version, then a model name length far past the file
    let mut bytes = b"LORE".to_vec();
    bytes.extend_from_slice(&1_u32.to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    fs::create_dir_all(store.path().parent().expect("has parent")).expect("should create dir");
    fs::write(store.path(), &bytes).expect("should write file");

    let result = store.status();

    match result {
        Err(LoreError::Index(reason)) => assert!(reason.contains("book.embeddings")),
        other => panic!("expected index error, got {:?}", other),
    }
}

#[test]
fn from_config_uses_library_paths() {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let config = Config::load(temp_dir.path()).expect("defaults should load");

    let store = IndexStore::from_config(&config);

    assert_eq!(
        store.path(),
        temp_dir.path().join("embeddings").join("book.embeddings")
    );
}
