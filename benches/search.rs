use criterion::{Criterion, criterion_group, criterion_main};
use lore_rag::config::SplitConfig;
use lore_rag::embeddings::Embedder;
use lore_rag::index::VectorIndex;
use lore_rag::loader::{Page, split_text};
use std::hint::black_box;

const DIMENSION: usize = 768;

/// Cheap deterministic vectors so the bench measures search, not embedding
struct HashEmbedder;

impl HashEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let seed = text
            .bytes()
            .fold(17_u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
        (0..DIMENSION)
            .map(|i| {
                let mixed = seed.wrapping_mul(2_654_435_761).rotate_left(i as u32 % 32);
                (mixed % 1000) as f32 / 1000.0
            })
            .collect()
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        "hash"
    }

    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(Self::vector(text))
    }
}

fn library(pages: usize) -> VectorIndex {
    let pages = (0..pages)
        .map(|i| Page::new("book", i, &format!("page {} of the red book", i)))
        .collect();
    VectorIndex::build(pages, &HashEmbedder, 64).expect("can build index")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let index = library(2_000);
    let query = HashEmbedder::vector("Where was the Ring forged?");
    c.bench_function("search_2000_pages", |b| {
        b.iter(|| index.search(black_box(&query), black_box(2)))
    });

    let chapter = "In a hole in the ground there lived a hobbit. ".repeat(400);
    let config = SplitConfig::default();
    c.bench_function("split_chapter", |b| {
        b.iter(|| split_text(black_box(&chapter), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
