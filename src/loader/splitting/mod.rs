
use std::collections::VecDeque;

use crate::config::SplitConfig;

/// Separators tried in order, from paragraph breaks down to single characters
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Split page text into pieces of at most `chunk_size` characters.
///
/// Text that already fits is returned untouched as a single piece. Longer
/// text is cut at the coarsest separator that works, and neighbouring pieces
/// share up to `chunk_overlap` characters. Whitespace-only text yields no
/// pieces at all.
#[inline]
pub fn split_text(text: &str, config: &SplitConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if char_len(text) <= config.chunk_size {
        return vec![text.to_string()];
    }

    split_recursive(text, &SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: &SplitConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = separators.get(position + 1..).unwrap_or(&[]);

    let splits: Vec<&str> = if separator.is_empty() {
        text.split_inclusive(|_: char| true).collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting = Vec::new();

    for split in splits {
        if char_len(split) <= config.chunk_size {
            fitting.push(split);
            continue;
        }

        if !fitting.is_empty() {
            chunks.extend(merge_splits(&fitting, separator, config));
            fitting.clear();
        }

        if finer.is_empty() {
            chunks.push(split.trim().to_string());
        } else {
            chunks.extend(split_recursive(split, finer, config));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_splits(&fitting, separator, config));
    }

    chunks
}

/// Greedily join small splits back together, keeping a tail for overlap
fn merge_splits(splits: &[&str], separator: &str, config: &SplitConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for &split in splits {
        let len = char_len(split);
        let joint = if window.is_empty() { 0 } else { separator_len };

        if total + len + joint > config.chunk_size && !window.is_empty() {
            push_joined(&mut chunks, &window, separator);

            // Drop from the front until the remainder fits as overlap
            while total > config.chunk_overlap
                || (total > 0 && total + len + separator_len > config.chunk_size)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
            }
        }

        let joint = if window.is_empty() { 0 } else { separator_len };
        window.push_back(split);
        total += len + joint;
    }

    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
