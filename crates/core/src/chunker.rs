//! # Text Chunker
//!
//! Splits extracted document text into bounded, overlapping passages.
//!
//! The strategy is paragraph-first and greedy, the way the ingestion
//! pipeline's text splitter has always worked: prefer paragraph boundaries,
//! fall back to sentences, then words, then a hard character split, and
//! carry the tail of one passage forward as the head of the next so that
//! no `overlap`-wide window straddling a boundary is lost.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk_size must be greater than overlap (got chunk_size={chunk_size}, overlap={overlap})")]
    InvalidBounds { chunk_size: usize, overlap: usize },
    #[error("input text is empty or only whitespace")]
    EmptyContent,
}

/// Splits `text` into passages of length in `[1, chunk_size]`, carrying
/// `overlap` characters of context between consecutive passages.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ChunkError::InvalidBounds { chunk_size, overlap });
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChunkError::EmptyContent);
    }

    // Stage 1: split on blank-line boundaries into paragraphs, splitting
    // any paragraph that overflows `chunk_size` further down the ladder.
    let mut raw_passages: Vec<String> = Vec::new();
    for paragraph in split_paragraphs(trimmed) {
        split_paragraph(&paragraph, chunk_size, &mut raw_passages);
    }

    // Stage 2: stitch overlap between consecutive passages so any
    // `overlap`-wide window crossing a boundary is fully contained in one.
    Ok(apply_overlap(raw_passages, chunk_size, overlap))
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Recursively splits `paragraph` on sentence, then word, then character
/// boundaries until every emitted piece fits within `chunk_size`.
fn split_paragraph(paragraph: &str, chunk_size: usize, out: &mut Vec<String>) {
    if paragraph.chars().count() <= chunk_size {
        out.push(paragraph.to_string());
        return;
    }

    let sentences = split_sentences(paragraph);
    if sentences.len() > 1 {
        let mut buf = String::new();
        for sentence in sentences {
            if sentence.chars().count() > chunk_size {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
                split_by_words(&sentence, chunk_size, out);
                continue;
            }
            if buf.chars().count() + sentence.chars().count() + 1 > chunk_size {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(&sentence);
        }
        if !buf.is_empty() {
            out.push(buf);
        }
        return;
    }

    split_by_words(paragraph, chunk_size, out);
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '.' || c == '!' || c == '?' {
            let end = i + 1;
            let sentence: String = chars[start..end].iter().collect();
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }
    }
    if start < chars.len() {
        let rest: String = chars[start..].iter().collect();
        let rest = rest.trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
    }
    sentences
}

fn split_by_words(text: &str, chunk_size: usize, out: &mut Vec<String>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut buf = String::new();
    for word in words {
        if word.chars().count() > chunk_size {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
            }
            split_hard(word, chunk_size, out);
            continue;
        }
        let extra = if buf.is_empty() { 0 } else { 1 };
        if buf.chars().count() + extra + word.chars().count() > chunk_size {
            out.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(word);
    }
    if !buf.is_empty() {
        out.push(buf);
    }
}

fn split_hard(text: &str, chunk_size: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        let end = std::cmp::min(start + chunk_size, chars.len());
        out.push(chars[start..end].iter().collect());
        start = end;
    }
}

/// Prefixes each passage (after the first) with the trailing `overlap`
/// characters of its predecessor, re-trimming to `chunk_size`.
fn apply_overlap(passages: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if overlap == 0 || passages.len() < 2 {
        return passages;
    }

    let mut result = Vec::with_capacity(passages.len());
    let mut prev: Option<String> = None;
    for passage in passages {
        match &prev {
            None => result.push(passage.clone()),
            Some(prev_text) => {
                let prev_chars: Vec<char> = prev_text.chars().collect();
                let tail_len = overlap.min(prev_chars.len());
                let tail: String = prev_chars[prev_chars.len() - tail_len..].iter().collect();

                // Trim the new passage's own tail to make room, never the
                // prepended overlap, or the overlap would be silently lost.
                let max_passage_len = chunk_size - tail_len;
                let passage_chars: Vec<char> = passage.chars().collect();
                let bounded_passage: String = if passage_chars.len() > max_passage_len {
                    passage_chars[..max_passage_len].iter().collect()
                } else {
                    passage.clone()
                };

                result.push(format!("{tail}{bounded_passage}"));
            }
        }
        prev = Some(passage);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_bounds() {
        assert!(chunk("hello", 10, 10).is_err());
        assert!(chunk("hello", 0, 0).is_err());
    }

    #[test]
    fn rejects_empty_text() {
        assert_eq!(chunk("   \n\n  ", 10, 2), Err(ChunkError::EmptyContent));
    }

    #[test]
    fn every_passage_within_bounds() {
        let text = "a ".repeat(2400);
        let passages = chunk(&text, 1000, 200).unwrap();
        assert!(!passages.is_empty());
        for p in &passages {
            let len = p.chars().count();
            assert!(len >= 1 && len <= 1000, "passage length {len} out of bounds");
        }
    }

    #[test]
    fn short_text_is_single_passage() {
        let passages = chunk("The quick brown fox.", 1000, 200).unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0], "The quick brown fox.");
    }

    #[test]
    fn paragraphs_preserved_when_short() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let passages = chunk(text, 1000, 200).unwrap();
        assert_eq!(passages, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn long_paragraph_is_split_and_overlaps() {
        let text = "word ".repeat(600); // 3000 chars, one paragraph
        let passages = chunk(text.trim(), 1000, 200).unwrap();
        assert!(passages.len() > 1);
        for w in passages.windows(2) {
            let prev_tail: String = w[0].chars().rev().take(50).collect::<String>();
            let prev_tail: String = prev_tail.chars().rev().collect();
            assert!(
                w[1].contains(prev_tail.trim()) || w[1].starts_with(prev_tail.trim()),
                "expected overlap between consecutive passages"
            );
        }
    }

    #[test]
    fn output_is_finite_and_ordered() {
        let text = "Sentence one. Sentence two. Sentence three.\n\nAnother paragraph here.";
        let passages = chunk(text, 30, 5).unwrap();
        assert!(!passages.is_empty());
        assert!(passages.len() < 1000);
    }
}
