//! Text segmentation for synthesis.
//!
//! Splits article text into sentence-like spans at terminal punctuation,
//! re-splits overlong spans into fixed word windows, and wraps each chunk in
//! the padding phrase the models need around real content.

use crate::defaults::{MAX_CHUNK_WORDS, PADDING_WORD};
use regex::Regex;
use std::sync::LazyLock;

/// Inclusive split: spans end with their terminal punctuation; a trailing
/// unterminated remainder becomes its own span.
static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^.!:();?]*[.!:();?]|[^.!:();?]+$").expect("sentence pattern is valid")
});

/// Split text into sentence-like spans at `. ! : ( ) ; ?`.
///
/// Whitespace-only spans are dropped; punctuation stays attached to the span
/// it terminates.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Greedily split a span into windows of at most `max_words` words.
///
/// The last window may be shorter; word order is preserved.
pub fn split_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|window| window.join(" "))
        .collect()
}

/// Segment text into synthesis chunks of at most [`MAX_CHUNK_WORDS`] words,
/// preserving sentence and word order.
pub fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    for sentence in split_sentences(text) {
        let word_count = sentence.split_whitespace().count();
        if word_count > MAX_CHUNK_WORDS {
            chunks.extend(split_words(&sentence, MAX_CHUNK_WORDS));
        } else {
            chunks.push(sentence);
        }
    }
    chunks
}

/// Wrap a chunk in the padding utterance.
///
/// The models garble unbuffered leading and trailing audio; the marker word
/// absorbs that damage and is trimmed off after synthesis.
pub fn pad_chunk(chunk: &str) -> String {
    format!("{PADDING_WORD}. {chunk}. {PADDING_WORD}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let spans = split_sentences("First sentence. Second one! Third?");
        assert_eq!(spans, vec!["First sentence.", "Second one!", "Third?"]);
    }

    #[test]
    fn splits_on_colons_semicolons_and_parens() {
        let spans = split_sentences("a: b; c (d) e.");
        assert_eq!(spans, vec!["a:", "b;", "c (", "d)", "e."]);
    }

    #[test]
    fn unterminated_remainder_is_its_own_span() {
        let spans = split_sentences("Done here. trailing words without a stop");
        assert_eq!(
            spans,
            vec!["Done here.", "trailing words without a stop"]
        );
    }

    #[test]
    fn empty_text_yields_no_spans() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn split_words_windows_of_fixed_size() {
        let text = (1..=60).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let windows = split_words(&text, 25);
        assert_eq!(windows.len(), 3);
        assert_eq!(word_count(&windows[0]), 25);
        assert_eq!(word_count(&windows[1]), 25);
        assert_eq!(word_count(&windows[2]), 10);
        assert!(windows[0].starts_with("w1 "));
        assert!(windows[2].ends_with(" w60"));
    }

    #[test]
    fn chunk_text_respects_word_budget() {
        let long_sentence = (1..=70).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let text = format!("Short one. {long_sentence}.");
        let chunks = chunk_text(&text);
        assert!(chunks.iter().all(|c| word_count(c) <= 25), "{chunks:?}");
        assert!(chunks.len() >= 4);
    }

    #[test]
    fn chunking_preserves_word_count_and_order() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    It was the best of times; it was the worst of times. \
                    And then everything changed";
        let chunks = chunk_text(text);

        let total: usize = chunks.iter().map(|c| word_count(c)).sum();
        assert_eq!(total, word_count(text));

        // Word order survives re-joining.
        let rejoined = chunks.join(" ");
        let original_words: Vec<&str> = text.split_whitespace().collect();
        let rejoined_words: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(original_words, rejoined_words);
    }

    #[test]
    fn pad_chunk_wraps_with_markers() {
        let padded = pad_chunk("hello world");
        assert_eq!(padded, "prima. hello world. prima.");
        assert!(padded.starts_with("prima. "));
        assert!(padded.ends_with(". prima."));
    }
}
