//! Evidence sentence extraction

use crate::text::{split_sentences, truncate_chars};

/// First sentence of `snippet` containing at least half of `keywords`,
/// otherwise the first `fallback_chars` characters of the snippet
pub fn extract_evidence(snippet: &str, keywords: &[String], fallback_chars: usize) -> String {
    if !keywords.is_empty() {
        for sentence in split_sentences(snippet) {
            let lower = sentence.to_lowercase();
            let hits = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
            if hits * 2 >= keywords.len() {
                return sentence;
            }
        }
    }

    truncate_chars(snippet.trim(), fallback_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_picks_first_covering_sentence() {
        let snippet = "Rust was started at Mozilla. The borrow checker enforces ownership rules! It is fast.";
        let evidence = extract_evidence(snippet, &words(&["borrow", "ownership", "lifetimes"]), 200);
        assert_eq!(evidence, "The borrow checker enforces ownership rules!");
    }

    #[test]
    fn test_falls_back_to_prefix() {
        let snippet = "a".repeat(300);
        assert_eq!(extract_evidence(&snippet, &words(&["tokio"]), 200).len(), 200);
        assert_eq!(extract_evidence("  short text ", &[], 200), "short text");
    }
}
