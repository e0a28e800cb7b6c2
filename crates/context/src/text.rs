//! Small text helpers shared by the analyzer, planner, filter and executor.

/// Lowercased words longer than `min_len` characters, with surrounding punctuation
/// stripped and duplicates removed (first occurrence order).
pub(crate) fn significant_words(text: &str, min_len: usize) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for raw in text.split_whitespace() {
        let word = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() > min_len && !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

/// First `max_chars` characters of `text`
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Split text into sentences on `.`, `!` and `?`, keeping the delimiter
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let delimiters = ['.', '?', '!'];
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if delimiters.contains(&ch) {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }

    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }

    sentences
}

/// Lowercased words of `text` joined by `sep`, e.g. `"Rust Ownership"` → `"rust-ownership"`
pub(crate) fn slug(text: &str, sep: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}
