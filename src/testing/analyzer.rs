//! Minimal text analysis for the in-memory backend: unicode word segmentation,
//! lowercasing and edit-distance matching

use unicode_segmentation::UnicodeSegmentation;

/// Lowercased words of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// Byte offset and text of every word in `text`
pub fn word_spans(text: &str) -> Vec<(usize, &str)> {
    text.unicode_word_indices().collect()
}

/// Edit distance allowed for a term under `"fuzziness": "AUTO"`
pub fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Whether an indexed token matches a query token
pub fn term_matches(query_term: &str, indexed: &str, auto_fuzzy: bool) -> bool {
    if query_term == indexed {
        return true;
    }
    if !auto_fuzzy {
        return false;
    }
    let max = auto_fuzziness(query_term);
    max > 0 && levenshtein_distance(query_term, indexed) <= max
}

/// Calculate Levenshtein edit distance between two strings
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut curr_row = vec![0; s2_chars.len() + 1];
    for (i, a) in s1_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b) in s2_chars.iter().enumerate() {
            let cost = usize::from(a != b);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[s2_chars.len()]
}
