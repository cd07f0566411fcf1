//! Sentence splitting and next-sentence selection
//!
//! Generation at each step may echo prompt context or emit several
//! sentences at once; the loop only ever consumes one genuinely new
//! sentence per step.

use tracing::debug;

/// Sentence terminators
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Words compared when checking for a restated opening
const PREFIX_WORDS: usize = 5;

/// Split text into sentences on ./!/? boundaries
///
/// A trailing run without a terminator is kept as a final sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if TERMINATORS.contains(&ch) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    // Add remaining text
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Select the next chain-of-thought sentence from raw model output
///
/// Returns the first sentence, unless it restates what the model was
/// already shown (a common artifact of continuation prompting); then the
/// second sentence is used instead, or nothing if there is none.
pub fn next_sentence(raw_output: &str, previous_cot: &str) -> String {
    let sentences = split_sentences(raw_output);
    let Some(first) = sentences.first() else {
        return String::new();
    };

    if previous_cot.trim().is_empty() {
        return first.clone();
    }

    if is_near_duplicate(first, previous_cot) {
        debug!(skipped = %first, "First sentence restates prior reasoning, taking the next");
        return sentences.get(1).cloned().unwrap_or_default();
    }

    first.clone()
}

/// Check whether a candidate sentence restates earlier reasoning
///
/// A near-duplicate is substring containment in either direction after
/// normalization, or an identical opening run of words. This can discard
/// genuinely new text that happens to share an opening with the chain.
fn is_near_duplicate(candidate: &str, previous: &str) -> bool {
    let candidate = normalize(candidate);
    let previous = normalize(previous);
    if candidate.is_empty() || previous.is_empty() {
        return false;
    }

    if previous.contains(&candidate) || candidate.contains(&previous) {
        return true;
    }

    let candidate_prefix: Vec<&str> = candidate.split_whitespace().take(PREFIX_WORDS).collect();
    let previous_prefix: Vec<&str> = previous.split_whitespace().take(PREFIX_WORDS).collect();
    candidate_prefix.len() == PREFIX_WORDS && candidate_prefix == previous_prefix
}

/// Lowercase and strip markdown emphasis for comparison
fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '#'))
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_terminators() {
        let sentences = split_sentences("First sentence. Second sentence! Third sentence?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "First sentence.");
        assert_eq!(sentences[2], "Third sentence?");
    }

    #[test]
    fn test_split_keeps_trailing_fragment() {
        let sentences = split_sentences("Complete one. trailing fragment");
        assert_eq!(sentences, vec!["Complete one.", "trailing fragment"]);
    }

    #[test]
    fn test_split_no_boundary_returns_whole_text() {
        let sentences = split_sentences("  no boundary at all  ");
        assert_eq!(sentences, vec!["no boundary at all"]);
    }

    #[test]
    fn test_first_sentence_with_empty_cot() {
        assert_eq!(next_sentence("X. Y. Z.", ""), "X.");
    }

    #[test]
    fn test_duplicate_first_sentence_skipped() {
        assert_eq!(next_sentence("X. Y. Z.", "X."), "Y.");
    }

    #[test]
    fn test_duplicate_with_markdown_noise() {
        assert_eq!(next_sentence("**X**. Y.", "X."), "Y.");
    }

    #[test]
    fn test_shared_prefix_counts_as_duplicate() {
        let cot = "The bridge was built in 1932 by the county.";
        let raw = "The bridge was built in a later decade. It spans the river.";
        assert_eq!(next_sentence(raw, cot), "It spans the river.");
    }

    #[test]
    fn test_duplicate_without_second_sentence() {
        assert_eq!(next_sentence("X.", "X."), "");
    }

    #[test]
    fn test_new_sentence_passes_through() {
        let cot = "Entity A works at Organization B.";
        let raw = "So the answer is: Organization B.";
        assert_eq!(next_sentence(raw, cot), "So the answer is: Organization B.");
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(next_sentence("", "anything."), "");
        assert_eq!(next_sentence("   ", ""), "");
    }
}
