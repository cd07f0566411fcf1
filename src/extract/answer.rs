//! Answer extraction from generated text
//!
//! Heuristic marker parsing over chain-of-thought output. Every miss is
//! data (`found == false`), never an error. `contains_answer_marker` is
//! the reasoning loop's termination signal and is independent of whether
//! extraction succeeds.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::sentence::split_sentences;

/// The marker that anchors extraction and the substring fallback
const PRIMARY_MARKER: &str = "so the answer is";

/// Marker-less text longer than this is not treated as a bare answer
const BARE_ANSWER_LIMIT: usize = 50;

/// Ordered marker patterns, most to least specific
const MARKER_PATTERNS: [&str; 4] = [
    r"(?i)so the answer is:?",
    r"(?i)the answer is:?",
    r"(?i)answer is:?",
    r"(?i)answer:",
];

/// How an answer was pulled out of the text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Matched one of the ordered marker patterns
    MarkerPattern,
    /// Raw substring search for the primary marker
    SubstringSearch,
    /// Short marker-less text, last non-trivial sentence taken
    LastSentence,
    /// Nothing usable found
    NotFound,
}

/// Extraction outcome; never an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    /// Cleaned answer text (empty when not found)
    pub answer: String,

    /// The input text, unchanged
    pub full_text: String,

    /// Whether any strategy produced an answer
    pub found: bool,

    /// Strategy that produced the answer
    pub method: ExtractionMethod,
}

impl ExtractedAnswer {
    fn not_found(full_text: &str) -> Self {
        Self {
            answer: String::new(),
            full_text: full_text.to_string(),
            found: false,
            method: ExtractionMethod::NotFound,
        }
    }

    fn found(answer: String, full_text: &str, method: ExtractionMethod) -> Self {
        Self {
            answer,
            full_text: full_text.to_string(),
            found: true,
            method,
        }
    }
}

/// Extract an answer from generated text
pub fn extract(text: &str) -> ExtractedAnswer {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ExtractedAnswer::not_found(text);
    }

    for (i, pattern) in MARKER_PATTERNS.iter().enumerate() {
        let re = Regex::new(pattern).unwrap();
        // Prefer the final restated answer for the primary marker
        let matched = if i == 0 {
            re.find_iter(text).last()
        } else {
            re.find(text)
        };
        if let Some(m) = matched {
            let answer = clean_answer(&text[m.end()..]);
            if !answer.is_empty() {
                return ExtractedAnswer::found(answer, text, ExtractionMethod::MarkerPattern);
            }
        }
    }

    // Raw substring fallback for the primary marker
    let lowered = text.to_lowercase();
    if let Some(pos) = lowered.rfind(PRIMARY_MARKER) {
        let answer = clean_answer(&text[pos + PRIMARY_MARKER.len()..]);
        if !answer.is_empty() {
            return ExtractedAnswer::found(answer, text, ExtractionMethod::SubstringSearch);
        }
    }

    // Short marker-less text is often the bare answer itself
    if trimmed.len() < BARE_ANSWER_LIMIT {
        if let Some(last) = split_sentences(trimmed)
            .into_iter()
            .rev()
            .find(|s| is_non_trivial(s))
        {
            let answer = clean_answer(&last);
            if !answer.is_empty() {
                return ExtractedAnswer::found(answer, text, ExtractionMethod::LastSentence);
            }
        }
    }

    ExtractedAnswer::not_found(text)
}

/// Termination signal for the reasoning loop
pub fn contains_answer_marker(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("so the answer is")
        || lowered.contains("the answer is")
        || lowered.contains("therefore")
}

fn is_non_trivial(sentence: &str) -> bool {
    sentence.chars().filter(|c| c.is_alphanumeric()).count() >= 2
}

/// Clean a raw capture into an answer string
///
/// Strips markdown emphasis, keeps only the first line, truncates at the
/// first sentence boundary, and trims stray punctuation.
fn clean_answer(capture: &str) -> String {
    let stripped: String = capture
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect();

    let first_line = stripped.lines().next().unwrap_or("").trim();
    let mut answer = first_line.trim_start_matches(':').trim().to_string();

    if let Some(pos) = answer.find(['.', '!', '?']) {
        answer.truncate(pos);
    }

    answer
        .trim()
        .trim_end_matches([',', ';', ':'])
        .trim()
        .to_string()
}
