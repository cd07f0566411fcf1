//! Demonstration loading
//!
//! Fixed worked examples shown in every prompt to steer output format.
//! Parsed once at process start from a static text resource, then shared
//! read-only across questions and threads.
//!
//! Resource format, one demonstration per block, blocks separated by a
//! `---` line:
//!
//! ```text
//! Wikipedia Title: <title>
//! <paragraph text>
//!
//! Q: <question>
//! A: <canonical reasoning ending in "So the answer is: ...">
//! ---
//! ```

use crate::errors::{IrcotError, Result};
use serde::{Deserialize, Serialize};

/// Built-in demonstration resource
const DEFAULT_DEMOS: &str = include_str!("default_demos.txt");

/// A demonstration's context paragraph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoParagraph {
    /// Source document title
    pub title: String,

    /// Paragraph text
    pub text: String,
}

/// One fixed worked example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotDemo {
    /// The demonstration's own context paragraphs
    pub paragraphs: Vec<DemoParagraph>,

    /// The demonstration question
    pub question: String,

    /// Canonical reasoning and answer shown after "A:"
    pub answer: String,
}

/// Ordered, immutable demonstration collection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoSet {
    demos: Vec<CotDemo>,
}

impl DemoSet {
    /// Parse a demonstration resource
    pub fn parse(text: &str) -> Result<Self> {
        let mut demos = Vec::new();
        let mut block: Vec<&str> = Vec::new();

        for line in text.lines().chain(std::iter::once("---")) {
            if line.trim() == "---" {
                if block.iter().any(|l| !l.trim().is_empty()) {
                    demos.push(Self::parse_block(&block, demos.len())?);
                }
                block.clear();
            } else {
                block.push(line);
            }
        }

        if demos.is_empty() {
            return Err(IrcotError::DemoFormat {
                message: "resource contains no demonstrations".to_string(),
            });
        }

        Ok(Self { demos })
    }

    fn parse_block(lines: &[&str], position: usize) -> Result<CotDemo> {
        let mut paragraphs = Vec::new();
        let mut current: Option<DemoParagraph> = None;
        let mut question: Option<String> = None;
        let mut answer: Option<String> = None;

        for line in lines {
            let line = line.trim_end();
            if let Some(title) = line.strip_prefix("Wikipedia Title:") {
                if let Some(paragraph) = current.take() {
                    paragraphs.push(paragraph);
                }
                current = Some(DemoParagraph {
                    title: title.trim().to_string(),
                    text: String::new(),
                });
            } else if let Some(q) = line.strip_prefix("Q:") {
                if let Some(paragraph) = current.take() {
                    paragraphs.push(paragraph);
                }
                question = Some(q.trim().to_string());
            } else if let Some(a) = line.strip_prefix("A:") {
                answer = Some(a.trim().to_string());
            } else if let Some(answer) = answer.as_mut() {
                // Multi-line answers continue until the block ends
                if !line.trim().is_empty() {
                    answer.push(' ');
                    answer.push_str(line.trim());
                }
            } else if let Some(paragraph) = current.as_mut() {
                if !line.trim().is_empty() {
                    if !paragraph.text.is_empty() {
                        paragraph.text.push(' ');
                    }
                    paragraph.text.push_str(line.trim());
                }
            } else if !line.trim().is_empty() {
                return Err(IrcotError::DemoFormat {
                    message: format!(
                        "demonstration {}: unexpected line {:?}",
                        position + 1,
                        line
                    ),
                });
            }
        }

        if let Some(paragraph) = current.take() {
            paragraphs.push(paragraph);
        }

        let question = question.ok_or_else(|| IrcotError::DemoFormat {
            message: format!("demonstration {} is missing a Q: line", position + 1),
        })?;
        let answer = answer.ok_or_else(|| IrcotError::DemoFormat {
            message: format!("demonstration {} is missing an A: line", position + 1),
        })?;
        if paragraphs.is_empty() {
            return Err(IrcotError::DemoFormat {
                message: format!("demonstration {} has no paragraphs", position + 1),
            });
        }

        Ok(CotDemo {
            paragraphs,
            question,
            answer,
        })
    }

    /// Demonstrations bundled with the crate
    pub fn builtin() -> Self {
        Self::parse(DEFAULT_DEMOS).expect("built-in demonstration resource is well-formed")
    }

    /// Load a resource from disk
    pub fn from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Demonstrations in resource order
    pub fn demos(&self) -> &[CotDemo] {
        &self.demos
    }

    /// Number of demonstrations
    pub fn len(&self) -> usize {
        self.demos.len()
    }

    /// True when the set holds no demonstrations
    pub fn is_empty(&self) -> bool {
        self.demos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resource_parses() {
        let demos = DemoSet::builtin();
        assert!(demos.len() >= 3);
        for demo in demos.demos() {
            assert!(!demo.paragraphs.is_empty());
            assert!(demo.question.ends_with('?'));
            assert!(demo.answer.to_lowercase().contains("so the answer is"));
        }
    }

    #[test]
    fn test_parse_single_demo() {
        let resource = "\
Wikipedia Title: Topic
Some paragraph text.

Q: What is asked?
A: Some reasoning. So the answer is: something.
";
        let demos = DemoSet::parse(resource).unwrap();
        assert_eq!(demos.len(), 1);
        let demo = &demos.demos()[0];
        assert_eq!(demo.paragraphs[0].title, "Topic");
        assert_eq!(demo.paragraphs[0].text, "Some paragraph text.");
        assert_eq!(demo.question, "What is asked?");
    }

    #[test]
    fn test_parse_multiline_paragraph() {
        let resource = "\
Wikipedia Title: Topic
First line of text
second line of text.

Q: Question?
A: So the answer is: x.
";
        let demos = DemoSet::parse(resource).unwrap();
        assert_eq!(
            demos.demos()[0].paragraphs[0].text,
            "First line of text second line of text."
        );
    }

    #[test]
    fn test_missing_question_fails() {
        let resource = "\
Wikipedia Title: Topic
Text.

A: Answer without a question.
";
        let err = DemoSet::parse(resource).unwrap_err();
        assert!(err.to_string().contains("missing a Q:"));
    }

    #[test]
    fn test_empty_resource_fails() {
        assert!(DemoSet::parse("").is_err());
        assert!(DemoSet::parse("---\n---\n").is_err());
    }
}
