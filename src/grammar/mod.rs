pub mod languagetool;
pub mod rules;

use crate::error::Result;
use crate::session::Capability;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub use languagetool::LanguageToolClient;

/// Rule category reported by the grammar checker.
///
/// Unknown ids are kept verbatim in `Other` so nothing the checker reports is
/// lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Typos,
    Grammar,
    Punctuation,
    Style,
    ConfusedWords,
    Redundancy,
    GenderNeutrality,
    Colloquialisms,
    Regionalisms,
    Casing,
    Compounding,
    Other(String),
}

impl Category {
    pub fn from_id(id: &str) -> Self {
        match id {
            "TYPOS" => Category::Typos,
            "GRAMMAR" => Category::Grammar,
            "PUNCTUATION" => Category::Punctuation,
            "STYLE" => Category::Style,
            "CONFUSED_WORDS" => Category::ConfusedWords,
            "REDUNDANCY" => Category::Redundancy,
            "GENDER_NEUTRALITY" => Category::GenderNeutrality,
            "COLLOQUIALISMS" => Category::Colloquialisms,
            "REGIONALISMS" => Category::Regionalisms,
            "CASING" => Category::Casing,
            "COMPOUNDING" => Category::Compounding,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Category::Typos => "TYPOS",
            Category::Grammar => "GRAMMAR",
            Category::Punctuation => "PUNCTUATION",
            Category::Style => "STYLE",
            Category::ConfusedWords => "CONFUSED_WORDS",
            Category::Redundancy => "REDUNDANCY",
            Category::GenderNeutrality => "GENDER_NEUTRALITY",
            Category::Colloquialisms => "COLLOQUIALISMS",
            Category::Regionalisms => "REGIONALISMS",
            Category::Casing => "CASING",
            Category::Compounding => "COMPOUNDING",
            Category::Other(id) => id,
        }
    }

    /// Name shown to learners.
    pub fn german_name(&self) -> &str {
        match self {
            Category::Typos => "Rechtschreibfehler",
            Category::Grammar => "Grammatikfehler",
            Category::Punctuation => "Zeichensetzung",
            Category::Style => "Stil und Ausdruck",
            Category::ConfusedWords => "Verwechselte Wörter",
            Category::Redundancy => "Redundanz",
            Category::GenderNeutrality => "Geschlechtergerechte Sprache",
            Category::Colloquialisms => "Umgangssprache",
            Category::Regionalisms => "Regionalismen",
            Category::Casing => "Groß- und Kleinschreibung",
            Category::Compounding => "Getrennt- und Zusammenschreibung",
            Category::Other(id) => id,
        }
    }

    pub fn known() -> &'static [Category] {
        &[
            Category::Typos,
            Category::Grammar,
            Category::Punctuation,
            Category::Style,
            Category::ConfusedWords,
            Category::Redundancy,
            Category::GenderNeutrality,
            Category::Colloquialisms,
            Category::Regionalisms,
            Category::Casing,
            Category::Compounding,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// A region of the checked text flagged by a grammar rule.
///
/// `offset` and `length` count characters of the original text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub rule_id: String,
    pub category: Category,
    pub message: String,
    pub short_message: String,
    pub suggestions: Vec<String>,
    pub context: String,
    pub rule_description: Option<String>,
}

impl Span {
    pub fn new(offset: usize, length: usize, category: Category, suggestions: &[&str]) -> Self {
        Self {
            offset,
            length,
            rule_id: category.id().to_string(),
            category,
            message: String::new(),
            short_message: String::new(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            context: String::new(),
            rule_description: None,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The covered text, or an empty string when the span is out of bounds.
    pub fn error_text(&self, text: &str) -> String {
        text.chars().skip(self.offset).take(self.length).collect()
    }
}

/// Result of one check call.
#[derive(Debug, Clone, Serialize)]
pub struct GrammarAnalysis {
    pub text: String,
    pub spans: Vec<Span>,
    pub total_errors: usize,
    pub categories_found: BTreeMap<String, usize>,
    pub suggestions_count: usize,
    pub corrected_text: String,
}

impl GrammarAnalysis {
    pub fn new(text: &str, spans: Vec<Span>, corrected_text: String) -> Self {
        let mut categories_found = BTreeMap::new();
        for span in &spans {
            *categories_found
                .entry(span.category.id().to_string())
                .or_insert(0) += 1;
        }
        Self {
            text: text.to_string(),
            total_errors: spans.len(),
            suggestions_count: spans.iter().map(|s| s.suggestions.len()).sum(),
            categories_found,
            spans,
            corrected_text,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Categories in first-seen order.
    pub fn categories_in_order(&self) -> Vec<Category> {
        let mut seen: Vec<Category> = Vec::new();
        for span in &self.spans {
            if !seen.contains(&span.category) {
                seen.push(span.category.clone());
            }
        }
        seen
    }

    pub fn count(&self, category: &Category) -> usize {
        self.categories_found
            .get(category.id())
            .copied()
            .unwrap_or(0)
    }
}

/// Text in, flagged spans out.
pub trait GrammarChecker: Capability {
    fn check(&self, text: &str) -> Result<Vec<Span>>;

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name(), "state": self.state() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_ids() {
        for category in Category::known() {
            assert_eq!(&Category::from_id(category.id()), category);
        }
        assert_eq!(
            Category::from_id("CASE"),
            Category::Other("CASE".to_string())
        );
        assert_eq!(Category::from_id("CASE").german_name(), "CASE");
    }

    #[test]
    fn test_error_text_counts_characters() {
        let span = Span::new(4, 5, Category::Typos, &[]);
        assert_eq!(span.error_text("Die Größe ist gut"), "Größe");
    }

    #[test]
    fn test_analysis_counts() {
        let spans = vec![
            Span::new(0, 1, Category::Grammar, &["a", "b"]),
            Span::new(2, 1, Category::Typos, &["c"]),
            Span::new(4, 1, Category::Grammar, &[]),
        ];
        let analysis = GrammarAnalysis::new("a b c", spans, "a b c".to_string());
        assert_eq!(analysis.total_errors, 3);
        assert_eq!(analysis.suggestions_count, 3);
        assert_eq!(analysis.count(&Category::Grammar), 2);
        assert_eq!(
            analysis.categories_in_order(),
            vec![Category::Grammar, Category::Typos]
        );
    }
}
