use crate::error::Result;
use crate::generator::{Difficulty, GenerationRequest, GenerationResult, TextGenerator};
use crate::grammar::{rules, Category, Span};
use serde::Serialize;
use std::fmt;

/// How many critical spans get a generated explanation.
pub const EXPLAINED_CRITICAL_SPANS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Critical,
    Style,
    Other,
}

impl Bucket {
    /// Unknown categories land in `Other`.
    pub fn of(category: &Category) -> Self {
        match category {
            Category::Typos | Category::Grammar => Bucket::Critical,
            Category::Style | Category::Redundancy => Bucket::Style,
            Category::Punctuation
            | Category::ConfusedWords
            | Category::GenderNeutrality
            | Category::Colloquialisms
            | Category::Regionalisms
            | Category::Casing
            | Category::Compounding
            | Category::Other(_) => Bucket::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn of(category: &Category) -> Self {
        match category {
            Category::Typos | Category::Grammar => Severity::High,
            Category::Style | Category::Redundancy => Severity::Low,
            Category::Punctuation
            | Category::ConfusedWords
            | Category::GenderNeutrality
            | Category::Colloquialisms
            | Category::Regionalisms
            | Category::Casing
            | Category::Compounding
            | Category::Other(_) => Severity::Medium,
        }
    }
}

/// Overall grade of a text, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
}

impl Quality {
    pub fn from_issue_count(count: usize) -> Self {
        match count {
            0 => Quality::Excellent,
            1..=2 => Quality::Good,
            3..=5 => Quality::Satisfactory,
            _ => Quality::NeedsImprovement,
        }
    }

    pub fn german_label(self) -> &'static str {
        match self {
            Quality::Excellent => "Exzellent",
            Quality::Good => "Gut",
            Quality::Satisfactory => "Befriedigend",
            Quality::NeedsImprovement => "Verbesserungsbedürftig",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Excellent => write!(f, "excellent"),
            Quality::Good => write!(f, "good"),
            Quality::Satisfactory => write!(f, "satisfactory"),
            Quality::NeedsImprovement => write!(f, "needs-improvement"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackItem {
    pub span: Span,
    pub error_text: String,
    pub bucket: Bucket,
    pub severity: Severity,
    pub category_german: String,
    pub explanation: String,
    pub generated_explanation: Option<GenerationResult>,
}

impl FeedbackItem {
    fn new(text: &str, span: &Span) -> Self {
        Self {
            error_text: span.error_text(text),
            bucket: Bucket::of(&span.category),
            severity: Severity::of(&span.category),
            category_german: span.category.german_name().to_string(),
            explanation: rules::educational_explanation(&span.rule_id).to_string(),
            generated_explanation: None,
            span: span.clone(),
        }
    }

    fn explanation_request(&self, difficulty: Difficulty) -> GenerationRequest {
        let mut context = format!("Fehler: {}", self.error_text);
        if !self.span.context.is_empty() {
            context.push_str(&format!(" (im Satz: {})", self.span.context));
        }
        GenerationRequest::explanation(&self.category_german, difficulty, Some(context))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub critical: usize,
    pub style: usize,
    pub other: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.critical + self.style + self.other
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningFeedback {
    pub counts: BucketCounts,
    pub critical: Vec<FeedbackItem>,
    pub style: Vec<FeedbackItem>,
    pub other: Vec<FeedbackItem>,
    pub quality: Quality,
    pub improvement_suggestions: Vec<String>,
}

impl LearningFeedback {
    pub fn total_issues(&self) -> usize {
        self.counts.total()
    }

    /// Items in bucket order: critical, style, other.
    pub fn items(&self) -> impl Iterator<Item = &FeedbackItem> {
        self.critical
            .iter()
            .chain(self.style.iter())
            .chain(self.other.iter())
    }

    pub fn generated_explanations(&self) -> impl Iterator<Item = &GenerationResult> {
        self.critical
            .iter()
            .filter_map(|item| item.generated_explanation.as_ref())
    }
}

/// Partition `spans` into buckets and, when a generator is available, ask it
/// to explain the first few critical spans. A generator that fails to answer
/// leaves a failed result on the span; only hard errors are returned.
pub fn build(
    text: &str,
    spans: &[Span],
    generator: Option<&dyn TextGenerator>,
    difficulty: Difficulty,
) -> Result<LearningFeedback> {
    let mut critical = Vec::new();
    let mut style = Vec::new();
    let mut other = Vec::new();

    for span in spans {
        let item = FeedbackItem::new(text, span);
        match item.bucket {
            Bucket::Critical => critical.push(item),
            Bucket::Style => style.push(item),
            Bucket::Other => other.push(item),
        }
    }

    match generator {
        Some(generator) => {
            for item in critical.iter_mut().take(EXPLAINED_CRITICAL_SPANS) {
                let request = item.explanation_request(difficulty);
                item.generated_explanation = Some(generator.generate(&request)?);
            }
        }
        None => tracing::debug!("no text generator configured, skipping explanations"),
    }

    let counts = BucketCounts {
        critical: critical.len(),
        style: style.len(),
        other: other.len(),
    };

    Ok(LearningFeedback {
        quality: Quality::from_issue_count(counts.total()),
        improvement_suggestions: improvement_suggestions(spans),
        counts,
        critical,
        style,
        other,
    })
}

fn improvement_suggestions(spans: &[Span]) -> Vec<String> {
    let count = |category: Category| spans.iter().filter(|s| s.category == category).count();

    let mut suggestions = Vec::new();
    if count(Category::Typos) > 2 {
        suggestions.push("Überprüfen Sie die Rechtschreibung sorgfältiger.".to_string());
    }
    if count(Category::Grammar) > 1 {
        suggestions.push("Achten Sie auf Grammatikregeln, besonders Kasuskongruenz.".to_string());
    }
    if count(Category::Punctuation) > 1 {
        suggestions.push(
            "Überprüfen Sie die Kommasetzung in zusammengesetzten Sätzen.".to_string(),
        );
    }
    if suggestions.is_empty() {
        suggestions.push("Gute Arbeit! Der Text ist grammatikalisch korrekt.".to_string());
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::generator::{GenerationOutcome, TaskType};
    use crate::session::{Capability, SessionState};
    use std::cell::RefCell;

    struct ScriptedGenerator {
        fail: bool,
        requests: RefCell<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Capability for ScriptedGenerator {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) {}
        fn state(&self) -> SessionState {
            SessionState::Ready
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
            self.requests.borrow_mut().push(request.clone());
            if self.fail {
                Ok(GenerationResult::failed(request, "offline"))
            } else {
                Ok(GenerationResult::generated(
                    request,
                    format!("Erklärung {}", self.requests.borrow().len()),
                ))
            }
        }
    }

    struct NotReadyGenerator;

    impl Capability for NotReadyGenerator {
        fn name(&self) -> &'static str {
            "not ready"
        }
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) {}
        fn state(&self) -> SessionState {
            SessionState::Uninitialized
        }
    }

    impl TextGenerator for NotReadyGenerator {
        fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResult> {
            Err(Error::NotReady {
                capability: "not ready",
            })
        }
    }

    const TEXT: &str = "aaaa bbbb cccc dddd eeee ffff";

    fn spans(categories: &[&str]) -> Vec<Span> {
        categories
            .iter()
            .enumerate()
            .map(|(i, id)| Span::new(i * 5, 4, Category::from_id(id), &["x"]))
            .collect()
    }

    #[test]
    fn test_every_category_lands_in_one_bucket() {
        let mut ids: Vec<&str> = Category::known().iter().map(|c| c.id()).collect();
        ids.extend(["CASE", "", "MISC", "typos"]);
        let spans: Vec<Span> = ids
            .iter()
            .map(|id| Span::new(0, 0, Category::from_id(id), &[]))
            .collect();

        let feedback = build("", &spans, None, Difficulty::Intermediate).unwrap();
        assert_eq!(feedback.counts.total(), spans.len());
        assert_eq!(feedback.counts.critical, 2);
        assert_eq!(feedback.counts.style, 2);
        assert_eq!(feedback.counts.other, spans.len() - 4);
    }

    #[test]
    fn test_buckets_keep_input_order() {
        let feedback = build(
            TEXT,
            &spans(&["GRAMMAR", "STYLE", "TYPOS", "CASE"]),
            None,
            Difficulty::Intermediate,
        )
        .unwrap();
        let offsets: Vec<usize> = feedback.critical.iter().map(|i| i.span.offset).collect();
        assert_eq!(offsets, vec![0, 10]);
        assert_eq!(feedback.style[0].severity, Severity::Low);
        assert_eq!(feedback.other[0].severity, Severity::Medium);
        assert_eq!(feedback.critical[1].error_text, "cccc");
    }

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(Quality::from_issue_count(0), Quality::Excellent);
        assert_eq!(Quality::from_issue_count(1), Quality::Good);
        assert_eq!(Quality::from_issue_count(2), Quality::Good);
        assert_eq!(Quality::from_issue_count(3), Quality::Satisfactory);
        assert_eq!(Quality::from_issue_count(5), Quality::Satisfactory);
        assert_eq!(Quality::from_issue_count(6), Quality::NeedsImprovement);
    }

    #[test]
    fn test_quality_is_monotone() {
        for low in 0..20 {
            for high in low + 1..20 {
                assert!(
                    Quality::from_issue_count(low) <= Quality::from_issue_count(high)
                );
            }
        }
    }

    #[test]
    fn test_no_spans() {
        let feedback = build("Alles gut.", &[], None, Difficulty::Intermediate).unwrap();
        assert_eq!(feedback.counts, BucketCounts::default());
        assert_eq!(feedback.quality, Quality::Excellent);
        assert_eq!(
            feedback.improvement_suggestions,
            vec!["Gute Arbeit! Der Text ist grammatikalisch korrekt."]
        );
    }

    #[test]
    fn test_without_generator_explanations_are_absent() {
        let feedback = build(
            TEXT,
            &spans(&["GRAMMAR", "TYPOS"]),
            None,
            Difficulty::Beginner,
        )
        .unwrap();
        assert_eq!(feedback.counts.critical, 2);
        assert!(feedback.generated_explanations().next().is_none());
    }

    #[test]
    fn test_only_first_three_critical_spans_are_explained() {
        let generator = ScriptedGenerator::new(false);
        let feedback = build(
            TEXT,
            &spans(&["TYPOS", "STYLE", "GRAMMAR", "TYPOS", "GRAMMAR", "TYPOS"]),
            Some(&generator),
            Difficulty::Advanced,
        )
        .unwrap();

        let requests = generator.requests.borrow();
        assert_eq!(requests.len(), EXPLAINED_CRITICAL_SPANS);
        assert!(requests
            .iter()
            .all(|r| r.task_type == TaskType::Explanation));
        assert_eq!(requests[0].topic, "Rechtschreibfehler");
        assert_eq!(requests[1].topic, "Grammatikfehler");
        assert_eq!(requests[1].context.as_deref(), Some("Fehler: cccc"));

        let texts: Vec<Option<&str>> = feedback
            .critical
            .iter()
            .map(|i| i.generated_explanation.as_ref().and_then(|g| g.text()))
            .collect();
        assert_eq!(
            texts,
            vec![
                Some("Erklärung 1"),
                Some("Erklärung 2"),
                Some("Erklärung 3"),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_failed_generation_is_absorbed() {
        let generator = ScriptedGenerator::new(true);
        let feedback = build(
            TEXT,
            &spans(&["GRAMMAR"]),
            Some(&generator),
            Difficulty::Intermediate,
        )
        .unwrap();
        let explanation = feedback.critical[0].generated_explanation.as_ref().unwrap();
        assert_eq!(
            explanation.outcome,
            GenerationOutcome::Failed {
                detail: "offline".to_string()
            }
        );
    }

    #[test]
    fn test_not_ready_generator_is_a_hard_error() {
        let err = build(
            TEXT,
            &spans(&["GRAMMAR"]),
            Some(&NotReadyGenerator),
            Difficulty::Intermediate,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }));
    }

    #[test]
    fn test_improvement_suggestions() {
        let suggestions = improvement_suggestions(&spans(&["TYPOS", "TYPOS", "TYPOS", "GRAMMAR"]));
        assert_eq!(
            suggestions,
            vec!["Überprüfen Sie die Rechtschreibung sorgfältiger."]
        );
    }
}
