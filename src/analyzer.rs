use crate::config::Config;
use crate::correction;
use crate::error::{Error, Result};
use crate::feedback::{self, LearningFeedback, Quality};
use crate::generator::{
    Difficulty, ExerciseKind, GenerationRequest, GenerationResult, OllamaClient, TextGenerator,
};
use crate::grammar::{Category, GrammarAnalysis, GrammarChecker, LanguageToolClient};
use crate::session::SessionState;
use serde::Serialize;

const CAPABILITY: &str = "German analyzer";

/// Minutes a learner is expected to spend per session topic.
pub const MINUTES_PER_TOPIC: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerSettings {
    pub preset: String,
    pub difficulty: Difficulty,
    pub provide_examples: bool,
    pub generate_exercises: bool,
}

impl From<&Config> for AnalyzerSettings {
    fn from(config: &Config) -> Self {
        Self {
            preset: config.preset.clone(),
            difficulty: config.difficulty,
            provide_examples: config.provide_examples,
            generate_exercises: config.generate_exercises,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickCheck {
    pub original_text: String,
    pub has_errors: bool,
    pub error_count: usize,
    pub corrected_text: String,
    pub main_issues: Vec<Category>,
    pub quick_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentenceError {
    #[serde(rename = "type")]
    pub category: Category,
    pub rule: String,
    pub message: String,
    pub error_text: String,
    pub suggestions: Vec<String>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentenceCheck {
    pub sentence: String,
    pub has_errors: bool,
    pub error_count: usize,
    pub errors: Vec<SentenceError>,
    pub corrected: String,
}

/// Which optional generation steps [`GermanAnalyzer::analyze`] runs. `None`
/// falls back to the analyzer settings.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub explanations: bool,
    pub examples: Option<bool>,
    pub exercises: Option<bool>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            explanations: true,
            examples: None,
            exercises: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryExercise {
    pub category: Category,
    pub exercise: GenerationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveAnalysis {
    pub original_text: String,
    pub grammar: GrammarAnalysis,
    pub feedback: LearningFeedback,
    pub llm_analysis: Option<GenerationResult>,
    pub examples: Vec<String>,
    pub exercises: Vec<CategoryExercise>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Success,
    Partial,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicExplanation {
    pub topic: String,
    pub difficulty: Difficulty,
    pub status: TopicStatus,
    pub explanation: Option<GenerationResult>,
    pub examples: Option<GenerationResult>,
    pub exercise: Option<GenerationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionNote {
    pub original: String,
    pub corrected: String,
    pub rule: String,
    pub explanation: String,
    pub llm_explanation: Option<GenerationResult>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionSummary {
    pub total_corrections: usize,
    pub main_categories: Vec<Category>,
    pub overall_quality: Quality,
    pub overall_quality_german: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionReport {
    pub original_text: String,
    pub corrected_text: String,
    pub corrections: Vec<CorrectionNote>,
    pub summary: CorrectionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub total_topics: usize,
    pub estimated_minutes: usize,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningSession {
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    pub content: Vec<TopicExplanation>,
    pub final_exercise: Option<GenerationResult>,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerInfo {
    pub state: SessionState,
    pub settings: AnalyzerSettings,
    pub grammar_checker: serde_json::Value,
    pub generator: Option<serde_json::Value>,
}

/// Combines a grammar checker with an optional language model.
pub struct GermanAnalyzer {
    settings: AnalyzerSettings,
    checker: Box<dyn GrammarChecker>,
    generator: Option<Box<dyn TextGenerator>>,
    state: SessionState,
}

impl GermanAnalyzer {
    pub fn new(
        settings: AnalyzerSettings,
        checker: Box<dyn GrammarChecker>,
        generator: Option<Box<dyn TextGenerator>>,
    ) -> Self {
        Self {
            settings,
            checker,
            generator,
            state: SessionState::Uninitialized,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let checker = Box::new(LanguageToolClient::new(config.languagetool.clone()));
        let generator = config
            .generator
            .clone()
            .map(|g| Box::new(OllamaClient::new(g)) as Box<dyn TextGenerator>);
        Self::new(AnalyzerSettings::from(config), checker, generator)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Closed => {
                return Err(Error::SessionClosed {
                    capability: CAPABILITY,
                })
            }
            SessionState::Uninitialized => {}
        }

        tracing::info!(preset = %self.settings.preset, "initializing German analyzer");

        self.checker.initialize()?;
        match self.generator.as_mut() {
            Some(generator) => generator.initialize()?,
            None => tracing::info!("no language model configured, grammar checking only"),
        }

        self.state = SessionState::Ready;
        tracing::info!("German analyzer ready");
        Ok(())
    }

    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.checker.close();
        if let Some(generator) = self.generator.as_mut() {
            generator.close();
        }
        self.state = SessionState::Closed;
        tracing::info!("German analyzer closed");
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(Error::NotReady {
                capability: CAPABILITY,
            })
        }
    }

    fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }

    fn difficulty_or_default(&self, difficulty: Option<Difficulty>) -> Difficulty {
        difficulty.unwrap_or(self.settings.difficulty)
    }

    /// Check `text` and build the corrected version. With a non-empty
    /// `focus`, spans of other categories are dropped first.
    pub fn check_text(&self, text: &str, focus: &[Category]) -> Result<GrammarAnalysis> {
        self.ensure_ready()?;

        let mut spans = self.checker.check(text)?;
        if !focus.is_empty() {
            spans.retain(|span| focus.contains(&span.category));
        }
        let corrected = correction::assemble(text, &spans)?;
        Ok(GrammarAnalysis::new(text, spans, corrected.text))
    }

    pub fn quick_check(&self, text: &str) -> Result<QuickCheck> {
        let analysis = self.check_text(text, &[])?;

        Ok(QuickCheck {
            original_text: text.to_string(),
            has_errors: analysis.has_errors(),
            error_count: analysis.total_errors,
            main_issues: analysis.categories_in_order().into_iter().take(3).collect(),
            quick_suggestions: analysis
                .spans
                .iter()
                .take(3)
                .map(|span| {
                    span.suggestions
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "Keine Vorschläge".to_string())
                })
                .collect(),
            corrected_text: analysis.corrected_text,
        })
    }

    pub fn check_sentence(&self, sentence: &str) -> Result<SentenceCheck> {
        let analysis = self.check_text(sentence, &[])?;

        let errors = analysis
            .spans
            .iter()
            .map(|span| SentenceError {
                category: span.category.clone(),
                rule: span.rule_id.clone(),
                message: span.message.clone(),
                error_text: span.error_text(sentence),
                suggestions: span.suggestions.clone(),
                position: Position {
                    start: span.offset,
                    end: span.end(),
                },
            })
            .collect();

        Ok(SentenceCheck {
            sentence: sentence.to_string(),
            has_errors: analysis.has_errors(),
            error_count: analysis.total_errors,
            errors,
            corrected: analysis.corrected_text,
        })
    }

    /// Grammar check, bucketed feedback and, when a model is configured and
    /// the text has issues, generated explanations, examples and exercises.
    pub fn analyze(&self, text: &str, options: AnalysisOptions) -> Result<ComprehensiveAnalysis> {
        let grammar = self.check_text(text, &[])?;
        let difficulty = self.settings.difficulty;
        let with_examples = options.examples.unwrap_or(self.settings.provide_examples);
        let with_exercises = options
            .exercises
            .unwrap_or(self.settings.generate_exercises);

        let explainer = if options.explanations {
            self.generator()
        } else {
            None
        };
        let feedback = feedback::build(text, &grammar.spans, explainer, difficulty)?;

        let mut llm_analysis = None;
        let mut examples = Vec::new();
        let mut exercises = Vec::new();

        if let (true, Some(generator)) = (grammar.has_errors(), self.generator()) {
            tracing::info!(
                issues = grammar.total_errors,
                "running language model analysis"
            );

            let categories = grammar.categories_in_order();
            let focus: Vec<String> = categories.iter().map(|c| c.id().to_string()).collect();
            llm_analysis = Some(generator.generate(&GenerationRequest::analysis(text, &focus))?);

            if with_examples {
                for category in categories.iter().take(2) {
                    if *category != Category::Grammar {
                        continue;
                    }
                    let request =
                        GenerationRequest::examples(category.german_name(), 2, difficulty);
                    if let Some(generated) = generator.generate(&request)?.text() {
                        examples.extend(
                            generated
                                .lines()
                                .map(str::trim)
                                .filter(|line| !line.is_empty())
                                .map(str::to_string),
                        );
                    }
                }
            }

            if with_exercises {
                for category in categories.iter().take(2) {
                    let request = GenerationRequest::exercise(
                        category.german_name(),
                        ExerciseKind::FillBlank,
                        difficulty,
                    );
                    let exercise = generator.generate(&request)?;
                    if exercise.is_success() {
                        exercises.push(CategoryExercise {
                            category: category.clone(),
                            exercise,
                        });
                    }
                }
            }
        }

        Ok(ComprehensiveAnalysis {
            original_text: text.to_string(),
            recommendations: recommendations(&grammar),
            grammar,
            feedback,
            llm_analysis,
            examples,
            exercises,
        })
    }

    /// Explanation, three examples and one exercise for a grammar topic.
    pub fn explain_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<TopicExplanation> {
        self.ensure_ready()?;
        let difficulty = self.difficulty_or_default(difficulty);

        let Some(generator) = self.generator() else {
            return Ok(TopicExplanation {
                topic: topic.to_string(),
                difficulty,
                status: TopicStatus::Unavailable,
                explanation: None,
                examples: None,
                exercise: None,
            });
        };

        let explanation =
            generator.generate(&GenerationRequest::explanation(topic, difficulty, None))?;
        let examples = generator.generate(&GenerationRequest::examples(topic, 3, difficulty))?;
        let exercise = generator.generate(&GenerationRequest::exercise(
            topic,
            ExerciseKind::FillBlank,
            difficulty,
        ))?;

        let status = if explanation.is_success() && examples.is_success() && exercise.is_success()
        {
            TopicStatus::Success
        } else {
            TopicStatus::Partial
        };

        Ok(TopicExplanation {
            topic: topic.to_string(),
            difficulty,
            status,
            explanation: Some(explanation),
            examples: Some(examples),
            exercise: Some(exercise),
        })
    }

    /// Corrected text plus a note for every critical or miscellaneous issue
    /// that has a suggestion. Style remarks are left out.
    pub fn correct_with_explanation(&self, text: &str) -> Result<CorrectionReport> {
        let grammar = self.check_text(text, &[])?;
        let feedback = feedback::build(text, &grammar.spans, None, self.settings.difficulty)?;

        let mut corrections = Vec::new();
        for item in feedback.critical.iter().chain(feedback.other.iter()) {
            let Some(suggestion) = item.span.suggestions.first() else {
                continue;
            };
            let llm_explanation = match self.generator() {
                Some(generator) => Some(generator.generate(&GenerationRequest::correction_note(
                    &item.error_text,
                    suggestion,
                ))?),
                None => None,
            };
            corrections.push(CorrectionNote {
                original: item.error_text.clone(),
                corrected: suggestion.clone(),
                rule: item.category_german.clone(),
                explanation: item.explanation.clone(),
                llm_explanation,
                position: Position {
                    start: item.span.offset,
                    end: item.span.end(),
                },
            });
        }

        Ok(CorrectionReport {
            original_text: text.to_string(),
            corrected_text: grammar.corrected_text.clone(),
            summary: CorrectionSummary {
                total_corrections: corrections.len(),
                main_categories: grammar.categories_in_order(),
                overall_quality: feedback.quality,
                overall_quality_german: feedback.quality.german_label().to_string(),
            },
            corrections,
        })
    }

    /// Topics are explained one after another, in the order given.
    pub fn learning_session(
        &self,
        topics: &[String],
        difficulty: Option<Difficulty>,
    ) -> Result<LearningSession> {
        self.ensure_ready()?;
        let difficulty = self.difficulty_or_default(difficulty);

        let mut content = Vec::with_capacity(topics.len());
        for topic in topics {
            content.push(self.explain_topic(topic, Some(difficulty))?);
        }

        let final_exercise = match self.generator() {
            Some(generator) if !topics.is_empty() => {
                let topic = format!("Kombinierte Übung zu: {}", topics.join(", "));
                Some(generator.generate(&GenerationRequest::exercise(
                    &topic,
                    ExerciseKind::Mixed,
                    difficulty,
                ))?)
            }
            _ => None,
        };

        Ok(LearningSession {
            topics: topics.to_vec(),
            difficulty,
            content,
            final_exercise,
            summary: SessionSummary {
                total_topics: topics.len(),
                estimated_minutes: topics.len() * MINUTES_PER_TOPIC,
                difficulty,
            },
        })
    }

    pub fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo {
            state: self.state,
            settings: self.settings.clone(),
            grammar_checker: self.checker.describe(),
            generator: self.generator.as_ref().map(|g| g.describe()),
        }
    }
}

impl Drop for GermanAnalyzer {
    fn drop(&mut self) {
        self.close();
    }
}

fn recommendations(grammar: &GrammarAnalysis) -> Vec<String> {
    let mut recommendations: Vec<String> = match grammar.total_errors {
        0 => vec![
            "Ausgezeichnet! Ihr Text ist grammatikalisch korrekt.",
            "Versuchen Sie komplexere Satzstrukturen zu verwenden.",
        ],
        1..=2 => vec![
            "Gute Arbeit! Nur wenige kleine Fehler.",
            "Achten Sie auf die Details bei der Kasuskongruenz.",
        ],
        _ => vec![
            "Konzentrieren Sie sich auf die Grundgrammatik.",
            "Üben Sie regelmäßig mit einfacheren Texten.",
        ],
    }
    .into_iter()
    .map(str::to_string)
    .collect();

    if grammar.count(&Category::Typos) > 0 {
        recommendations.push("Verwenden Sie eine Rechtschreibprüfung.".to_string());
    }
    if grammar.count(&Category::Grammar) > 0 {
        recommendations.push("Wiederholen Sie die deutschen Kasusregeln.".to_string());
    }
    recommendations
}
