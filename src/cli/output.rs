use crate::analyzer::{
    AnalyzerInfo, ComprehensiveAnalysis, CorrectionReport, LearningSession, QuickCheck,
    SentenceCheck, TopicExplanation, TopicStatus,
};
use crate::feedback::{FeedbackItem, Severity};
use crate::generator::GenerationResult;
use crate::grammar::rules::RuleExplanation;
use crate::grammar::Span;
use crate::session::SessionState;
use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Spinner on stderr while a service is being contacted. Cleared when
/// dropped, including on early returns.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    /// A disabled spinner draws nothing.
    pub fn start(message: &str, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self { bar }
    }

    pub fn clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Cut `text` to at most `max` graphemes, appending an ellipsis when cut.
pub fn shorten(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        text.to_string()
    } else {
        format!("{}…", graphemes[..max.saturating_sub(1)].concat())
    }
}

/// Render `text` with every span's covered characters highlighted.
pub fn highlight(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut flagged = vec![false; chars.len()];
    for span in spans {
        for flag in flagged.iter_mut().skip(span.offset).take(span.length) {
            *flag = true;
        }
    }

    let mut out = String::new();
    let mut run = String::new();
    let mut run_flagged = false;
    for (ch, is_flagged) in chars.into_iter().zip(flagged) {
        if is_flagged != run_flagged && !run.is_empty() {
            push_run(&mut out, &run, run_flagged);
            run.clear();
        }
        run_flagged = is_flagged;
        run.push(ch);
    }
    push_run(&mut out, &run, run_flagged);
    out
}

fn push_run(out: &mut String, run: &str, flagged: bool) {
    if flagged {
        out.push_str(&run.red().bold().underline().to_string());
    } else {
        out.push_str(run);
    }
}

pub fn print_ready(preset: &str) {
    println!(
        "{} {} ({})",
        "✓".green().bold(),
        "Ready!".green().bold(),
        preset.cyan()
    );
}

pub fn print_not_ready(error: &dyn fmt::Display) {
    eprintln!("{} {}", "✗ Not ready:".red().bold(), error);
}

pub fn print_quick_check(result: &QuickCheck) {
    println!("{} {}", "Text:".bold(), result.original_text);
    println!("{} {}", "Errors:".bold(), error_count(result.error_count));
    if result.has_errors {
        println!("{} {}", "Corrected:".bold(), result.corrected_text.green());
        let issues: Vec<&str> = result.main_issues.iter().map(|c| c.german_name()).collect();
        println!("{} {}", "Main issues:".bold(), issues.join(", "));
        println!(
            "{} {}",
            "Suggestions:".bold(),
            result.quick_suggestions.join(&", ".dimmed().to_string())
        );
    } else {
        println!("{}", "✓ No errors found!".green().bold());
    }
}

pub fn print_sentence_check(result: &SentenceCheck) {
    println!("{} {}", "Sentence:".bold(), result.sentence);
    for error in &result.errors {
        let position = format!("{}-{}", error.position.start, error.position.end);
        println!(
            "  {} {} {} {}",
            position.blue().bold(),
            error.error_text.red().bold(),
            format!("[{}]", error.category).dimmed(),
            error.message
        );
        if !error.suggestions.is_empty() {
            println!(
                "    {} {}",
                "→".dimmed(),
                error.suggestions.join(", ").green()
            );
        }
    }
    if result.has_errors {
        println!("{} {}", "Corrected:".bold(), result.corrected.green());
    } else {
        println!("{}", "✓ No errors found!".green().bold());
    }
}

fn error_count(count: usize) -> ColoredString {
    if count == 0 {
        count.to_string().green().bold()
    } else {
        count.to_string().red().bold()
    }
}

fn print_item(item: &FeedbackItem) {
    let severity = match item.severity {
        Severity::High => "high".red(),
        Severity::Medium => "medium".yellow(),
        Severity::Low => "low".dimmed(),
    };
    println!(
        "  {} {} {} {}",
        format!("{}:{}", item.span.offset, item.span.length).blue(),
        item.error_text.red().bold(),
        format!("[{}, {}]", item.category_german, severity).dimmed(),
        item.span.message
    );
    if let Some(top) = item.span.suggestions.first() {
        println!("    {} {}", "→".dimmed(), top.green());
    }
    if !item.span.context.is_empty() {
        println!("    {}", shorten(&item.span.context, 80).dimmed());
    }
    if let Some(generated) = &item.generated_explanation {
        print_generated("    ", generated);
    }
}

fn print_generated(indent: &str, result: &GenerationResult) {
    match (result.text(), result.error_detail()) {
        (Some(text), _) => {
            for line in text.lines() {
                println!("{}{}", indent, line);
            }
        }
        (None, Some(detail)) => println!(
            "{}{} {}",
            indent,
            "(generation failed)".yellow(),
            detail.dimmed()
        ),
        (None, None) => {}
    }
}

pub fn print_analysis(result: &ComprehensiveAnalysis) {
    let grammar = &result.grammar;
    println!("{}", highlight(&grammar.text, &grammar.spans));
    println!();

    let counts = &result.feedback.counts;
    println!(
        "{} {} total, {} critical, {} style, {} other",
        "Issues:".bold(),
        error_count(counts.total()),
        counts.critical,
        counts.style,
        counts.other
    );
    println!(
        "{} {}",
        "Quality:".bold(),
        result.feedback.quality.german_label().cyan()
    );

    for (title, items) in [
        ("Critical errors", &result.feedback.critical),
        ("Style suggestions", &result.feedback.style),
        ("Learning opportunities", &result.feedback.other),
    ] {
        if items.is_empty() {
            continue;
        }
        println!("\n{}", title.bold().underline());
        for item in items.iter() {
            print_item(item);
        }
    }

    if grammar.has_errors() {
        println!(
            "\n{} {}",
            "Corrected:".bold(),
            grammar.corrected_text.green()
        );
    }

    if let Some(llm) = &result.llm_analysis {
        println!("\n{}", "Model analysis".bold().underline());
        print_generated("  ", llm);
    }
    if !result.examples.is_empty() {
        println!("\n{}", "Examples".bold().underline());
        for example in &result.examples {
            println!("  • {}", example);
        }
    }
    for exercise in &result.exercises {
        println!(
            "\n{} {}",
            "Exercise:".bold().underline(),
            exercise.category.german_name()
        );
        print_generated("  ", &exercise.exercise);
    }

    println!("\n{}", "Recommendations".bold().underline());
    for recommendation in result
        .recommendations
        .iter()
        .chain(result.feedback.improvement_suggestions.iter())
    {
        println!("  • {}", recommendation);
    }
}

pub fn print_correction_report(report: &CorrectionReport) {
    println!("{} {}", "Original:".bold(), report.original_text);
    println!("{} {}", "Corrected:".bold(), report.corrected_text.green());
    for note in &report.corrections {
        println!(
            "\n  {} {} {} {}",
            note.original.red().bold(),
            "→".dimmed(),
            note.corrected.green().bold(),
            format!("({})", note.rule).dimmed()
        );
        println!("    {}", note.explanation);
        if let Some(generated) = &note.llm_explanation {
            print_generated("    ", generated);
        }
    }
    println!(
        "\n{} {} ({} {})",
        "Quality:".bold(),
        report.summary.overall_quality_german.cyan(),
        report.summary.total_corrections,
        if report.summary.total_corrections == 1 {
            "correction"
        } else {
            "corrections"
        }
    );
}

pub fn print_topic(topic: &TopicExplanation) {
    if topic.status == TopicStatus::Unavailable {
        println!(
            "{} No language model in this configuration. Use the 'fast' or 'default' preset for explanations.",
            "✗".red().bold()
        );
        return;
    }

    println!(
        "{} {} {}",
        "📚".bold(),
        topic.topic.bold(),
        format!("({})", topic.difficulty).dimmed()
    );
    for (title, section) in [
        ("Explanation", &topic.explanation),
        ("Examples", &topic.examples),
        ("Exercise", &topic.exercise),
    ] {
        if let Some(result) = section {
            println!("\n{}", title.bold().underline());
            print_generated("  ", result);
        }
    }
    if topic.status == TopicStatus::Partial {
        println!("\n{}", "Some sections could not be generated.".yellow());
    }
}

pub fn print_session(session: &LearningSession) {
    for topic in &session.content {
        print_topic(topic);
        println!();
    }
    if let Some(exercise) = &session.final_exercise {
        println!("{}", "Combined exercise".bold().underline());
        print_generated("  ", exercise);
        println!();
    }
    println!(
        "{} {} {}, about {} minutes ({})",
        "Session:".bold(),
        session.summary.total_topics,
        if session.summary.total_topics == 1 {
            "topic"
        } else {
            "topics"
        },
        session.summary.estimated_minutes,
        session.summary.difficulty
    );
}

pub fn print_rule(rule: &RuleExplanation) {
    println!(
        "{} {}",
        rule.rule_id.bold(),
        format!("({})", rule.category_german).dimmed()
    );
    println!("  {}", rule.description);
    println!("  {}", rule.explanation);
    for example in &rule.examples {
        println!("    {}", example.italic());
    }
}

pub fn print_status(info: &AnalyzerInfo) {
    let state = match info.state {
        SessionState::Ready => "✓ German analyzer initialized".green().bold(),
        SessionState::Uninitialized => "✗ German analyzer not initialized".red().bold(),
        SessionState::Closed => "✗ German analyzer closed".yellow().bold(),
    };
    println!("{}", state);
    println!("  Preset: {}", info.settings.preset.cyan());
    println!("  Difficulty: {}", info.settings.difficulty);
    println!("  Grammar checker: {}", info.grammar_checker);
    match &info.generator {
        Some(generator) => println!("  Language model: {}", generator),
        None => println!("  Language model: {}", "none".dimmed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Category;

    #[test]
    fn test_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_spinner_is_cleared_when_dropped() {
        let spinner = Spinner::start("Working...", true);
        let bar = spinner.bar.clone().unwrap();
        assert!(!bar.is_finished());
        drop(spinner);
        assert!(bar.is_finished());

        assert!(Spinner::start("Working...", false).bar.is_none());
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("Straße", 10), "Straße");
        assert_eq!(shorten("Übungsaufgabe", 5), "Übun…");
    }

    #[test]
    fn test_highlight_keeps_text() {
        colored::control::set_override(false);
        let spans = vec![Span::new(4, 5, Category::Typos, &["Größe"])];
        assert_eq!(highlight("Die Grösse", &spans), "Die Grösse");
        colored::control::unset_override();
    }
}
