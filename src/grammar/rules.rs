use crate::grammar::Category;
use serde::Serialize;

/// Static teaching material for a well-known LanguageTool rule id.
#[derive(Debug, Clone, Serialize)]
pub struct RuleExplanation {
    pub rule_id: String,
    pub category: Category,
    pub category_german: String,
    pub description: String,
    pub explanation: String,
    pub examples: Vec<String>,
}

pub fn describe(rule_id: &str) -> String {
    match rule_id {
        "GERMAN_SPELLER_RULE" | "GERMAN_SPELLCHECK" => "Rechtschreibprüfung".to_string(),
        "AGREEMENT_ERRORS" => "Kongruenzfehler (Subjekt-Prädikat-Übereinstimmung)".to_string(),
        "CASE_AGREEMENT" => "Kasuskongruenz".to_string(),
        "ARTICLE_MISSING" => "Fehlender Artikel".to_string(),
        "COMMA_COMPOUND_SENTENCE" => "Komma in zusammengesetzten Sätzen".to_string(),
        "WORD_ORDER" => "Wortstellung".to_string(),
        other => format!("Regel: {}", other),
    }
}

/// Best guess of a rule's category from its id alone.
pub fn infer_category(rule_id: &str) -> Category {
    if rule_id.contains("SPELL") {
        Category::Typos
    } else if rule_id.contains("COMMA") {
        Category::Punctuation
    } else {
        Category::Grammar
    }
}

pub fn educational_explanation(rule_id: &str) -> &'static str {
    match rule_id {
        "AGREEMENT_ERRORS" => {
            "Das Subjekt und das Prädikat müssen in Person und Numerus übereinstimmen."
        }
        "CASE_AGREEMENT" => "Artikel, Adjektive und Substantive müssen im gleichen Kasus stehen.",
        "ARTICLE_MISSING" => {
            "Deutsche Substantive benötigen meist einen Artikel (der, die, das, ein, eine)."
        }
        "COMMA_COMPOUND_SENTENCE" => "Hauptsätze werden durch Kommas getrennt.",
        _ => "Überprüfen Sie die Grammatikregel.",
    }
}

pub fn examples(rule_id: &str) -> Vec<String> {
    let pairs: &[&str] = match rule_id {
        "AGREEMENT_ERRORS" => &[
            "Falsch: Die Kinder spielt im Garten.",
            "Richtig: Die Kinder spielen im Garten.",
        ],
        "CASE_AGREEMENT" => &[
            "Falsch: Ich gebe der Mann das Buch.",
            "Richtig: Ich gebe dem Mann das Buch.",
        ],
        _ => &[],
    };
    pairs.iter().map(|s| s.to_string()).collect()
}

pub fn explain(rule_id: &str) -> RuleExplanation {
    let category = infer_category(rule_id);
    RuleExplanation {
        rule_id: rule_id.to_string(),
        category_german: category.german_name().to_string(),
        category,
        description: describe(rule_id),
        explanation: educational_explanation(rule_id).to_string(),
        examples: examples(rule_id),
    }
}
