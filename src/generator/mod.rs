pub mod ollama;
pub mod prompt;

use crate::error::Result;
use crate::session::Capability;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use ollama::OllamaClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Explanation,
    Example,
    Exercise,
    Correction,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Explanation => write!(f, "explanation"),
            TaskType::Example => write!(f, "example"),
            TaskType::Exercise => write!(f, "exercise"),
            TaskType::Correction => write!(f, "correction"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    FillBlank,
    MultipleChoice,
    Transformation,
    Correction,
    Mixed,
}

impl ExerciseKind {
    fn instruction(self) -> &'static str {
        match self {
            ExerciseKind::FillBlank => "Erstelle eine Lückentext-Übung",
            ExerciseKind::MultipleChoice => "Erstelle eine Multiple-Choice-Aufgabe",
            ExerciseKind::Transformation => "Erstelle eine Satz-Umformungsaufgabe",
            ExerciseKind::Correction => "Erstelle eine Fehlerkorrektur-Aufgabe",
            ExerciseKind::Mixed => "Erstelle eine gemischte Übung mit verschiedenen Aufgabentypen",
        }
    }
}

/// One prompt for the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub task_type: TaskType,
    pub topic: String,
    pub content: String,
    pub difficulty: Difficulty,
    pub context: Option<String>,
}

impl GenerationRequest {
    pub fn explanation(topic: &str, difficulty: Difficulty, context: Option<String>) -> Self {
        Self {
            task_type: TaskType::Explanation,
            topic: topic.to_string(),
            content: format!("Erkläre mir die deutsche Grammatikregel: {}", topic),
            difficulty,
            context,
        }
    }

    pub fn examples(topic: &str, count: usize, difficulty: Difficulty) -> Self {
        Self {
            task_type: TaskType::Example,
            topic: topic.to_string(),
            content: format!("Erstelle {} Beispielsätze für: {}", count, topic),
            difficulty,
            context: None,
        }
    }

    pub fn exercise(topic: &str, kind: ExerciseKind, difficulty: Difficulty) -> Self {
        Self {
            task_type: TaskType::Exercise,
            topic: topic.to_string(),
            content: format!("{} für das Thema: {}", kind.instruction(), topic),
            difficulty,
            context: None,
        }
    }

    pub fn correction_note(error_text: &str, suggestion: &str) -> Self {
        Self {
            task_type: TaskType::Correction,
            topic: error_text.to_string(),
            content: format!(
                "Erkläre den Grammatikfehler: '{}' sollte '{}' sein. Warum?",
                error_text, suggestion
            ),
            difficulty: Difficulty::default(),
            context: None,
        }
    }

    /// Free-form review of a whole text, focused on the given categories.
    pub fn analysis(text: &str, focus_areas: &[String]) -> Self {
        let focus = if focus_areas.is_empty() {
            "allgemeine Grammatik".to_string()
        } else {
            focus_areas.join(", ")
        };
        Self {
            task_type: TaskType::Correction,
            topic: focus.clone(),
            content: format!("Analysiere diesen deutschen Text auf {}: {}", focus, text),
            difficulty: Difficulty::default(),
            context: Some("Textanalyse".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated { text: String },
    Failed { detail: String },
}

/// Answer to one [`GenerationRequest`]. A failed generation is a value, not
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub task_type: TaskType,
    pub topic: String,
    pub difficulty: Difficulty,
    pub outcome: GenerationOutcome,
}

impl GenerationResult {
    pub fn generated(request: &GenerationRequest, text: String) -> Self {
        Self::from_request(request, GenerationOutcome::Generated { text })
    }

    pub fn failed(request: &GenerationRequest, detail: impl Into<String>) -> Self {
        Self::from_request(
            request,
            GenerationOutcome::Failed {
                detail: detail.into(),
            },
        )
    }

    fn from_request(request: &GenerationRequest, outcome: GenerationOutcome) -> Self {
        Self {
            task_type: request.task_type,
            topic: request.topic.clone(),
            difficulty: request.difficulty,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, GenerationOutcome::Generated { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            GenerationOutcome::Generated { text } => Some(text),
            GenerationOutcome::Failed { .. } => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            GenerationOutcome::Generated { .. } => None,
            GenerationOutcome::Failed { detail } => Some(detail),
        }
    }
}

impl Serialize for GenerationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GenerationResult", 6)?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("task_type", &self.task_type)?;
        state.serialize_field("topic", &self.topic)?;
        state.serialize_field("difficulty", &self.difficulty)?;
        state.serialize_field("text", self.text().unwrap_or_default())?;
        state.serialize_field("error_detail", &self.error_detail())?;
        state.end()
    }
}

/// Prompt in, generated text out.
///
/// `Err` is reserved for hard errors such as an uninitialized session; model
/// or transport failures come back as [`GenerationOutcome::Failed`].
pub trait TextGenerator: Capability {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name(), "state": self.state() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("Beginner".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_requests() {
        let request =
            GenerationRequest::exercise("Dativ", ExerciseKind::FillBlank, Difficulty::Beginner);
        assert_eq!(request.task_type, TaskType::Exercise);
        assert_eq!(
            request.content,
            "Erstelle eine Lückentext-Übung für das Thema: Dativ"
        );

        let analysis = GenerationRequest::analysis("Text", &[]);
        assert!(analysis.content.contains("allgemeine Grammatik"));
    }

    #[test]
    fn test_result_serialization() {
        let request = GenerationRequest::examples("Akkusativ", 3, Difficulty::Advanced);
        let failed = GenerationResult::failed(&request, "model offline");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_detail"], "model offline");
        assert_eq!(json["difficulty"], "advanced");

        let ok = GenerationResult::generated(&request, "Ich sehe den Hund.".to_string());
        assert_eq!(
            serde_json::to_value(&ok).unwrap()["text"],
            "Ich sehe den Hund."
        );
        assert!(ok.is_success());
    }
}
