use crate::generator::{GenerationRequest, TaskType};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ROLE_MARKER: Regex = Regex::new(r"^\s*<\|im_start\|>\s*assistant\s*").unwrap();
    static ref END_MARKER: Regex = Regex::new(r"\s*<\|im_end\|>[\s\S]*$").unwrap();
}

fn system_prompt(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::Explanation => {
            "Du bist ein erfahrener Deutschlehrer. Erkläre deutsche Grammatikregeln klar und verständlich.\n\
             Verwende einfache Sprache und gib konkrete Beispiele. Strukturiere deine Antworten logisch."
        }
        TaskType::Example => {
            "Du bist ein Deutschlehrer, der hilfreiche Beispiele erstellt.\n\
             Generiere klare, relevante Beispielsätze, die die gewünschte Grammatikregel demonstrieren.\n\
             Variiere die Komplexität basierend auf dem Schwierigkeitsgrad."
        }
        TaskType::Exercise => {
            "Du bist ein Deutschlehrer, der Übungen erstellt.\n\
             Erstelle ansprechende und lehrreiche Übungen für deutsche Grammatik.\n\
             Stelle Fragen, Lückentexte oder Umformungsaufgaben bereit."
        }
        TaskType::Correction => {
            "Du bist ein Deutschlehrer, der Texte korrigiert.\n\
             Analysiere den Text auf Grammatikfehler, erkläre die Fehler und gib Verbesserungsvorschläge."
        }
    }
}

/// Render a request in ChatML, ending with an open assistant turn.
pub fn format(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "<|im_start|>system\n{}<|im_end|>\n<|im_start|>user\nAufgabe: {}\nSchwierigkeitsgrad: {}\n",
        system_prompt(request.task_type),
        request.task_type,
        request.difficulty
    );

    if request.task_type != TaskType::Correction {
        prompt.push_str(&format!("Grammatik-Fokus: {}\n", request.topic));
    }
    if let Some(context) = &request.context {
        prompt.push_str(&format!("Kontext: {}\n", context));
    }
    prompt.push_str(&format!(
        "Inhalt: {}<|im_end|>\n<|im_start|>assistant\n",
        request.content
    ));
    prompt
}

/// Strip chat markers the model sometimes echoes back.
pub fn clean_response(raw: &str) -> String {
    let text = ROLE_MARKER.replace(raw.trim(), "");
    END_MARKER.replace(&text, "").trim().to_string()
}
