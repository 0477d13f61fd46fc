use crate::config::LanguageToolConfig;
use crate::error::{Error, Result};
use crate::grammar::{rules, Category, GrammarChecker, Span};
use crate::session::{Capability, Session, SessionState};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const CAPABILITY: &str = "LanguageTool";

pub const SUPPORTED_LANGUAGES: &[&str] = &["de-DE", "de-AT", "de-CH"];

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatch {
    message: String,
    #[serde(default)]
    short_message: String,
    #[serde(default)]
    replacements: Vec<Replacement>,
    offset: usize,
    length: usize,
    #[serde(default)]
    context: Option<RawContext>,
    rule: RawRule,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    #[serde(default)]
    description: Option<String>,
    category: RawCategory,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLanguage {
    long_code: String,
}

struct Connection {
    http: Client,
    base_url: String,
}

/// Grammar checker backed by a LanguageTool HTTP server.
pub struct LanguageToolClient {
    config: LanguageToolConfig,
    session: Session<Connection>,
}

impl LanguageToolClient {
    pub fn new(config: LanguageToolConfig) -> Self {
        Self {
            config,
            session: Session::new(CAPABILITY),
        }
    }

    pub fn config(&self) -> &LanguageToolConfig {
        &self.config
    }

    fn connect(config: &LanguageToolConfig) -> Result<Connection> {
        let init_error = |message: String| Error::Initialization {
            capability: CAPABILITY,
            message,
        };

        if !SUPPORTED_LANGUAGES.contains(&config.language.as_str()) {
            return Err(init_error(format!(
                "unsupported language '{}', expected one of {}",
                config.language,
                SUPPORTED_LANGUAGES.join(", ")
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| init_error(e.to_string()))?;
        let base_url = config.server_url.trim_end_matches('/').to_string();

        tracing::info!(
            server = %base_url,
            language = %config.language,
            "connecting to LanguageTool"
        );

        let languages: Vec<RawLanguage> = http
            .get(format!("{}/v2/languages", base_url))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| init_error(format!("{} unreachable: {}", base_url, e)))?;

        if !languages.iter().any(|l| l.long_code == config.language) {
            return Err(init_error(format!(
                "server at {} does not offer {}",
                base_url, config.language
            )));
        }

        Ok(Connection { http, base_url })
    }

    fn form_params(&self, text: &str) -> Vec<(&'static str, String)> {
        let config = &self.config;
        let mut params = vec![
            ("text", text.to_string()),
            ("language", config.language.clone()),
        ];
        if let Some(mother_tongue) = &config.mother_tongue {
            params.push(("motherTongue", mother_tongue.clone()));
        }
        if !config.enabled_rules.is_empty() {
            params.push(("enabledRules", config.enabled_rules.join(",")));
            params.push(("enabledOnly", "true".to_string()));
        }
        if !config.disabled_rules.is_empty() {
            params.push(("disabledRules", config.disabled_rules.join(",")));
        }
        if !config.enabled_categories.is_empty() {
            params.push(("enabledCategories", config.enabled_categories.join(",")));
        }
        if !config.disabled_categories.is_empty() {
            params.push(("disabledCategories", config.disabled_categories.join(",")));
        }
        params
    }

    fn to_spans(&self, text: &str, response: CheckResponse) -> Vec<Span> {
        response
            .matches
            .into_iter()
            .map(|m| {
                let (offset, length) = utf16_to_chars(text, m.offset, m.length);
                Span {
                    offset,
                    length,
                    category: Category::from_id(&m.rule.category.id),
                    rule_description: Some(
                        m.rule
                            .description
                            .unwrap_or_else(|| rules::describe(&m.rule.id)),
                    ),
                    rule_id: m.rule.id,
                    message: m.message,
                    short_message: m.short_message,
                    suggestions: m
                        .replacements
                        .into_iter()
                        .take(self.config.max_suggestions)
                        .map(|r| r.value)
                        .collect(),
                    context: m.context.map(|c| c.text).unwrap_or_default(),
                }
            })
            .collect()
    }
}

impl Capability for LanguageToolClient {
    fn name(&self) -> &'static str {
        CAPABILITY
    }

    fn initialize(&mut self) -> Result<()> {
        let config = &self.config;
        self.session.open(|| Self::connect(config))
    }

    fn close(&mut self) {
        if self.session.close(drop) {
            tracing::info!("LanguageTool resources released");
        }
    }

    fn state(&self) -> SessionState {
        self.session.state()
    }
}

impl GrammarChecker for LanguageToolClient {
    fn check(&self, text: &str) -> Result<Vec<Span>> {
        let connection = self.session.handle()?;

        let response: CheckResponse = connection
            .http
            .post(format!("{}/v2/check", connection.base_url))
            .form(&self.form_params(text))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| Error::Checker(e.to_string()))?;

        let spans = self.to_spans(text, response);
        tracing::debug!(matches = spans.len(), "LanguageTool check finished");
        Ok(spans)
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "name": CAPABILITY,
            "state": self.state(),
            "server_url": self.config.server_url,
            "language": self.config.language,
            "mother_tongue": self.config.mother_tongue,
            "supported_languages": SUPPORTED_LANGUAGES,
            "supported_categories": Category::known().iter().map(|c| c.id()).collect::<Vec<_>>(),
        })
    }
}

/// LanguageTool reports positions in UTF-16 code units. Positions past the end
/// stay past the end so bound checks downstream still fire.
fn utf16_to_chars(text: &str, offset: usize, length: usize) -> (usize, usize) {
    let end = offset + length;
    let mut units = 0;
    let mut start_char = None;
    let mut end_char = None;

    for (index, ch) in text.chars().enumerate() {
        if start_char.is_none() && units >= offset {
            start_char = Some(index);
        }
        if end_char.is_none() && units >= end {
            end_char = Some(index);
            break;
        }
        units += ch.len_utf16();
    }

    let total_chars = text.chars().count();
    let start = start_char.unwrap_or(total_chars + offset.saturating_sub(units));
    let finish = end_char.unwrap_or(total_chars + end.saturating_sub(units));
    (start, finish.saturating_sub(start))
}
