use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::generator::{prompt, GenerationRequest, GenerationResult, TextGenerator};
use crate::session::{Capability, Session, SessionState};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CAPABILITY: &str = "language model";

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: String,
    raw: bool,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

struct Connection {
    http: Client,
    base_url: String,
}

/// Text generator backed by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    config: GeneratorConfig,
    session: Session<Connection>,
}

impl OllamaClient {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            session: Session::new(CAPABILITY),
        }
    }

    fn connect(config: &GeneratorConfig) -> Result<Connection> {
        let init_error = |message: String| Error::Initialization {
            capability: CAPABILITY,
            message,
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| init_error(e.to_string()))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        tracing::info!(server = %base_url, model = %config.model, "loading language model");

        let tags: TagsResponse = http
            .get(format!("{}/api/tags", base_url))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| init_error(format!("{} unreachable: {}", base_url, e)))?;

        if !has_model(&tags, &config.model) {
            return Err(init_error(format!(
                "model '{}' is not installed on {}",
                config.model, base_url
            )));
        }

        Ok(Connection { http, base_url })
    }

    fn body(&self, request: &GenerationRequest) -> GenerateBody<'_> {
        GenerateBody {
            model: &self.config.model,
            prompt: prompt::format(request),
            raw: true,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens,
            },
        }
    }
}

/// A bare model name means its `latest` tag.
fn has_model(tags: &TagsResponse, model: &str) -> bool {
    let latest = format!("{}:latest", model);
    tags.models
        .iter()
        .any(|tag| tag.name == model || tag.name == latest)
}

fn interpret(request: &GenerationRequest, response: GenerateResponse) -> GenerationResult {
    if let Some(error) = response.error {
        return GenerationResult::failed(request, error);
    }
    let text = prompt::clean_response(&response.response);
    if text.is_empty() {
        GenerationResult::failed(request, "model returned an empty response")
    } else {
        GenerationResult::generated(request, text)
    }
}

impl Capability for OllamaClient {
    fn name(&self) -> &'static str {
        CAPABILITY
    }

    fn initialize(&mut self) -> Result<()> {
        let config = &self.config;
        self.session.open(|| Self::connect(config))
    }

    fn close(&mut self) {
        if self.session.close(drop) {
            tracing::info!(model = %self.config.model, "language model resources released");
        }
    }

    fn state(&self) -> SessionState {
        self.session.state()
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let connection = self.session.handle()?;

        tracing::debug!(task = %request.task_type, topic = %request.topic, "generating");

        let sent = connection
            .http
            .post(format!("{}/api/generate", connection.base_url))
            .json(&self.body(request))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<GenerateResponse>());

        let result = match sent {
            Ok(response) => interpret(request, response),
            Err(e) => GenerationResult::failed(request, e.to_string()),
        };
        if let Some(detail) = result.error_detail() {
            tracing::warn!(task = %request.task_type, detail, "text generation failed");
        }
        Ok(result)
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "name": CAPABILITY,
            "state": self.state(),
            "model": self.config.model,
            "base_url": self.config.base_url,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }
}
