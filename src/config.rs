use crate::error::Error;
use crate::generator::Difficulty;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".sprachtutor.toml";
pub const PRESETS: &[&str] = &["grammar-only", "fast", "default"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageToolConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub mother_tongue: Option<String>,
    #[serde(default)]
    pub enabled_rules: Vec<String>,
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    #[serde(default)]
    pub enabled_categories: Vec<String>,
    #[serde(default)]
    pub disabled_categories: Vec<String>,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_language() -> String {
    "de-DE".to_string()
}

fn default_max_suggestions() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LanguageToolConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            language: default_language(),
            mother_tongue: None,
            enabled_rules: Vec::new(),
            disabled_rules: Vec::new(),
            enabled_categories: Vec::new(),
            disabled_categories: Vec::new(),
            max_suggestions: default_max_suggestions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_generation_timeout() -> u64 {
    300
}

impl GeneratorConfig {
    pub fn with_model(model: &str) -> Self {
        Self {
            base_url: default_base_url(),
            model: model.to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub preset: String,
    pub difficulty: Difficulty,
    pub provide_examples: bool,
    pub generate_exercises: bool,
    pub languagetool: LanguageToolConfig,
    pub generator: Option<GeneratorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self::preset("default")
    }
}

/// On-disk shape: every field optional so files only override what they set.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    preset: Option<String>,
    difficulty: Option<Difficulty>,
    provide_examples: Option<bool>,
    generate_exercises: Option<bool>,
    languagetool: Option<LanguageToolConfig>,
    generator: Option<GeneratorFile>,
    #[serde(default)]
    disable_generator: bool,
}

/// `[generator]` table: unset fields keep the preset's values.
#[derive(Debug, Default, Deserialize)]
struct GeneratorFile {
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    timeout_secs: Option<u64>,
}

impl GeneratorFile {
    /// Apply onto `base`. Without a base, a model name is required.
    fn apply(self, base: Option<GeneratorConfig>) -> Option<GeneratorConfig> {
        let mut config = match (base, &self.model) {
            (Some(config), _) => config,
            (None, Some(model)) => GeneratorConfig::with_model(model),
            (None, None) => {
                tracing::warn!("ignoring [generator] settings without a model");
                return None;
            }
        };
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            config.top_p = top_p;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        Some(config)
    }
}

/// Command-line overrides, applied last.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub preset: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub server_url: Option<String>,
    pub model_url: Option<String>,
    pub model: Option<String>,
}

impl Config {
    /// Built-in presets. Unknown names fall back to `default`.
    pub fn preset(name: &str) -> Self {
        let languagetool = LanguageToolConfig::default();
        match name {
            "grammar-only" => Self {
                preset: name.to_string(),
                difficulty: Difficulty::Intermediate,
                provide_examples: false,
                generate_exercises: false,
                languagetool,
                generator: None,
            },
            "fast" => Self {
                preset: name.to_string(),
                difficulty: Difficulty::Intermediate,
                provide_examples: false,
                generate_exercises: false,
                languagetool,
                generator: Some(GeneratorConfig {
                    max_tokens: 512,
                    ..GeneratorConfig::with_model("llama3.2:1b")
                }),
            },
            "default" => Self {
                preset: name.to_string(),
                difficulty: Difficulty::Intermediate,
                provide_examples: true,
                generate_exercises: false,
                languagetool,
                generator: Some(GeneratorConfig::with_model("leo-hessianai-7b-chat")),
            },
            other => {
                tracing::warn!(preset = other, "unknown preset, using default");
                Self::preset("default")
            }
        }
    }

    /// Load configuration with priority: CLI args > local config > global config > preset
    pub fn load(overrides: Overrides) -> Result<Self> {
        let mut files = Vec::new();
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                files.push(Self::from_file(&global_path)?);
            }
        }
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            files.push(Self::from_file(&local_path)?);
        }

        let preset_name = overrides
            .preset
            .clone()
            .or_else(|| files.iter().rev().find_map(|f| f.preset.clone()))
            .or_else(Self::active_preset)
            .unwrap_or_else(|| "default".to_string());

        let mut config = Self::preset(&preset_name);
        for file in files {
            config = config.merge(file);
        }
        let config = config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reject values no server would accept.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.languagetool.server_url.trim().is_empty() {
            return Err(Error::Config("languagetool.server_url is empty".to_string()));
        }
        if let Some(generator) = &self.generator {
            if generator.model.trim().is_empty() {
                return Err(Error::Config("generator.model is empty".to_string()));
            }
            if !(0.0..=2.0).contains(&generator.temperature) {
                return Err(Error::Config(format!(
                    "generator.temperature must be within 0.0..=2.0, got {}",
                    generator.temperature
                )));
            }
            if !(generator.top_p > 0.0 && generator.top_p <= 1.0) {
                return Err(Error::Config(format!(
                    "generator.top_p must be within (0.0, 1.0], got {}",
                    generator.top_p
                )));
            }
        }
        Ok(())
    }

    fn from_file(path: &Path) -> Result<ConfigFile> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: ConfigFile) -> Self {
        if let Some(difficulty) = other.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(provide_examples) = other.provide_examples {
            self.provide_examples = provide_examples;
        }
        if let Some(generate_exercises) = other.generate_exercises {
            self.generate_exercises = generate_exercises;
        }
        if let Some(languagetool) = other.languagetool {
            self.languagetool = languagetool;
        }
        if other.disable_generator {
            self.generator = None;
        } else if let Some(generator) = other.generator {
            self.generator = generator.apply(self.generator.take());
        }
        self
    }

    fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(difficulty) = overrides.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(server_url) = overrides.server_url {
            self.languagetool.server_url = server_url;
        }
        if let Some(generator) = self.generator.as_mut() {
            if let Some(model_url) = overrides.model_url {
                generator.base_url = model_url;
            }
            if let Some(model) = overrides.model {
                generator.model = model;
            }
        } else if let Some(model) = overrides.model {
            let mut generator = GeneratorConfig::with_model(&model);
            if let Some(model_url) = overrides.model_url {
                generator.base_url = model_url;
            }
            self.generator = Some(generator);
        }
        self
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sprachtutor").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sprachtutor").map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Preset recorded by the last `init`.
    pub fn active_preset() -> Option<String> {
        read_active_preset(&Self::data_dir()?)
    }

    pub fn save_active_preset(name: &str) -> Result<PathBuf> {
        let dir = Self::data_dir().context("Failed to get data directory")?;
        write_active_preset(&dir, name)
    }
}

const ACTIVE_PRESET_FILE: &str = "active_preset";

fn read_active_preset(data_dir: &Path) -> Option<String> {
    let name = fs::read_to_string(data_dir.join(ACTIVE_PRESET_FILE)).ok()?;
    let name = name.trim();
    PRESETS.contains(&name).then(|| name.to_string())
}

fn write_active_preset(data_dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    let path = data_dir.join(ACTIVE_PRESET_FILE);
    fs::write(&path, format!("{}\n", name))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
